// The MIT License (MIT)
//
// Copyright (c) 2020, National Cybersecurity Agency of France (ANSSI)
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

//! The recency cache sitting in front of a full scan.
//!
//! The cache never stores a block's meta: it only remembers which data offset a tag last
//! resolved to. A hit still costs a single 8-byte meta re-read so a concurrently-deleted or
//! garbage-collected block can never be served stale from here — only the scan it saves is the
//! linear walk from the start of the sector.

mod tests;

/// Age a slot is given the moment it is inserted. One below [`CACHE_AGE_MAX`] leaves room for at
/// least one more bump before saturating, matching the reference behaviour of starting warm
/// rather than cold.
const INITIAL_AGE: u8 = 1;

/// Age never increments past this value; it only marks "has been touched more than most".
const CACHE_AGE_MAX: u8 = 0xFF;

#[derive(Debug, Clone, Copy)]
struct CacheItem {
    valid: bool,
    age: u8,
    tag: u16,
    data_offset: u32,
}

impl CacheItem {
    const EMPTY: CacheItem = CacheItem {
        valid: false,
        age: 0,
        tag: 0,
        data_offset: 0,
    };
}

/// A fixed-capacity, tag-keyed cache of `data_offset` mappings, evicted by least-recently-bumped
/// age.
///
/// `N` is the slot count; an [`Engine`](crate::engine::Engine) checks that
/// [`EngineConfig`](crate::config::EngineConfig)`::cache_capacity` equals `N` before it will
/// build over it.
pub struct RecencyCache<const N: usize> {
    slots: [CacheItem; N],
    /// Number of slots that have ever been occupied; grows monotonically to `N`, then the cache
    /// always evicts instead of extending.
    filled: usize,
}

impl<const N: usize> RecencyCache<N> {
    /// Builds an empty cache of `N` slots.
    pub fn new() -> Self {
        RecencyCache {
            slots: [CacheItem::EMPTY; N],
            filled: 0,
        }
    }

    /// Clears every slot, as if the cache had just been constructed.
    pub fn invalidate(&mut self) {
        self.slots = [CacheItem::EMPTY; N];
        self.filled = 0;
    }

    /// Looks up `tag`, bumping its age on a hit and returning its last known data offset.
    pub fn get(&mut self, tag: u16) -> Option<u32> {
        for slot in self.slots[..self.filled].iter_mut() {
            if slot.valid && slot.tag == tag {
                slot.age = slot.age.saturating_add(1);
                return Some(slot.data_offset);
            }
        }
        None
    }

    /// Records that `tag` now resolves to `data_offset`.
    ///
    /// If `tag` is already cached, its entry is refreshed and bumped in place. Otherwise, a new
    /// slot is taken: the next never-used slot while the cache has room, or — once full — the
    /// slot with the lowest age, evicting whatever it held.
    pub fn set(&mut self, tag: u16, data_offset: u32) {
        let mut min_age = u8::MAX;
        let mut min_index = 0;
        for (i, slot) in self.slots[..self.filled].iter_mut().enumerate() {
            if slot.valid && slot.tag == tag {
                slot.age = slot.age.saturating_add(1);
                slot.data_offset = data_offset;
                return;
            }
            if slot.age < min_age {
                min_age = slot.age;
                min_index = i;
            }
        }

        let index = if self.filled < N {
            let index = self.filled;
            self.filled += 1;
            index
        } else {
            min_index
        };
        self.slots[index] = CacheItem {
            valid: true,
            age: INITIAL_AGE,
            tag,
            data_offset,
        };
    }

    /// Invalidates `tag`'s entry, if any, without touching any other slot.
    pub fn remove(&mut self, tag: u16) {
        for slot in self.slots[..self.filled].iter_mut() {
            if slot.valid && slot.tag == tag {
                slot.valid = false;
                break;
            }
        }
    }
}

impl<const N: usize> Default for RecencyCache<N> {
    fn default() -> Self {
        Self::new()
    }
}
