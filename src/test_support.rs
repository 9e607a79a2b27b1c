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

//! A RAM-backed [`FlashDevice`] for tests.
//!
//! This is not the file-backed device simulator a CLI harness would ship (that remains a
//! downstream concern); it is a faithful in-memory model of the erase/program semantics, used by
//! this crate's own test suite and available to integration tests built on top of it.

use crate::flash::FlashDevice;
use std::vec::Vec;

/// An in-RAM flash image that enforces erase-to-`0xFF` and program-only-clears-bits semantics.
pub struct MemoryFlash {
    mem: Vec<u8>,
    /// Number of bytes physically programmed since the last `erase`, for test introspection
    /// (e.g. asserting GC copies exactly the live blocks and nothing more).
    program_calls: usize,
}

impl MemoryFlash {
    /// Creates a new device of `size` bytes, erased (all `0xFF`).
    pub fn new(size: usize) -> Self {
        MemoryFlash {
            mem: std::vec![0xFFu8; size],
            program_calls: 0,
        }
    }

    /// Total device size in bytes.
    pub fn len(&self) -> usize {
        self.mem.len()
    }

    /// Returns the raw bytes, e.g. to persist a flash image across a simulated cold boot.
    pub fn as_bytes(&self) -> &[u8] {
        &self.mem
    }

    /// Rebuilds a device from previously-saved bytes (a simulated cold boot).
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        MemoryFlash {
            mem: bytes,
            program_calls: 0,
        }
    }

    /// Number of `program` calls observed since construction (or since the counter was last
    /// read is not reset — this is a monotonic counter for coarse test assertions).
    pub fn program_calls(&self) -> usize {
        self.program_calls
    }

    /// Flips the single byte at `addr` to `value` bypassing the erase/program discipline, to
    /// simulate a corrupted block or a torn write landing mid-field.
    pub fn poke(&mut self, addr: u32, value: u8) {
        self.mem[addr as usize] = value;
    }
}

impl FlashDevice for MemoryFlash {
    fn erase(&mut self, addr: u32, size: u32) {
        let start = addr as usize;
        let end = start + size as usize;
        for b in &mut self.mem[start..end] {
            *b = 0xFF;
        }
    }

    fn program(&mut self, addr: u32, data: &[u8]) {
        let start = addr as usize;
        for (i, &b) in data.iter().enumerate() {
            let cur = self.mem[start + i];
            debug_assert_eq!(
                cur & b,
                b,
                "program() asked to set a bit that erase() never cleared at offset {}",
                start + i
            );
            self.mem[start + i] = cur & b;
        }
        self.program_calls += 1;
    }

    fn read(&self, addr: u32, buf: &mut [u8]) {
        let start = addr as usize;
        buf.copy_from_slice(&self.mem[start..start + buf.len()]);
    }
}
