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

//! The caller-supplied layout an [`Engine`](crate::engine::Engine) is built from.

mod tests;

use crate::block::META_SIZE;
use crate::error::ConfigError;

/// The addresses, size and cache depth an [`Engine`](crate::engine::Engine) operates over.
///
/// Both sectors must be the same size, must not overlap, and each must be large enough to hold a
/// sector header plus at least one zero-length block; `cache_capacity` must be at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Base address of the major sector.
    pub major_addr: u32,
    /// Base address of the minor sector.
    pub minor_addr: u32,
    /// Size in bytes of each sector (both sectors share this size).
    pub sector_size: u32,
    /// Number of slots the recency cache should have. Must equal the `N` const generic the
    /// [`Engine`](crate::engine::Engine) is instantiated with; [`Engine::new`](crate::engine::Engine::new)
    /// checks this and returns [`ConfigError::CacheCapacityMismatch`] otherwise.
    pub cache_capacity: usize,
}

impl EngineConfig {
    /// Validates the fields that don't depend on the engine's cache size (checked separately by
    /// `Engine::new`, which alone knows `N`).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (lo, hi) = if self.major_addr <= self.minor_addr {
            (self.major_addr, self.minor_addr)
        } else {
            (self.minor_addr, self.major_addr)
        };
        if lo as u64 + self.sector_size as u64 > hi as u64 {
            return Err(ConfigError::SectorsOverlap);
        }

        let min_size = crate::sector::HEADER_SIZE as u64 + META_SIZE as u64;
        if (self.sector_size as u64) < min_size {
            return Err(ConfigError::SectorTooSmall);
        }

        if self.cache_capacity == 0 {
            return Err(ConfigError::EmptyCache);
        }

        Ok(())
    }
}
