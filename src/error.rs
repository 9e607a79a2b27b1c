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

//! Error kinds surfaced by the sector manager and the TLV log engine.

use core::fmt;

/// Errors that can happen while validating an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConfigError {
    /// The major and minor sector ranges overlap, or are given in the wrong order.
    SectorsOverlap,

    /// `sector_size` cannot hold a sector header plus a single zero-length block.
    SectorTooSmall,

    /// The recency cache was configured with zero capacity.
    EmptyCache,

    /// `cache_capacity` does not match the `N` the [`Engine`](crate::engine::Engine) was
    /// instantiated with.
    CacheCapacityMismatch,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::SectorsOverlap => write!(f, "major and minor sectors overlap"),
            ConfigError::SectorTooSmall => {
                write!(f, "sector_size too small to hold a header and one block")
            }
            ConfigError::EmptyCache => write!(f, "cache_capacity must be at least 1"),
            ConfigError::CacheCapacityMismatch => {
                write!(f, "cache_capacity does not match the engine's compiled-in cache size")
            }
        }
    }
}

/// Errors surfaced by the TLV log engine's operations.
///
/// Every operation collapses these to a `bool`/`Option` at the public API boundary the way the
/// original C interface did (see the engine surface documentation), but the typed variant is
/// still reachable through `?` for callers who want to distinguish "tag absent" from "flash
/// full" from "no valid sector was ever found".
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EngineError {
    /// The requested tag has no live block (query/delete).
    NotFound,

    /// Neither sector carries the sector magic and a reformat did not resolve it.
    ///
    /// Unreachable with the bundled [`MemoryFlash`](crate::test_support::MemoryFlash) or any
    /// [`FlashDevice`](crate::flash::FlashDevice) whose `read` cannot fail: `find_live`
    /// auto-formats virgin media instead of returning this. Kept reachable for `FlashDevice`
    /// implementations layered over a driver that can signal an unrecoverable read failure some
    /// other way.
    NoValidSector,

    /// The scan ran out of room for another 8-byte meta before reaching empty space.
    MetaSpaceLow,

    /// An empty slot was found but the remaining tail is smaller than `8 + length`.
    DataSpaceLow,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineError::NotFound => write!(f, "tag not found"),
            EngineError::NoValidSector => write!(f, "no valid sector"),
            EngineError::MetaSpaceLow => write!(f, "meta space low"),
            EngineError::DataSpaceLow => write!(f, "data space low"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for EngineError {}
