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

//! The TLV block meta: header, state-machine status, CRC-8 and tag/length fields.
//!
//! ## Header (2 bytes)
//!
//! `0xAA55` marks a block whose meta has been programmed; `0xFFFF` marks erased/empty space —
//! the end of the log as seen by a scan.
//!
//! ## Status (1 byte) — the per-block state machine
//!
//! Every legal transition only clears bits, so a torn write can never look like it moved
//! *backwards*:
//!
//! ```text
//! NONE (0xFF) -> WRITE (0xFE) -> VERIFY (0xFC) -> DELETE (0xF8)
//! ```
//!
//! ## Layout
//!
//! ```text
//! +--------+--------+--------+--------+--------+--------+--------+--------+
//! | header (u16 LE)  | status | crc8   | tag (u16 LE)      | length (u16 LE)   |
//! +--------+--------+--------+--------+--------+--------+--------+--------+
//! ```
//! followed immediately by `length` bytes of opaque payload.


/// Size in bytes of the meta area preceding a block's payload.
pub const META_SIZE: usize = 8;

/// Sentinel marking a block whose meta has actually been programmed.
pub const HEADER_VALID: u16 = 0xAA55;

/// Sentinel marking erased, never-written space (end of the log as far as a scan is concerned).
pub const HEADER_EMPTY: u16 = 0xFFFF;

/// Block state-machine status values. Legal transitions only clear bits: `NONE -> WRITE ->
/// VERIFY -> DELETE`.
pub mod status {
    /// Erased, not yet written.
    pub const NONE: u8 = 0xFF;
    /// Meta and data have been programmed; not yet verified by readback.
    pub const WRITE: u8 = 0xFE;
    /// Readback confirmed meta and data match what was requested; the block is live.
    pub const VERIFY: u8 = 0xFC;
    /// Logically deleted; awaits garbage collection.
    pub const DELETE: u8 = 0xF8;
}

/// The 8-byte meta area of a TLV block, decoded into native fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMeta {
    /// `HEADER_VALID` for a programmed block, `HEADER_EMPTY` for erased space.
    pub header: u16,
    /// Current state-machine status (see [`status`]).
    pub status: u8,
    /// CRC-8 over `tag ‖ length ‖ data`.
    pub crc8: u8,
    /// User-assigned tag.
    pub tag: u16,
    /// Byte length of the payload following this meta.
    pub length: u16,
}

impl BlockMeta {
    /// Encodes this meta into its on-flash, little-endian byte representation.
    pub fn encode(&self) -> [u8; META_SIZE] {
        let mut buf = [0u8; META_SIZE];
        buf[0..2].copy_from_slice(&self.header.to_le_bytes());
        buf[2] = self.status;
        buf[3] = self.crc8;
        buf[4..6].copy_from_slice(&self.tag.to_le_bytes());
        buf[6..8].copy_from_slice(&self.length.to_le_bytes());
        buf
    }

    /// Decodes a meta area previously read from flash.
    pub fn decode(buf: &[u8; META_SIZE]) -> Self {
        BlockMeta {
            header: u16::from_le_bytes([buf[0], buf[1]]),
            status: buf[2],
            crc8: buf[3],
            tag: u16::from_le_bytes([buf[4], buf[5]]),
            length: u16::from_le_bytes([buf[6], buf[7]]),
        }
    }

    /// True once this meta's header marks erased/empty space.
    pub fn is_empty(&self) -> bool {
        self.header == HEADER_EMPTY
    }

    /// True once this meta's header carries the valid-block sentinel.
    ///
    /// Note this only checks the header sentinel; a block can still be meta-corrupt in other
    /// ways (e.g. `status == NONE` despite a valid header, or an impossible `length`) — the
    /// engine's scan applies the fuller classification before trusting a meta.
    pub fn has_valid_header(&self) -> bool {
        self.header == HEADER_VALID
    }
}

/// A resolved, queryable block: its meta plus where its payload begins in flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle {
    /// The block's decoded meta.
    pub meta: BlockMeta,
    /// Absolute flash address of the first payload byte (i.e. `meta_addr + META_SIZE`).
    pub data_offset: u32,
}

impl BlockHandle {
    /// The block's tag.
    pub fn tag(&self) -> u16 {
        self.meta.tag
    }

    /// The block's payload length in bytes.
    pub fn length(&self) -> u16 {
        self.meta.length
    }
}
