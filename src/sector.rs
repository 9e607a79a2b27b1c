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

//! The sector header and the major/minor live-sector election it disambiguates.
//!
//! Each sector opens with a 4-byte header: a magic tag identifying it as a formatted TLV sector,
//! followed by a version that increments (wrapping) every time garbage collection promotes that
//! sector to the live one. After a reset, whichever sector carries the higher version is live —
//! except for the one case where the version space has just wrapped, which is special-cased
//! below to avoid an unnecessary extra erase.

mod tests;

use crate::flash::FlashDevice;

/// Size in bytes of the sector header.
pub const HEADER_SIZE: usize = 4;

/// Magic identifying a sector as a formatted TLV sector (as opposed to virgin/foreign media).
pub const SECTOR_TAG: u16 = 0xCAEE;

/// The version a freshly formatted sector starts at.
pub const VERSION_MIN: u16 = 0x0000;

/// The version just before wraparound back to [`VERSION_MIN`].
pub const VERSION_MAX: u16 = 0xFFFF;

/// The decoded 4-byte header found at the base address of a sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorHeader {
    /// Expected to equal [`SECTOR_TAG`] for a formatted sector.
    pub tag: u16,
    /// Monotonically increasing (mod 2^16) generation counter.
    pub version: u16,
}

impl SectorHeader {
    /// Encodes the header into its on-flash, little-endian byte representation.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.tag.to_le_bytes());
        buf[2..4].copy_from_slice(&self.version.to_le_bytes());
        buf
    }

    /// Decodes a header previously read from flash.
    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Self {
        SectorHeader {
            tag: u16::from_le_bytes([buf[0], buf[1]]),
            version: u16::from_le_bytes([buf[2], buf[3]]),
        }
    }

    /// True if this sector carries the TLV magic, i.e. is not virgin or foreign media.
    pub fn is_formatted(&self) -> bool {
        self.tag == SECTOR_TAG
    }

    /// The version the *other* sector will be stamped with once this one is garbage collected.
    pub fn next_version(&self) -> u16 {
        if self.version == VERSION_MAX {
            VERSION_MIN
        } else {
            self.version + 1
        }
    }
}

/// Reads and decodes the header at `addr`.
pub fn read_header<F: FlashDevice + ?Sized>(flash: &F, addr: u32) -> SectorHeader {
    let mut buf = [0u8; HEADER_SIZE];
    flash.read(addr, &mut buf);
    SectorHeader::decode(&buf)
}

/// Erases both sectors and stamps `major_addr` as the sole live sector at [`VERSION_MIN`].
pub fn format<F: FlashDevice + ?Sized>(flash: &mut F, major_addr: u32, minor_addr: u32, sector_size: u32) {
    flash.erase(major_addr, sector_size);
    flash.erase(minor_addr, sector_size);
    let header = SectorHeader {
        tag: SECTOR_TAG,
        version: VERSION_MIN,
    };
    flash.program(major_addr, &header.encode());
}

/// Elects the live sector by reading both headers, formatting virgin media on the fly.
///
/// - Both formatted: the higher version wins, except when one holds [`VERSION_MAX`] and the
///   other [`VERSION_MIN`] — that pairing only ever arises right after a version wraparound, and
///   the sector at `VERSION_MIN` is the one that was *just* written to, so it is live.
/// - Exactly one formatted: that one is live.
/// - Neither formatted: both sectors are freshly erased and `major_addr` becomes live at
///   [`VERSION_MIN`].
pub fn find_live<F: FlashDevice + ?Sized>(
    flash: &mut F,
    major_addr: u32,
    minor_addr: u32,
    sector_size: u32,
) -> u32 {
    let major = read_header(flash, major_addr);
    let minor = read_header(flash, minor_addr);

    match (major.is_formatted(), minor.is_formatted()) {
        (true, true) => {
            if major.version == VERSION_MAX && minor.version == VERSION_MIN {
                minor_addr
            } else if major.version == VERSION_MIN && minor.version == VERSION_MAX {
                major_addr
            } else if major.version > minor.version {
                major_addr
            } else {
                minor_addr
            }
        }
        (true, false) => major_addr,
        (false, true) => minor_addr,
        (false, false) => {
            format(flash, major_addr, minor_addr, sector_size);
            major_addr
        }
    }
}
