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

//! The flash driver collaborator.
//!
//! The flash is cut into sectors, by hardware design. Memory can be written from 1 to 0 at any
//! bit level, but writing from 0 to 1 requires erasing an entire sector. This module only
//! describes the narrow interface the rest of the crate needs from such a device; the actual
//! SPI/QSPI driver (or, on a host, a file-backed image) is a downstream concern.


/// A byte-addressed NOR-flash-like device.
///
/// All three operations are infallible from the engine's perspective: a real driver surfaces
/// hardware failures by simply not honouring the write, which the engine then detects through
/// the meta/data readback it already performs after every program. `program` must only be asked
/// to clear bits (the block-status byte transitions are the one case where a region is
/// re-programmed after already holding data); asking it to set a bit that is currently clear is
/// a logic error in the caller; implementations are free to assert against it in debug builds.
pub trait FlashDevice {
    /// Sets every byte in `[addr, addr + size)` to `0xFF`.
    fn erase(&mut self, addr: u32, size: u32);

    /// Programs `data` at `addr`. The target region must already be erased, except for the
    /// block-status byte whose defined transitions only ever clear further bits.
    fn program(&mut self, addr: u32, data: &[u8]);

    /// Reads `buf.len()` bytes starting at `addr` into `buf`.
    fn read(&self, addr: u32, buf: &mut [u8]);
}
