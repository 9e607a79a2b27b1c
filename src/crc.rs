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

//! Software CRC-8 over the polynomial x^8+x^2+x+1 (0x07).
//!
//! Table-driven so a lookup plus an XOR is the whole per-byte cost; built once at compile time via
//! a `const fn` rather than checked in as a literal array.


/// Precomputed CRC-8 table for polynomial x^8+x^2+x+1 (MSB-first, non-reflected).
const CRC_TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    const POLY: u8 = 0x07;
    let mut table = [0u8; 256];
    let mut byte = 0usize;
    while byte < 256 {
        let mut crc = byte as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[byte] = crc;
        byte += 1;
    }
    table
}

/// Computes a chained CRC-8, seeding the table lookup with `seed` and folding in `data`.
///
/// Callers chain successive fields by feeding the previous call's result back in as `seed`,
/// starting the whole chain with `seed = 0x00`.
pub fn crc8(seed: u8, data: &[u8]) -> u8 {
    let mut crc = seed;
    for &b in data {
        crc = CRC_TABLE[(crc ^ b) as usize];
    }
    crc
}
