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

//! # Project
//!
//! Please see `README.md` for installation steps.
//!
//! # Crate
//!
//! A fault-tolerant tag/length/value key-value log over a pair of NOR-flash-like sectors.
//! [`engine::Engine`] is the main access point: build one over anything implementing
//! [`flash::FlashDevice`] and a [`config::EngineConfig`] describing where its two sectors live,
//! then `append`/`query`/`read`/`verify`/`delete` tagged records against it.
//!
//! Every append is a three-phase commit — write, read back to verify, then commit — so that a
//! reset at any point during a write leaves the log in a state a later scan can always make sense
//! of, and garbage collection only ever moves data that has already been verified live.
//!
//! This crate does no heap allocation: every block and sector buffer involved is a fixed-size
//! stack array, which is also why a single data transfer is capped (see `engine::CHUNK`) rather
//! than read or written in one call.
//!
//! It can be configured using the following feature flag:
//!  * `std` for pulling in a terminal-friendly logger (see [`logging::terminal`]), for hosted
//!    development and tests. Without it the crate is `no_std`.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]

pub mod block;
pub mod cache;
pub mod config;
pub mod crc;
pub mod engine;
pub mod error;
pub mod flash;
pub mod logging;
pub mod sector;

#[cfg(any(test, feature = "std"))]
pub mod test_support;

pub use crate::block::BlockHandle;
pub use crate::cache::RecencyCache;
pub use crate::config::EngineConfig;
pub use crate::crc::crc8;
pub use crate::engine::Engine;
pub use crate::error::{ConfigError, EngineError};
pub use crate::flash::FlashDevice;
