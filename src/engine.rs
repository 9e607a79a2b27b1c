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

//! The TLV log engine: a single scan routine driving append, query, delete and garbage
//! collection over whichever sector currently holds the live log.

mod tests;

use slog::{debug, trace, warn};

use crate::block::{status, BlockHandle, BlockMeta, HEADER_EMPTY, META_SIZE};
use crate::cache::RecencyCache;
use crate::config::EngineConfig;
use crate::crc::crc8;
use crate::error::{ConfigError, EngineError};
use crate::flash::FlashDevice;
use crate::sector::{self, SectorHeader};

/// Biggest chunk moved through a stack buffer at a time, for CRC verification and GC copies.
const CHUNK: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchMode {
    Append,
    Query,
    Delete,
}

enum SearchOutcome {
    /// APPEND: an empty slot was found with room for `META_SIZE + length_hint` bytes.
    FreeSlot(u32),
    /// QUERY: a live (`VERIFY`) block with a matching tag.
    Found(BlockHandle),
    /// DELETE: a non-deleted matching block was found and just got marked `DELETE`.
    Deleted,
    /// QUERY/DELETE: the scan reached empty space without a matching live block.
    NotFound,
}

/// Classifies a meta read off flash: `true` lets the scan trust `header`/`status`/`length`;
/// `false` marks the 8 bytes as a dirty/torn block to be skipped one `META_SIZE` at a time.
fn check_meta(start: u32, end: u32, meta: &BlockMeta) -> bool {
    if meta.is_empty() {
        return true;
    }
    if !meta.has_valid_header() {
        return false;
    }
    if meta.status == status::NONE || meta.length == 0xFFFF {
        return false;
    }
    let available = end - start - META_SIZE as u32;
    (meta.length as u32) <= available
}

fn crc_of_append(tag: u16, length: u16, data: &[u8]) -> u8 {
    let mut buf = [0u8; 4];
    buf[0..2].copy_from_slice(&tag.to_le_bytes());
    buf[2..4].copy_from_slice(&length.to_le_bytes());
    let crc = crc8(0x00, &buf);
    crc8(crc, data)
}

/// The fault-tolerant tag/length/value log over a pair of flash sectors.
///
/// `N` is the recency cache's slot count; [`EngineConfig::cache_capacity`] must equal it.
/// The engine carries no interior mutability and no statics: a `&mut Engine` is everything an
/// operation needs, and nothing stops an application from running several independent engines
/// (e.g. over disjoint flash regions) side by side.
pub struct Engine<F: FlashDevice, const N: usize = 16> {
    flash: F,
    config: EngineConfig,
    work_sector: Option<u32>,
    mark_address: Option<u32>,
    dirty_blocks: u32,
    cache: RecencyCache<N>,
    logger: slog::Logger,
}

impl<F: FlashDevice, const N: usize> Engine<F, N> {
    /// Builds an engine over `flash`, validating `config` first.
    ///
    /// This does not touch the flash: the live sector is elected lazily, on first use, the way
    /// the original interface deferred it to the first `search`.
    pub fn new(flash: F, config: EngineConfig, logger: slog::Logger) -> Result<Self, ConfigError> {
        config.validate()?;
        if config.cache_capacity != N {
            return Err(ConfigError::CacheCapacityMismatch);
        }
        Ok(Engine {
            flash,
            config,
            work_sector: None,
            mark_address: None,
            dirty_blocks: 0,
            cache: RecencyCache::new(),
            logger,
        })
    }

    /// Unconditionally erases both sectors and stamps the major one as live at version 0.
    ///
    /// Not needed in ordinary operation — a freshly-flashed, all-`0xFF` pair of sectors is
    /// recognised and formatted automatically the first time it's used — but exposed for callers
    /// that want to wipe a device deliberately.
    pub fn format(&mut self) {
        sector::format(
            &mut self.flash,
            self.config.major_addr,
            self.config.minor_addr,
            self.config.sector_size,
        );
        self.work_sector = Some(self.config.major_addr);
        self.mark_address = None;
        self.dirty_blocks = 0;
        self.cache.invalidate();
        debug!(self.logger, "formatted"; "major" => self.config.major_addr, "minor" => self.config.minor_addr);
    }

    fn work_sector_addr(&mut self) -> Result<u32, EngineError> {
        if let Some(addr) = self.work_sector {
            return Ok(addr);
        }
        let addr = sector::find_live(
            &mut self.flash,
            self.config.major_addr,
            self.config.minor_addr,
            self.config.sector_size,
        );
        trace!(self.logger, "elected live sector"; "addr" => addr);
        self.work_sector = Some(addr);
        Ok(addr)
    }

    /// The single scan used by append, query and delete alike: a linear walk of the live
    /// sector's blocks from its header to the first empty meta or the sector's end.
    fn search(&mut self, tag: u16, mode: SearchMode, length_hint: u16) -> Result<SearchOutcome, EngineError> {
        let work = self.work_sector_addr()?;
        let mut start = work + sector::HEADER_SIZE as u32;
        let end = work + self.config.sector_size;
        self.dirty_blocks = 0;
        self.mark_address = None;

        while start < end {
            if start + META_SIZE as u32 > end {
                return Err(EngineError::MetaSpaceLow);
            }
            let mut buf = [0u8; META_SIZE];
            self.flash.read(start, &mut buf);
            let meta = BlockMeta::decode(&buf);

            if !check_meta(start, end, &meta) {
                start += META_SIZE as u32;
                self.dirty_blocks += 1;
                continue;
            }

            if meta.has_valid_header() {
                if meta.status != status::VERIFY {
                    self.dirty_blocks += 1;
                }
                if meta.tag == tag {
                    match mode {
                        SearchMode::Append if meta.status != status::DELETE => {
                            self.mark_address = Some(start);
                        }
                        SearchMode::Query if meta.status == status::VERIFY => {
                            let handle = BlockHandle {
                                meta,
                                data_offset: start + META_SIZE as u32,
                            };
                            return Ok(SearchOutcome::Found(handle));
                        }
                        SearchMode::Delete if meta.status != status::DELETE => {
                            self.write_status(start, status::DELETE);
                            self.dirty_blocks += 1;
                            return Ok(SearchOutcome::Deleted);
                        }
                        _ => {}
                    }
                }
                start += META_SIZE as u32 + meta.length as u32;
            } else {
                // Empty meta: the end of the log as far as this scan is concerned.
                return match mode {
                    SearchMode::Append => {
                        if end - start >= META_SIZE as u32 + length_hint as u32 {
                            Ok(SearchOutcome::FreeSlot(start))
                        } else {
                            Err(EngineError::DataSpaceLow)
                        }
                    }
                    SearchMode::Query | SearchMode::Delete => Ok(SearchOutcome::NotFound),
                };
            }
        }
        Ok(SearchOutcome::NotFound)
    }

    fn write_status(&mut self, meta_addr: u32, new_status: u8) {
        self.flash.program(meta_addr + 2, &[new_status]);
    }

    /// Writes meta and data, verifies both by readback, commits, and only then retires the
    /// previous block carrying the same tag (if `search` found one). Returns `false` if the
    /// readback verification failed; the caller still has a free slot to retry elsewhere, but the
    /// log itself has one more dirty block to clean up eventually.
    fn write_block(&mut self, meta_addr: u32, tag: u16, data: &[u8]) -> Result<bool, EngineError> {
        let length = data.len() as u16;
        let crc = crc_of_append(tag, length, data);
        let meta = BlockMeta {
            header: crate::block::HEADER_VALID,
            status: status::WRITE,
            crc8: crc,
            tag,
            length,
        };
        let meta_bytes = meta.encode();
        let data_addr = meta_addr + META_SIZE as u32;

        self.flash.program(meta_addr, &meta_bytes);
        self.flash.program(data_addr, data);

        let mut readback = [0u8; META_SIZE];
        self.flash.read(meta_addr, &mut readback);
        if readback != meta_bytes {
            warn!(self.logger, "meta readback mismatch"; "tag" => tag, "addr" => meta_addr);
            return Ok(false);
        }

        let mut chunk = [0u8; CHUNK];
        let mut offset: u32 = 0;
        let mut remaining = length as usize;
        while remaining > 0 {
            let n = remaining.min(CHUNK);
            self.flash.read(data_addr + offset, &mut chunk[..n]);
            if chunk[..n] != data[offset as usize..offset as usize + n] {
                warn!(self.logger, "data readback mismatch"; "tag" => tag, "addr" => data_addr);
                return Ok(false);
            }
            offset += n as u32;
            remaining -= n;
        }

        self.write_status(meta_addr, status::VERIFY);

        if let Some(old_addr) = self.mark_address.take() {
            self.write_status(old_addr, status::DELETE);
            self.dirty_blocks += 1;
            trace!(self.logger, "retired previous block"; "tag" => tag, "addr" => old_addr);
        }

        self.cache.set(tag, data_addr);
        debug!(self.logger, "appended"; "tag" => tag, "length" => length);
        Ok(true)
    }

    /// Appends `data` under `tag`, retiring any previous live block for the same tag once the
    /// new one is committed. Triggers garbage collection on the live sector if there wasn't
    /// already room, and returns `Ok(false)` only once that reclaim still isn't enough.
    pub fn append(&mut self, tag: u16, data: &[u8]) -> Result<bool, EngineError> {
        let length = data.len() as u16;
        // Any outcome other than an immediate free slot — including the scan simply running off
        // the end of a sector that happens to be exactly full, which surfaces as `NotFound` here
        // just as it would from a query — is worth one collection-and-retry before giving up.
        let addr = match self.search(tag, SearchMode::Append, length) {
            Ok(SearchOutcome::FreeSlot(addr)) => Some(addr),
            _ => None,
        };
        let addr = match addr {
            Some(addr) => addr,
            None => {
                let available = self.gc()?;
                if available < META_SIZE as u32 + length as u32 {
                    return Ok(false);
                }
                match self.search(tag, SearchMode::Append, length) {
                    Ok(SearchOutcome::FreeSlot(addr)) => addr,
                    _ => return Ok(false),
                }
            }
        };
        self.write_block(addr, tag, data)
    }

    /// Looks up the live block for `tag`, consulting the recency cache first.
    ///
    /// A cache hit still re-reads the 8-byte meta off flash before returning it, so a tag that
    /// was since deleted or moved by garbage collection is never served stale — only the linear
    /// scan to find it is skipped.
    pub fn query(&mut self, tag: u16) -> Result<Option<BlockHandle>, EngineError> {
        if let Some(data_offset) = self.cache.get(tag) {
            let meta_addr = data_offset - META_SIZE as u32;
            let mut buf = [0u8; META_SIZE];
            self.flash.read(meta_addr, &mut buf);
            trace!(self.logger, "cache hit"; "tag" => tag);
            return Ok(Some(BlockHandle {
                meta: BlockMeta::decode(&buf),
                data_offset,
            }));
        }

        match self.search(tag, SearchMode::Query, 0)? {
            SearchOutcome::Found(handle) => {
                self.cache.set(tag, handle.data_offset);
                Ok(Some(handle))
            }
            SearchOutcome::NotFound => Ok(None),
            _ => unreachable!("query-mode search only ever yields Found or NotFound"),
        }
    }

    /// Reads `buf.len()` bytes of `handle`'s payload starting at `offset`, returning the number
    /// of bytes actually copied — `0` if `offset` or `offset + buf.len()` falls outside the
    /// block's recorded length.
    pub fn read(&self, handle: &BlockHandle, offset: u16, buf: &mut [u8]) -> usize {
        if offset >= handle.meta.length {
            return 0;
        }
        if offset as usize + buf.len() > handle.meta.length as usize {
            return 0;
        }
        self.flash.read(handle.data_offset + offset as u32, buf);
        buf.len()
    }

    /// Recomputes the payload's CRC-8 and compares it against the meta's stored value.
    pub fn verify(&self, handle: &BlockHandle) -> bool {
        let mut seed = [0u8; 4];
        seed[0..2].copy_from_slice(&handle.meta.tag.to_le_bytes());
        seed[2..4].copy_from_slice(&handle.meta.length.to_le_bytes());
        let mut crc = crc8(0x00, &seed);

        let mut chunk = [0u8; CHUNK];
        let mut offset: u32 = 0;
        let mut remaining = handle.meta.length as usize;
        while remaining > 0 {
            let n = remaining.min(CHUNK);
            self.flash.read(handle.data_offset + offset, &mut chunk[..n]);
            crc = crc8(crc, &chunk[..n]);
            offset += n as u32;
            remaining -= n;
        }
        crc == handle.meta.crc8
    }

    /// Marks the live block for `tag` as deleted. Returns `false` if there was none.
    pub fn delete(&mut self, tag: u16) -> Result<bool, EngineError> {
        self.cache.remove(tag);
        match self.search(tag, SearchMode::Delete, 0)? {
            SearchOutcome::Deleted => {
                debug!(self.logger, "deleted"; "tag" => tag);
                Ok(true)
            }
            SearchOutcome::NotFound => Ok(false),
            _ => unreachable!("delete-mode search only ever yields Deleted or NotFound"),
        }
    }

    /// Copies every `VERIFY` block of the live sector to the other sector, which becomes the new
    /// live sector at the next version; the old sector is left untouched (lazily erased next time
    /// it is chosen as the GC target). Returns the resulting free space in the new live sector.
    ///
    /// A no-op, returning `0`, if the last `search` found no dirty blocks worth reclaiming.
    ///
    /// Does not touch the recency cache: a cached `data_offset` pointing into the sector that was
    /// just abandoned keeps reading back the exact bytes it read before, for as long as that
    /// sector isn't chosen as a GC target again — `append`'s own `cache.set` is what replaces a
    /// stale entry with the tag's new, moved location.
    fn gc(&mut self) -> Result<u32, EngineError> {
        if self.dirty_blocks == 0 {
            return Ok(0);
        }
        let work = self.work_sector_addr()?;
        let swap = if work == self.config.major_addr {
            self.config.minor_addr
        } else {
            self.config.major_addr
        };

        let mut read_addr = work + sector::HEADER_SIZE as u32;
        let mut write_addr = swap + sector::HEADER_SIZE as u32;
        let read_end = work + self.config.sector_size;
        let write_end = swap + self.config.sector_size;

        self.flash.erase(swap, self.config.sector_size);

        while read_addr < read_end {
            if read_addr + META_SIZE as u32 > read_end {
                break;
            }
            let mut buf = [0u8; META_SIZE];
            self.flash.read(read_addr, &mut buf);
            let meta = BlockMeta::decode(&buf);

            if !check_meta(read_addr, read_end, &meta) {
                read_addr += META_SIZE as u32;
                continue;
            }
            if meta.header == HEADER_EMPTY {
                break;
            }

            if meta.status == status::VERIFY {
                self.flash.program(write_addr, &buf);
                read_addr += META_SIZE as u32;
                write_addr += META_SIZE as u32;

                let mut chunk = [0u8; CHUNK];
                let mut remaining = meta.length as usize;
                while remaining > 0 {
                    let n = remaining.min(CHUNK);
                    self.flash.read(read_addr, &mut chunk[..n]);
                    self.flash.program(write_addr, &chunk[..n]);
                    read_addr += n as u32;
                    write_addr += n as u32;
                    remaining -= n;
                }
            } else {
                read_addr += META_SIZE as u32 + meta.length as u32;
            }
        }

        let old_header = sector::read_header(&self.flash, work);
        let new_header = SectorHeader {
            tag: sector::SECTOR_TAG,
            version: old_header.next_version(),
        };
        self.flash.program(swap, &new_header.encode());

        self.work_sector = Some(swap);
        self.dirty_blocks = 0;
        self.mark_address = None;

        let available = write_end - write_addr;
        debug!(self.logger, "garbage collected"; "from" => work, "to" => swap, "available" => available);
        Ok(available)
    }
}

#[cfg(test)]
impl<const N: usize> Engine<crate::test_support::MemoryFlash, N> {
    pub(crate) fn flash_program_calls(&self) -> usize {
        self.flash.program_calls()
    }

    pub(crate) fn flash_poke(&mut self, addr: u32, value: u8) {
        self.flash.poke(addr, value);
    }

    pub(crate) fn flash_bytes(&self) -> &[u8] {
        self.flash.as_bytes()
    }

    pub(crate) fn invalidate_cache(&mut self) {
        self.cache.invalidate();
    }
}
