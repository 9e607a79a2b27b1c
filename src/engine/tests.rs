#![cfg(test)]

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::logging::discard;
use crate::test_support::MemoryFlash;
use speculate::speculate; // Must be imported into the current scope.

const SECTOR_SIZE: u32 = 256;

fn engine(flash: MemoryFlash) -> Engine<MemoryFlash, 4> {
    let config = EngineConfig {
        major_addr: 0,
        minor_addr: SECTOR_SIZE,
        sector_size: SECTOR_SIZE,
        cache_capacity: 4,
    };
    Engine::new(flash, config, discard()).unwrap()
}

fn fresh() -> Engine<MemoryFlash, 4> {
    engine(MemoryFlash::new((SECTOR_SIZE * 2) as usize))
}

fn engine_with_sector(sector_size: u32) -> Engine<MemoryFlash, 4> {
    let config = EngineConfig {
        major_addr: 0,
        minor_addr: sector_size,
        sector_size,
        cache_capacity: 4,
    };
    Engine::new(MemoryFlash::new((sector_size * 2) as usize), config, discard()).unwrap()
}

speculate! {
    describe "append/query/delete" {
        it "round-trips a freshly appended block" {
            let mut e = fresh();
            assert!(e.append(0x01, b"hello").unwrap());
            let handle = e.query(0x01).unwrap().expect("tag should be found");
            assert_eq!(handle.length(), 5);
            let mut buf = [0u8; 5];
            assert_eq!(e.read(&handle, 0, &mut buf), 5);
            assert_eq!(&buf, b"hello");
            assert!(e.verify(&handle));
        }

        it "reports a miss for a tag that was never written" {
            let mut e = fresh();
            assert_eq!(e.query(0xBEEF).unwrap(), None);
        }

        it "replacing a tag retires the old block and serves the new value" {
            let mut e = fresh();
            assert!(e.append(0x02, b"first").unwrap());
            assert!(e.append(0x02, b"second-value").unwrap());
            let handle = e.query(0x02).unwrap().unwrap();
            let mut buf = [0u8; 12];
            e.read(&handle, 0, &mut buf);
            assert_eq!(&buf, b"second-value");
        }

        it "delete removes the live block and future queries miss" {
            let mut e = fresh();
            assert!(e.append(0x03, b"x").unwrap());
            assert!(e.delete(0x03).unwrap());
            assert_eq!(e.query(0x03).unwrap(), None);
        }

        it "deleting an absent tag returns false" {
            let mut e = fresh();
            assert!(!e.delete(0x04).unwrap());
        }

        it "a partial read out of bounds returns zero and copies nothing" {
            let mut e = fresh();
            e.append(0x05, b"abcde").unwrap();
            let handle = e.query(0x05).unwrap().unwrap();
            let mut buf = [0u8; 3];
            assert_eq!(e.read(&handle, 4, &mut buf), 0);
        }
    }

    describe "cache" {
        it "serves a second query from the cache without rescanning" {
            let mut e = fresh();
            e.append(0x10, b"cached").unwrap();
            e.query(0x10).unwrap();
            let calls_before = e_program_calls(&e);
            let handle = e.query(0x10).unwrap().unwrap();
            assert_eq!(calls_before, e_program_calls(&e));
            let mut buf = [0u8; 6];
            e.read(&handle, 0, &mut buf);
            assert_eq!(&buf, b"cached");
        }

        it "does not serve a deleted tag from the cache" {
            let mut e = fresh();
            e.append(0x11, b"v").unwrap();
            e.query(0x11).unwrap();
            e.delete(0x11).unwrap();
            assert_eq!(e.query(0x11).unwrap(), None);
        }
    }

    describe "garbage collection" {
        it "reclaims space from deleted blocks so a later append that wouldn't otherwise fit succeeds" {
            // A small sector leaves just enough slack for one replacement to tip a later append
            // into needing a reclaim, without ever being totally out of live data to keep.
            let mut e = engine_with_sector(128);
            for i in 0..6u16 {
                assert!(e.append(i, &[0xAB; 8]).unwrap());
            }
            let calls_before_gc = e.flash_program_calls();
            for i in 0..6u16 {
                assert!(e.append(i, &[0xCD; 8]).unwrap());
            }
            // More flash writes happened than a plain in-place append sequence would need,
            // evidencing that a reclaim copy actually ran.
            assert!(e.flash_program_calls() > calls_before_gc + 6);

            for i in 0..6u16 {
                let handle = e.query(i).unwrap().unwrap();
                let mut buf = [0u8; 8];
                e.read(&handle, 0, &mut buf);
                assert_eq!(buf, [0xCD; 8]);
            }
        }

        it "a full sector with no dirty blocks fails the append instead of looping forever" {
            let mut e = fresh();
            let mut i = 0u16;
            loop {
                if !e.append(i, &[0x11; 16]).unwrap() {
                    break;
                }
                i += 1;
                if i > 100 {
                    panic!("append should have failed by now");
                }
            }
        }
    }

    describe "crash recovery" {
        it "a status byte corrupted to a value outside the state machine is treated as dirty, not live" {
            let mut e = fresh();
            assert!(e.append(0x20, b"ok").unwrap());
            // Simulate a reset mid-program of the status field: the byte lands on neither a
            // defined status nor a clean erased 0xFF.
            poke_meta_status(&mut e, 0x20, 0x00);
            assert_eq!(e.query(0x20).unwrap(), None);
        }
    }

    describe "cold boot" {
        it "recovers every previously appended tag from a freshly constructed engine" {
            let mut e = fresh();
            e.append(0x40, b"persisted-a").unwrap();
            e.append(0x41, b"persisted-b").unwrap();
            e.delete(0x41).unwrap();
            e.append(0x42, b"persisted-c").unwrap();

            let image = e.flash_bytes().to_vec();
            let mut reopened = engine(MemoryFlash::from_bytes(image));

            let handle = reopened.query(0x40).unwrap().expect("0x40 should survive a reopen");
            let mut buf = [0u8; 11];
            reopened.read(&handle, 0, &mut buf);
            assert_eq!(&buf, b"persisted-a");
            assert!(reopened.verify(&handle));

            assert_eq!(reopened.query(0x41).unwrap(), None);

            let handle = reopened.query(0x42).unwrap().expect("0x42 should survive a reopen");
            let mut buf = [0u8; 11];
            reopened.read(&handle, 0, &mut buf);
            assert_eq!(&buf, b"persisted-c");
        }
    }

    describe "dual VERIFY resolution" {
        it "returns the first matching VERIFY block in address order" {
            let mut e = fresh();
            // A clean append-then-replace always retires the old block to DELETE before the new
            // one is queryable, so force the crash-only state (two live VERIFY blocks for the
            // same tag) directly, the way a reset between the VERIFY and DELETE writes would.
            e.append(0x50, b"older").unwrap();
            let older = e.query(0x50).unwrap().unwrap();
            e.append(0x50, b"newer-value").unwrap();
            let older_meta_addr = older.data_offset - crate::block::META_SIZE as u32;
            e.flash_poke(older_meta_addr + 2, crate::block::status::VERIFY);
            e.invalidate_cache();

            let handle = e.query(0x50).unwrap().unwrap();
            let mut buf = [0u8; 5];
            e.read(&handle, 0, &mut buf);
            assert_eq!(&buf, b"older");
        }
    }

    describe "format" {
        it "erases both sectors and drops every previously live block" {
            let mut e = fresh();
            e.append(0x30, b"gone-after-format").unwrap();
            e.format();
            assert_eq!(e.query(0x30).unwrap(), None);
        }
    }
}

// Test-only helpers reaching into the engine's private state to set up the crash-recovery
// scenario and the cache-hit scenario above. Kept out of the public API.
fn e_program_calls(e: &Engine<MemoryFlash, 4>) -> usize {
    e.flash_program_calls()
}

fn poke_meta_status(e: &mut Engine<MemoryFlash, 4>, tag: u16, bad_status: u8) {
    let handle = e.query(tag).unwrap().unwrap();
    let meta_addr = handle.data_offset - crate::block::META_SIZE as u32;
    e.flash_poke(meta_addr + 2, bad_status);
    e.invalidate_cache();
}
