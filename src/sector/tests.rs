#![cfg(test)]

use crate::flash::FlashDevice;
use crate::sector::{find_live, format, read_header, SectorHeader, VERSION_MAX, VERSION_MIN};
use crate::test_support::MemoryFlash;
use speculate::speculate; // Must be imported into the current scope.

speculate! {
    describe "SectorHeader encode/decode" {
        it "round-trips tag and version" {
            let header = SectorHeader { tag: 0xCAEE, version: 0x1234 };
            assert_eq!(SectorHeader::decode(&header.encode()), header);
        }
    }

    describe "next_version" {
        it "increments normally" {
            let header = SectorHeader { tag: 0xCAEE, version: 5 };
            assert_eq!(header.next_version(), 6);
        }

        it "wraps from VERSION_MAX back to VERSION_MIN" {
            let header = SectorHeader { tag: 0xCAEE, version: VERSION_MAX };
            assert_eq!(header.next_version(), VERSION_MIN);
        }
    }

    describe "find_live" {
        it "formats and elects major when both sectors are virgin" {
            let mut flash = MemoryFlash::new(512);
            let live = find_live(&mut flash, 0, 256, 256);
            assert_eq!(live, 0);
            assert!(read_header(&flash, 0).is_formatted());
            assert!(!read_header(&flash, 256).is_formatted());
        }

        it "elects whichever single sector carries the magic" {
            let mut flash = MemoryFlash::new(512);
            format(&mut flash, 0, 256, 256);
            // Corrupt the major sector's tag so only minor looks formatted.
            flash.poke(0, 0x00);
            assert_eq!(find_live(&mut flash, 0, 256, 256), 256);
        }

        it "elects the higher version when both are ordinarily formatted" {
            let mut flash = MemoryFlash::new(512);
            let header_lo = SectorHeader { tag: 0xCAEE, version: 3 };
            let header_hi = SectorHeader { tag: 0xCAEE, version: 4 };
            flash.program(0, &header_lo.encode());
            flash.program(256, &header_hi.encode());
            assert_eq!(find_live(&mut flash, 0, 256, 256), 256);
        }

        it "elects the VERSION_MIN sector when paired against VERSION_MAX (wraparound)" {
            let mut flash = MemoryFlash::new(512);
            let header_max = SectorHeader { tag: 0xCAEE, version: VERSION_MAX };
            let header_min = SectorHeader { tag: 0xCAEE, version: VERSION_MIN };
            flash.program(0, &header_max.encode());
            flash.program(256, &header_min.encode());
            assert_eq!(find_live(&mut flash, 0, 256, 256), 256);

            let mut flash2 = MemoryFlash::new(512);
            flash2.program(0, &header_min.encode());
            flash2.program(256, &header_max.encode());
            assert_eq!(find_live(&mut flash2, 0, 256, 256), 0);
        }
    }
}
