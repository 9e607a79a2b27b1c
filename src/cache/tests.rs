#![cfg(test)]

use crate::cache::RecencyCache;
use speculate::speculate; // Must be imported into the current scope.

speculate! {
    describe "RecencyCache" {
        it "misses on an empty cache" {
            let mut cache: RecencyCache<4> = RecencyCache::new();
            assert_eq!(cache.get(0x10), None);
        }

        it "hits what was just set" {
            let mut cache: RecencyCache<4> = RecencyCache::new();
            cache.set(0x10, 128);
            assert_eq!(cache.get(0x10), Some(128));
        }

        it "overwrites the offset on a repeated set for the same tag" {
            let mut cache: RecencyCache<4> = RecencyCache::new();
            cache.set(0x10, 128);
            cache.set(0x10, 256);
            assert_eq!(cache.get(0x10), Some(256));
        }

        it "removes a tag so it misses again" {
            let mut cache: RecencyCache<4> = RecencyCache::new();
            cache.set(0x10, 128);
            cache.remove(0x10);
            assert_eq!(cache.get(0x10), None);
        }

        it "invalidate clears every slot" {
            let mut cache: RecencyCache<4> = RecencyCache::new();
            cache.set(0x10, 128);
            cache.set(0x20, 256);
            cache.invalidate();
            assert_eq!(cache.get(0x10), None);
            assert_eq!(cache.get(0x20), None);
        }

        it "evicts the least-recently-bumped slot once full" {
            let mut cache: RecencyCache<2> = RecencyCache::new();
            cache.set(0x10, 1);
            cache.set(0x20, 2);
            // Bump 0x20 so 0x10 becomes the minimum-age slot.
            cache.get(0x20);
            cache.set(0x30, 3);
            assert_eq!(cache.get(0x10), None);
            assert_eq!(cache.get(0x20), Some(2));
            assert_eq!(cache.get(0x30), Some(3));
        }

        it "fills every slot before it ever evicts" {
            let mut cache: RecencyCache<3> = RecencyCache::new();
            cache.set(0x01, 1);
            cache.set(0x02, 2);
            cache.set(0x03, 3);
            assert_eq!(cache.get(0x01), Some(1));
            assert_eq!(cache.get(0x02), Some(2));
            assert_eq!(cache.get(0x03), Some(3));
        }
    }
}
