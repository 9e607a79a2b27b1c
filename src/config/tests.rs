#![cfg(test)]

use crate::config::EngineConfig;
use crate::error::ConfigError;
use speculate::speculate; // Must be imported into the current scope.

speculate! {
    describe "EngineConfig::validate" {
        it "accepts two adjacent, equally-sized sectors" {
            let cfg = EngineConfig {
                major_addr: 0,
                minor_addr: 256,
                sector_size: 256,
                cache_capacity: 16,
            };
            assert_eq!(cfg.validate(), Ok(()));
        }

        it "accepts the sectors in either address order" {
            let cfg = EngineConfig {
                major_addr: 256,
                minor_addr: 0,
                sector_size: 256,
                cache_capacity: 16,
            };
            assert_eq!(cfg.validate(), Ok(()));
        }

        it "rejects overlapping sectors" {
            let cfg = EngineConfig {
                major_addr: 0,
                minor_addr: 128,
                sector_size: 256,
                cache_capacity: 16,
            };
            assert_eq!(cfg.validate(), Err(ConfigError::SectorsOverlap));
        }

        it "rejects a sector too small to hold a header and one block" {
            let cfg = EngineConfig {
                major_addr: 0,
                minor_addr: 8,
                sector_size: 8,
                cache_capacity: 16,
            };
            assert_eq!(cfg.validate(), Err(ConfigError::SectorTooSmall));
        }

        it "rejects a zero-capacity cache" {
            let cfg = EngineConfig {
                major_addr: 0,
                minor_addr: 256,
                sector_size: 256,
                cache_capacity: 0,
            };
            assert_eq!(cfg.validate(), Err(ConfigError::EmptyCache));
        }
    }
}
