//! # Runtime Configuration Module
//!
//! Environment variables that shape the gateway at startup.
//!
//! ## Environment Variables
//!
//! ### `SENTINEL_GATEWAY_CONFIG`
//!
//! Path of the YAML rules file loaded at startup. Unset means no file; the
//! CLI `--config` flag takes precedence.
//!
//! ### `SENTINEL_ORIGIN_HEADER`
//!
//! Header read by the default origin parser. Default: `S-Origin`.
//!
//! ### `SENTINEL_STAT_BUCKETS`
//!
//! Buckets per statistic window. Accepts decimal (`4`) or hexadecimal
//! (`0x4`). Default: `2`.
//!
//! More buckets make QPS limits slide more smoothly at the cost of a little
//! more work per request.
//!
//! ```rust
//! use sentinel_gateway::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! assert!(config.stat_buckets >= 1);
//! ```

use std::env;
use std::path::PathBuf;

use crate::flow::DEFAULT_BUCKET_COUNT;
use crate::gateway::DEFAULT_ORIGIN_HEADER;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub config_path: Option<PathBuf>,
    pub origin_header: String,
    pub stat_buckets: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            origin_header: DEFAULT_ORIGIN_HEADER.to_string(),
            stat_buckets: DEFAULT_BUCKET_COUNT,
        }
    }
}

fn parse_count(val: &str) -> Option<u32> {
    let val = val.trim();
    let parsed = match val.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    };
    parsed.filter(|n| *n > 0)
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config_path = env::var("SENTINEL_GATEWAY_CONFIG")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
        let origin_header = env::var("SENTINEL_ORIGIN_HEADER")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.origin_header);
        let stat_buckets = env::var("SENTINEL_STAT_BUCKETS")
            .ok()
            .and_then(|v| parse_count(&v))
            .unwrap_or(defaults.stat_buckets);
        RuntimeConfig {
            config_path,
            origin_header,
            stat_buckets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count_accepts_hex_and_decimal() {
        assert_eq!(parse_count("4"), Some(4));
        assert_eq!(parse_count("0x10"), Some(16));
        assert_eq!(parse_count("0"), None);
        assert_eq!(parse_count("many"), None);
    }
}
