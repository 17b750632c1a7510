//! # CLI Module
//!
//! Command-line tooling for gateway config files.
//!
//! ## Commands
//!
//! ### `check`
//!
//! Validate a config file and print what it defines:
//!
//! ```bash
//! sentinel-gateway check --config gateway.yaml
//! ```
//!
//! ### `resolve`
//!
//! Print the fallback body a route returns for a given cause:
//!
//! ```bash
//! sentinel-gateway resolve --config gateway.yaml --route user-service --cause degrade
//! ```
//!
//! `--cause error` shows the response for an upstream failure instead of a block.
//!
//! ### `simulate`
//!
//! Drive synthetic requests through the filter chain on a simulated clock:
//!
//! ```bash
//! sentinel-gateway simulate --config gateway.yaml --route user-service \
//!     --path /users/1 --requests 50 --spacing-ms 10
//! ```
//!
//! `--config` falls back to `SENTINEL_GATEWAY_CONFIG`.

mod commands;


pub use commands::{run_cli, run_command, Cli, Commands, SimulationReport};
