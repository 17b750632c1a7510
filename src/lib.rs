//! # sentinel-gateway
//!
//! **sentinel-gateway** applies Sentinel-style flow control to API gateway routes and
//! picks the substitute response a client receives when a route is blocked.
//!
//! ## Overview
//!
//! The crate is organized into these modules:
//!
//! - **[`fallback`]** - Route → fallback provider registry and the block response model
//! - **[`block`]** - Block errors raised by rule checks
//! - **[`flow`]** - QPS/concurrency limits, circuit breaking and authority rules
//! - **[`api`]** - Custom API definitions grouping request paths under a name
//! - **[`gateway`]** - Request/response model, origin parsing and the filter chain
//! - **[`config`]** - YAML config files and their validation
//! - **[`hot_reload`]** - Re-applying a config file when it changes
//! - **[`logging`]** - `tracing` subscriber setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Chain as FilterChain
//!     participant Filter as SentinelGatewayFilter
//!     participant Rules as RuleManager
//!     participant Registry as FallbackRegistry
//!     participant Upstream
//!
//!     Client->>Chain: GET /users/7 (route user-service)
//!     Chain->>Filter: before(req)
//!     Filter->>Rules: entry(route id)
//!     Filter->>Rules: entry(each matching API)
//!
//!     alt Blocked
//!         Rules-->>Filter: BlockError
//!         Filter->>Registry: get_fallback_provider(route)
//!         Registry-->>Filter: exact match or "*" default
//!         Filter-->>Client: 429 {"code":429,"message":"Sentinel block exception","route":"user-service"}
//!     end
//!
//!     Chain->>Upstream: forward
//!     alt Upstream fails
//!         Chain->>Filter: on_error(req)
//!         Chain->>Registry: fallback for non-block cause
//!     end
//!     Chain->>Filter: after(req, res, latency)
//!     Filter->>Rules: exit entries
//!     Chain-->>Client: response
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use sentinel_gateway::block::{BlockError, FallbackCause};
//! use sentinel_gateway::fallback::{self, StaticFallbackProvider};
//!
//! fallback::register_provider(Arc::new(StaticFallbackProvider::new("book-service", 503, "busy")));
//!
//! let cause = FallbackCause::Block(BlockError::flow("book-service"));
//! let resp = fallback::get_fallback_provider("book-service").fallback_response("book-service", &cause);
//! assert_eq!(resp.code, 503);
//!
//! // any other route falls back to the "*" default
//! assert_eq!(fallback::get_fallback_provider("other").route(), "*");
//! ```

pub mod api;
pub mod block;
pub mod cli;
pub mod config;
mod context;
pub mod fallback;
pub mod flow;
pub mod gateway;
pub mod hot_reload;
pub mod ids;
pub mod logging;
pub mod runtime_config;

pub use block::{BlockError, BlockType, FallbackCause};
pub use config::{load_config, GatewayConfig};
pub use context::GatewayContext;
pub use fallback::{BlockResponse, FallbackProvider, FallbackRegistry};
