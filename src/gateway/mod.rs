//! # Gateway Module
//!
//! Request/response model and the filter chain that applies flow control
//! around an upstream call.
//!
//! ```rust
//! use std::sync::Arc;
//! use http::Method;
//! use sentinel_gateway::api::ApiDefinitionManager;
//! use sentinel_gateway::fallback::FallbackRegistry;
//! use sentinel_gateway::flow::{GatewayFlowRule, RuleManager};
//! use sentinel_gateway::gateway::{
//!     FilterChain, GatewayRequest, GatewayResponse, HeaderVec, SentinelGatewayFilter,
//! };
//!
//! let rules = Arc::new(RuleManager::new());
//! rules.load_flow_rules(vec![GatewayFlowRule::qps("users", 0.0)]).unwrap();
//! let fallbacks = Arc::new(FallbackRegistry::new());
//!
//! let mut chain = FilterChain::new(fallbacks.clone());
//! chain.add_filter(Arc::new(SentinelGatewayFilter::new(
//!     rules,
//!     Arc::new(ApiDefinitionManager::new()),
//!     fallbacks,
//! )));
//!
//! let req = GatewayRequest::new(Method::GET, "/users/1", "users");
//! let resp = chain.process(&req, |_| Ok(GatewayResponse::new(200, HeaderVec::new(), "ok")));
//! assert_eq!(resp.status, 429);
//! ```

mod chain;
mod filter;
mod origin;
mod request;
mod response;
mod sentinel;

pub use chain::FilterChain;
pub use filter::GatewayFilter;
pub use origin::{HeaderOriginParser, RequestOriginParser, DEFAULT_ORIGIN_HEADER};
pub use request::{GatewayRequest, HeaderVec, MAX_INLINE_HEADERS};
pub use response::GatewayResponse;
pub use sentinel::SentinelGatewayFilter;
