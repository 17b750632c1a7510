//! # Fallback Module
//!
//! Picks the response a client receives when a gateway route is blocked.
//!
//! A [`FallbackRegistry`] maps exact route strings to [`FallbackProvider`]s.
//! Routes without a dedicated provider fall through to the default provider
//! registered under `*`, which is [`DefaultBlockFallbackProvider`] unless
//! replaced.
//!
//! A process-wide registry is available through [`global`] and the free
//! functions [`register_provider`], [`get_fallback_provider`] and [`clear`].
//!
//! ```rust
//! use std::sync::Arc;
//! use sentinel_gateway::block::{BlockError, FallbackCause};
//! use sentinel_gateway::fallback::{FallbackRegistry, StaticFallbackProvider};
//!
//! let registry = FallbackRegistry::new();
//! registry.register_provider(Arc::new(StaticFallbackProvider::new("users", 503, "busy")));
//!
//! let cause = FallbackCause::Block(BlockError::flow("users"));
//! assert_eq!(registry.fallback_response("users", &cause).code, 503);
//! assert_eq!(registry.fallback_response("orders", &cause).code, 429);
//! ```

mod provider;
mod registry;
mod response;

use std::sync::Arc;

use once_cell::sync::Lazy;

pub use provider::{
    DefaultBlockFallbackProvider, FallbackProvider, StaticFallbackProvider, DEFAULT_BLOCK_MESSAGE,
    DEFAULT_BLOCK_STATUS, DEFAULT_CONTENT_TYPE, SYSTEM_ERROR_MESSAGE, SYSTEM_ERROR_STATUS,
    WILDCARD_ROUTE,
};
pub use registry::FallbackRegistry;
pub use response::BlockResponse;

static GLOBAL_REGISTRY: Lazy<Arc<FallbackRegistry>> =
    Lazy::new(|| Arc::new(FallbackRegistry::new()));

/// The process-wide registry.
pub fn global() -> Arc<FallbackRegistry> {
    Arc::clone(&GLOBAL_REGISTRY)
}

/// Register a provider in the process-wide registry.
pub fn register_provider(provider: Arc<dyn FallbackProvider>) -> Option<Arc<dyn FallbackProvider>> {
    GLOBAL_REGISTRY.register_provider(provider)
}

/// Look up a provider in the process-wide registry.
pub fn get_fallback_provider(route: &str) -> Arc<dyn FallbackProvider> {
    GLOBAL_REGISTRY.get_fallback_provider(route)
}

/// Reset the process-wide registry.
pub fn clear() {
    GLOBAL_REGISTRY.clear();
}
