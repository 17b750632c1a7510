use tracing::debug;

use super::BlockResponse;
use crate::block::FallbackCause;

/// Route served by the default provider.
pub const WILDCARD_ROUTE: &str = "*";

pub const DEFAULT_BLOCK_STATUS: u16 = 429;
pub const DEFAULT_BLOCK_MESSAGE: &str = "Sentinel block exception";
pub const SYSTEM_ERROR_STATUS: u16 = 500;
pub const SYSTEM_ERROR_MESSAGE: &str = "System Error";
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Produces the substitute response for a blocked or failed route.
///
/// Implementations are registered in a [`FallbackRegistry`](super::FallbackRegistry)
/// under the route they return from [`route`](FallbackProvider::route).
///
/// # Example
///
/// ```rust
/// use sentinel_gateway::block::FallbackCause;
/// use sentinel_gateway::fallback::{BlockResponse, FallbackProvider};
///
/// struct Maintenance;
///
/// impl FallbackProvider for Maintenance {
///     fn route(&self) -> &str {
///         "book-service"
///     }
///
///     fn fallback_response(&self, route: &str, _cause: &FallbackCause) -> BlockResponse {
///         BlockResponse::new(503, "Down for maintenance", route)
///     }
/// }
/// ```
pub trait FallbackProvider: Send + Sync {
    /// Route this provider answers for; `*` marks the default provider.
    fn route(&self) -> &str;

    fn fallback_response(&self, route: &str, cause: &FallbackCause) -> BlockResponse;

    /// Content type of the rendered body.
    fn content_type(&self) -> &str {
        DEFAULT_CONTENT_TYPE
    }
}

/// Built-in provider used whenever no route-specific provider matches.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBlockFallbackProvider;

impl FallbackProvider for DefaultBlockFallbackProvider {
    fn route(&self) -> &str {
        WILDCARD_ROUTE
    }

    fn fallback_response(&self, route: &str, cause: &FallbackCause) -> BlockResponse {
        if cause.is_block() {
            BlockResponse::new(DEFAULT_BLOCK_STATUS, DEFAULT_BLOCK_MESSAGE, route)
        } else {
            BlockResponse::new(SYSTEM_ERROR_STATUS, SYSTEM_ERROR_MESSAGE, route)
        }
    }
}

/// Provider with a fixed status and message, usually built from config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFallbackProvider {
    route: String,
    status: u16,
    message: String,
    content_type: Option<String>,
}

impl StaticFallbackProvider {
    pub fn new(route: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            status,
            message: message.into(),
            content_type: None,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }
}

impl FallbackProvider for StaticFallbackProvider {
    fn route(&self) -> &str {
        &self.route
    }

    fn fallback_response(&self, route: &str, cause: &FallbackCause) -> BlockResponse {
        match cause {
            FallbackCause::Block(err) => {
                debug!(
                    route = %route,
                    block_type = %err.block_type,
                    status = self.status,
                    "static fallback for blocked route"
                );
                BlockResponse::new(self.status, self.message.clone(), route)
            }
            FallbackCause::Other(_) => {
                BlockResponse::new(SYSTEM_ERROR_STATUS, SYSTEM_ERROR_MESSAGE, route)
            }
        }
    }

    fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockError;

    #[test]
    fn test_default_provider_block_is_429() {
        let cause = FallbackCause::Block(BlockError::flow("users"));
        let resp = DefaultBlockFallbackProvider.fallback_response("users", &cause);
        assert_eq!(resp, BlockResponse::new(429, "Sentinel block exception", "users"));
    }

    #[test]
    fn test_default_provider_other_is_500() {
        let cause = FallbackCause::Other("connection reset".into());
        let resp = DefaultBlockFallbackProvider.fallback_response("users", &cause);
        assert_eq!(resp.code, 500);
        assert_eq!(resp.message, "System Error");
    }

    #[test]
    fn test_static_provider_uses_configured_status() {
        let provider = StaticFallbackProvider::new("orders", 503, "Try later")
            .with_content_type("application/json");
        let cause = FallbackCause::Block(BlockError::flow("orders"));
        let resp = provider.fallback_response("orders", &cause);
        assert_eq!(resp.code, 503);
        assert_eq!(resp.message, "Try later");
        assert_eq!(provider.content_type(), "application/json");
        assert_eq!(
            StaticFallbackProvider::new("x", 503, "y").content_type(),
            DEFAULT_CONTENT_TYPE
        );
    }
}
