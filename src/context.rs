use std::sync::Arc;

use crate::api::ApiDefinitionManager;
use crate::config::{ConfigError, GatewayConfig};
use crate::fallback::FallbackRegistry;
use crate::flow::{Clock, RuleManager, SystemClock};
use crate::gateway::{FilterChain, HeaderOriginParser, SentinelGatewayFilter};
use crate::runtime_config::RuntimeConfig;

/// The shared components a protected gateway needs.
#[derive(Clone)]
pub struct GatewayContext {
    pub fallbacks: Arc<FallbackRegistry>,
    pub rules: Arc<RuleManager>,
    pub apis: Arc<ApiDefinitionManager>,
    origin_header: String,
}

impl GatewayContext {
    /// Fresh components configured from `runtime`, with a private registry.
    pub fn new(runtime: &RuntimeConfig) -> Self {
        Self::with_clock(runtime, Arc::new(SystemClock))
    }

    pub fn with_clock(runtime: &RuntimeConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            fallbacks: Arc::new(FallbackRegistry::new()),
            rules: Arc::new(RuleManager::with_clock(clock, runtime.stat_buckets)),
            apis: Arc::new(ApiDefinitionManager::new()),
            origin_header: runtime.origin_header.clone(),
        }
    }

    /// Use `registry` (e.g. [`fallback::global`](crate::fallback::global)) for fallbacks.
    #[must_use]
    pub fn with_fallbacks(mut self, registry: Arc<FallbackRegistry>) -> Self {
        self.fallbacks = registry;
        self
    }

    pub fn apply(&self, config: &GatewayConfig) -> Result<(), ConfigError> {
        config.apply(&self.fallbacks, &self.rules, &self.apis)
    }

    /// Filter that enforces this context's rules.
    pub fn sentinel_filter(&self) -> SentinelGatewayFilter {
        SentinelGatewayFilter::new(
            Arc::clone(&self.rules),
            Arc::clone(&self.apis),
            Arc::clone(&self.fallbacks),
        )
        .with_origin_parser(Box::new(HeaderOriginParser::new(self.origin_header.clone())))
    }

    /// Chain holding just the Sentinel filter.
    pub fn filter_chain(&self) -> FilterChain {
        let mut chain = FilterChain::new(Arc::clone(&self.fallbacks));
        chain.add_filter(Arc::new(self.sentinel_filter()));
        chain
    }
}
