use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, warn};

use super::{GatewayFilter, GatewayRequest, GatewayResponse, HeaderOriginParser, RequestOriginParser};
use crate::api::ApiDefinitionManager;
use crate::block::FallbackCause;
use crate::fallback::FallbackRegistry;
use crate::flow::{Entry, ResourceMode, RuleManager};
use crate::ids::RequestSeq;

/// Protects gateway routes with the rule manager.
///
/// `before` enters the route id and then every custom API matching the
/// path. The first block releases the entries already taken and returns the
/// route's fallback response. Held entries are traced on upstream errors
/// and exited in `after`.
pub struct SentinelGatewayFilter {
    rules: Arc<RuleManager>,
    apis: Arc<ApiDefinitionManager>,
    fallbacks: Arc<FallbackRegistry>,
    origin_parser: Box<dyn RequestOriginParser>,
    /// Keyed by [`GatewayRequest::seq`], not the caller-supplied request id
    entries: DashMap<RequestSeq, Vec<Entry>>,
}

impl SentinelGatewayFilter {
    pub fn new(
        rules: Arc<RuleManager>,
        apis: Arc<ApiDefinitionManager>,
        fallbacks: Arc<FallbackRegistry>,
    ) -> Self {
        Self {
            rules,
            apis,
            fallbacks,
            origin_parser: Box::new(HeaderOriginParser::default()),
            entries: DashMap::new(),
        }
    }

    #[must_use]
    pub fn with_origin_parser(mut self, parser: Box<dyn RequestOriginParser>) -> Self {
        self.origin_parser = parser;
        self
    }

    /// Requests currently holding entries.
    pub fn in_flight(&self) -> usize {
        self.entries.len()
    }

    fn block_response(&self, req: &GatewayRequest, cause: &FallbackCause) -> GatewayResponse {
        let provider = self.fallbacks.get_fallback_provider(&req.route_id);
        let block = provider.fallback_response(&req.route_id, cause);
        GatewayResponse::from_block(&block, provider.as_ref())
    }
}

impl GatewayFilter for SentinelGatewayFilter {
    fn before(&self, req: &GatewayRequest) -> Option<GatewayResponse> {
        let origin = self.origin_parser.parse_origin(req);
        let mut resources = vec![(req.route_id.clone(), ResourceMode::RouteId)];
        resources.extend(
            self.apis
                .matching_apis(&req.path)
                .into_iter()
                .map(|api| (api, ResourceMode::CustomApiName)),
        );

        let mut held = Vec::with_capacity(resources.len());
        for (resource, mode) in &resources {
            match self.rules.entry(resource, *mode, &origin) {
                Ok(entry) => held.push(entry),
                Err(err) => {
                    for entry in held {
                        entry.abandon();
                    }
                    warn!(
                        request_id = %req.request_id,
                        route = %req.route_id,
                        resource = %resource,
                        block_type = %err.block_type,
                        "request blocked"
                    );
                    return Some(self.block_response(req, &FallbackCause::Block(err)));
                }
            }
        }

        debug!(
            request_id = %req.request_id,
            route = %req.route_id,
            resources = held.len(),
            "request admitted"
        );
        self.entries.insert(req.seq(), held);
        None
    }

    fn on_error(&self, req: &GatewayRequest, error: &str) {
        if let Some(mut held) = self.entries.get_mut(&req.seq()) {
            for entry in held.iter_mut() {
                entry.trace_error(error);
            }
        }
    }

    fn after(&self, req: &GatewayRequest, res: &mut GatewayResponse, latency: Duration) {
        if let Some((_, held)) = self.entries.remove(&req.seq()) {
            debug!(
                request_id = %req.request_id,
                route = %req.route_id,
                status = res.status,
                latency_ms = latency.as_millis() as u64,
                "request completed"
            );
            for entry in held {
                entry.exit();
            }
        }
    }
}
