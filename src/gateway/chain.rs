use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info_span};

use super::{GatewayFilter, GatewayRequest, GatewayResponse};
use crate::block::FallbackCause;
use crate::fallback::FallbackRegistry;

/// Ordered list of filters wrapped around an upstream call.
#[derive(Clone)]
pub struct FilterChain {
    filters: Vec<Arc<dyn GatewayFilter>>,
    fallbacks: Arc<FallbackRegistry>,
}

impl FilterChain {
    /// `fallbacks` answers for upstream failures.
    pub fn new(fallbacks: Arc<FallbackRegistry>) -> Self {
        Self {
            filters: Vec::new(),
            fallbacks,
        }
    }

    pub fn add_filter(&mut self, filter: Arc<dyn GatewayFilter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run `req` through the filters and `upstream`.
    ///
    /// The first filter whose `before` returns a response stops the chain;
    /// filters that already ran still get `after`. An upstream error is
    /// reported to `on_error` and replaced by the route's fallback response.
    /// A panicking upstream counts as an error, so `after` still runs.
    pub fn process<F>(&self, req: &GatewayRequest, upstream: F) -> GatewayResponse
    where
        F: FnOnce(&GatewayRequest) -> Result<GatewayResponse, String>,
    {
        let span = info_span!(
            "gateway_request",
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            route = %req.route_id
        );
        let _guard = span.enter();
        let start = Instant::now();

        let mut ran = 0;
        let mut short_circuit = None;
        for filter in &self.filters {
            // a filter that short-circuits took no resources, only earlier ones need `after`
            if let Some(resp) = filter.before(req) {
                short_circuit = Some(resp);
                break;
            }
            ran += 1;
        }

        let mut resp = match short_circuit {
            Some(resp) => resp,
            None => match call_upstream(req, upstream) {
                Ok(resp) => resp,
                Err(err) => {
                    error!(route = %req.route_id, error = %err, "upstream failed");
                    for filter in &self.filters[..ran] {
                        filter.on_error(req, &err);
                    }
                    let provider = self.fallbacks.get_fallback_provider(&req.route_id);
                    let block =
                        provider.fallback_response(&req.route_id, &FallbackCause::Other(err));
                    GatewayResponse::from_block(&block, provider.as_ref())
                }
            },
        };

        let latency = start.elapsed();
        for filter in self.filters[..ran].iter().rev() {
            filter.after(req, &mut resp, latency);
        }
        resp
    }
}

fn call_upstream<F>(req: &GatewayRequest, upstream: F) -> Result<GatewayResponse, String>
where
    F: FnOnce(&GatewayRequest) -> Result<GatewayResponse, String>,
{
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| upstream(req))) {
        Ok(result) => result,
        Err(panic) => {
            let panic_message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| format!("{panic:?}"));
            error!(
                request_id = %req.request_id,
                route = %req.route_id,
                panic_message = %panic_message,
                "upstream panicked"
            );
            Err(format!("upstream panicked: {panic_message}"))
        }
    }
}
