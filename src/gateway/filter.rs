use std::time::Duration;

use super::{GatewayRequest, GatewayResponse};

/// Hook around upstream calls.
///
/// `before` may short-circuit by returning a response; the upstream is then
/// skipped. `on_error` runs when the upstream fails and `after` runs for
/// every request that got past `before` of this filter.
pub trait GatewayFilter: Send + Sync {
    fn before(&self, _req: &GatewayRequest) -> Option<GatewayResponse> {
        None
    }
    fn on_error(&self, _req: &GatewayRequest, _error: &str) {}
    fn after(&self, _req: &GatewayRequest, _res: &mut GatewayResponse, _latency: Duration) {}
}
