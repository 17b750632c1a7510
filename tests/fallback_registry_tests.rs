use std::sync::Arc;
use std::thread;

use sentinel_gateway::block::{BlockError, FallbackCause};
use sentinel_gateway::fallback::{
    self, BlockResponse, FallbackProvider, FallbackRegistry, StaticFallbackProvider,
};

struct Maintenance {
    route: String,
}

impl FallbackProvider for Maintenance {
    fn route(&self) -> &str {
        &self.route
    }

    fn fallback_response(&self, route: &str, cause: &FallbackCause) -> BlockResponse {
        match cause.as_block() {
            Some(err) => BlockResponse::new(503, format!("{} limited", err.resource), route),
            None => BlockResponse::new(502, "upstream down", route),
        }
    }

    fn content_type(&self) -> &str {
        "application/problem+json"
    }
}

fn maintenance(route: &str) -> Arc<dyn FallbackProvider> {
    Arc::new(Maintenance {
        route: route.to_string(),
    })
}

#[test]
fn test_global_registry_register_get_clear() {
    // the only test in this binary that touches the process-wide registry
    let flow = FallbackCause::Block(BlockError::flow("book-service"));

    let before = fallback::get_fallback_provider("book-service");
    assert_eq!(before.route(), "*");
    assert_eq!(before.fallback_response("book-service", &flow).code, 429);

    assert!(fallback::register_provider(maintenance("book-service")).is_none());
    let provider = fallback::get_fallback_provider("book-service");
    assert_eq!(provider.route(), "book-service");
    assert_eq!(provider.content_type(), "application/problem+json");
    let resp = provider.fallback_response("book-service", &flow);
    assert_eq!(resp.code, 503);
    assert_eq!(resp.message, "book-service limited");

    assert!(fallback::global().contains_route("book-service"));

    fallback::clear();
    assert_eq!(fallback::get_fallback_provider("book-service").route(), "*");
    assert!(fallback::global().is_empty());
}

#[test]
fn test_register_replaces_and_returns_previous() {
    let registry = FallbackRegistry::new();
    registry.register_provider(maintenance("users"));
    let previous = registry
        .register_provider(Arc::new(StaticFallbackProvider::new("users", 418, "teapot")))
        .unwrap();
    assert_eq!(previous.content_type(), "application/problem+json");

    let cause = FallbackCause::Block(BlockError::flow("users"));
    assert_eq!(registry.fallback_response("users", &cause).code, 418);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_wildcard_provider_becomes_default() {
    let registry = FallbackRegistry::new();
    registry.register_provider(Arc::new(StaticFallbackProvider::new("*", 503, "later")));
    registry.register_provider(maintenance("orders"));

    let cause = FallbackCause::Block(BlockError::degrade("anything"));
    let resp = registry.fallback_response("anything", &cause);
    assert_eq!(resp.code, 503);
    assert_eq!(resp.route, "anything");
    assert_eq!(registry.routes(), vec!["orders".to_string()]);

    registry.clear();
    let resp = registry.fallback_response("anything", &cause);
    assert_eq!(resp.code, 429);
}

#[test]
fn test_non_block_cause_is_system_error() {
    let registry = FallbackRegistry::new();
    let cause = FallbackCause::Other("timeout".into());
    let resp = registry.fallback_response("users", &cause);
    assert_eq!(resp.code, 500);
    assert_eq!(resp.message, "System Error");

    registry.register_provider(maintenance("users"));
    assert_eq!(registry.fallback_response("users", &cause).code, 502);
}

#[test]
fn test_concurrent_readers_see_complete_snapshots() {
    let registry = Arc::new(FallbackRegistry::new());
    let cause = FallbackCause::Block(BlockError::flow("svc"));

    let writers: Vec<_> = (0..4)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for j in 0..50 {
                    registry.register_provider(maintenance(&format!("svc-{i}-{j}")));
                }
            })
        })
        .collect();
    let reader = {
        let registry = Arc::clone(&registry);
        let cause = cause.clone();
        thread::spawn(move || {
            for _ in 0..500 {
                let code = registry.fallback_response("svc-missing", &cause).code;
                assert_eq!(code, 429);
            }
        })
    };

    for w in writers {
        w.join().unwrap();
    }
    reader.join().unwrap();
    assert_eq!(registry.len(), 200);
}

#[test]
fn test_concurrent_register_then_lookup_sees_own_provider() {
    let registry = Arc::new(FallbackRegistry::new());
    let barrier = Arc::new(std::sync::Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for j in 0..25 {
                    let route = format!("route-{i}-{j}");
                    registry.register_provider(maintenance(&route));
                    assert_eq!(registry.get_fallback_provider(&route).route(), route);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(registry.len(), 200);
}
