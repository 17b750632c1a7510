use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, info};

use super::provider::{DefaultBlockFallbackProvider, FallbackProvider, WILDCARD_ROUTE};
use super::BlockResponse;
use crate::block::FallbackCause;

#[derive(Clone)]
struct Snapshot {
    routes: HashMap<String, Arc<dyn FallbackProvider>>,
    default: Arc<dyn FallbackProvider>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
            default: Arc::new(DefaultBlockFallbackProvider),
        }
    }
}

/// Maps route names to fallback providers.
///
/// Lookups read an immutable snapshot through [`ArcSwap`] and never block;
/// every update clones the snapshot and swaps it in.
pub struct FallbackRegistry {
    snapshot: ArcSwap<Snapshot>,
}

impl Default for FallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn is_wildcard(route: &str) -> bool {
    let route = route.trim();
    route.is_empty() || route == WILDCARD_ROUTE
}

impl FallbackRegistry {
    /// Create a registry holding only the built-in default provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
        }
    }

    /// Register `provider` under the route it reports.
    ///
    /// A `*` or empty route replaces the default provider. Any other route
    /// is keyed by its exact string. Returns the provider that was replaced.
    pub fn register_provider(
        &self,
        provider: Arc<dyn FallbackProvider>,
    ) -> Option<Arc<dyn FallbackProvider>> {
        let route = provider.route().to_string();
        let mut replaced = None;
        self.snapshot.rcu(|current| {
            let mut next = Snapshot::clone(current);
            if is_wildcard(&route) {
                replaced = Some(std::mem::replace(&mut next.default, Arc::clone(&provider)));
            } else {
                replaced = next.routes.insert(route.clone(), Arc::clone(&provider));
            }
            next
        });
        if is_wildcard(&route) {
            info!("default fallback provider replaced");
        } else {
            info!(route = %route, "fallback provider registered");
        }
        replaced
    }

    /// Provider for `route`: the exact match, else the default provider.
    #[must_use]
    pub fn get_fallback_provider(&self, route: &str) -> Arc<dyn FallbackProvider> {
        let snapshot = self.snapshot.load();
        match snapshot.routes.get(route) {
            Some(provider) => Arc::clone(provider),
            None => {
                debug!(route = %route, "no route fallback, using default");
                Arc::clone(&snapshot.default)
            }
        }
    }

    /// Resolve the provider for `route` and ask it for a response.
    #[must_use]
    pub fn fallback_response(&self, route: &str, cause: &FallbackCause) -> BlockResponse {
        self.get_fallback_provider(route)
            .fallback_response(route, cause)
    }

    /// Whether a route-specific provider is registered for `route`.
    #[must_use]
    pub fn contains_route(&self, route: &str) -> bool {
        self.snapshot.load().routes.contains_key(route)
    }

    /// Sorted list of routes with a dedicated provider.
    #[must_use]
    pub fn routes(&self) -> Vec<String> {
        let mut routes: Vec<String> = self.snapshot.load().routes.keys().cloned().collect();
        routes.sort();
        routes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.load().routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every route provider and restore the built-in default.
    pub fn clear(&self) {
        self.snapshot.store(Arc::new(Snapshot::default()));
        info!("fallback registry cleared");
    }

    /// Replace all providers at once.
    ///
    /// Used by config reloads so readers never observe a half-applied set.
    pub fn replace_all<I>(&self, providers: I)
    where
        I: IntoIterator<Item = Arc<dyn FallbackProvider>>,
    {
        let mut next = Snapshot::default();
        for provider in providers {
            let route = provider.route().to_string();
            if is_wildcard(&route) {
                next.default = provider;
            } else {
                next.routes.insert(route, provider);
            }
        }
        let count = next.routes.len();
        self.snapshot.store(Arc::new(next));
        info!(routes = count, "fallback providers replaced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockError;
    use crate::fallback::StaticFallbackProvider;

    fn block(route: &str) -> FallbackCause {
        FallbackCause::Block(BlockError::flow(route))
    }

    #[test]
    fn test_exact_match_returns_registered_provider() {
        let registry = FallbackRegistry::new();
        registry.register_provider(Arc::new(StaticFallbackProvider::new("users", 503, "busy")));

        let resp = registry.fallback_response("users", &block("users"));
        assert_eq!(resp.code, 503);
        assert_eq!(registry.get_fallback_provider("users").route(), "users");
    }

    #[test]
    fn test_unknown_route_uses_default() {
        let registry = FallbackRegistry::new();
        registry.register_provider(Arc::new(StaticFallbackProvider::new("users", 503, "busy")));

        let provider = registry.get_fallback_provider("users-v2");
        assert_eq!(provider.route(), "*");
        let resp = registry.fallback_response("users-v2", &block("users-v2"));
        assert_eq!(resp.code, 429);
        assert_eq!(resp.route, "users-v2");
    }

    #[test]
    fn test_wildcard_registration_replaces_default() {
        let registry = FallbackRegistry::new();
        registry.register_provider(Arc::new(StaticFallbackProvider::new("*", 418, "teapot")));

        assert!(registry.is_empty());
        let resp = registry.fallback_response("anything", &block("anything"));
        assert_eq!(resp.code, 418);
    }

    #[test]
    fn test_register_returns_replaced_provider() {
        let registry = FallbackRegistry::new();
        let first = registry
            .register_provider(Arc::new(StaticFallbackProvider::new("users", 503, "one")));
        assert!(first.is_none());

        let second = registry
            .register_provider(Arc::new(StaticFallbackProvider::new("users", 504, "two")));
        assert!(second.is_some());
        assert_eq!(registry.fallback_response("users", &block("users")).code, 504);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_clear_resets_routes_and_default() {
        let registry = FallbackRegistry::new();
        registry.register_provider(Arc::new(StaticFallbackProvider::new("users", 503, "busy")));
        registry.register_provider(Arc::new(StaticFallbackProvider::new("*", 418, "teapot")));

        registry.clear();

        assert!(registry.is_empty());
        assert!(!registry.contains_route("users"));
        assert_eq!(registry.fallback_response("users", &block("users")).code, 429);
    }

    #[test]
    fn test_replace_all_swaps_whole_set() {
        let registry = FallbackRegistry::new();
        registry.register_provider(Arc::new(StaticFallbackProvider::new("old", 503, "old")));

        registry.replace_all(vec![
            Arc::new(StaticFallbackProvider::new("a", 503, "a")) as Arc<dyn FallbackProvider>,
            Arc::new(StaticFallbackProvider::new("b", 502, "b")),
        ]);

        assert_eq!(registry.routes(), vec!["a".to_string(), "b".to_string()]);
    }
}
