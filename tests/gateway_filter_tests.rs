use std::sync::Arc;

use http::Method;
use sentinel_gateway::api::{ApiDefinition, ApiPathPredicate, MatchStrategy};
use sentinel_gateway::fallback::{FallbackProvider, StaticFallbackProvider};
use sentinel_gateway::flow::{
    AuthorityRule, AuthorityStrategy, DegradeRule, GatewayFlowRule, ResourceMode,
};
use sentinel_gateway::gateway::{
    FilterChain, GatewayFilter, GatewayRequest, GatewayResponse, HeaderVec,
};
use sentinel_gateway::GatewayConfig;

mod common;
use common::gateway::{body_json, manual_context, ok};

fn users_request() -> GatewayRequest {
    GatewayRequest::new(Method::GET, "/users/42", "users")
}

#[test]
fn test_route_block_uses_route_fallback() {
    let (ctx, _clock) = manual_context();
    ctx.rules
        .load_flow_rules(vec![GatewayFlowRule::qps("users", 1.0)])
        .unwrap();
    ctx.fallbacks.register_provider(
        Arc::new(StaticFallbackProvider::new("users", 503, "users busy")) as Arc<dyn FallbackProvider>,
    );
    let chain = ctx.filter_chain();

    assert_eq!(chain.process(&users_request(), ok).status, 200);

    let blocked = chain.process(&users_request(), ok);
    assert_eq!(blocked.status, 503);
    assert_eq!(blocked.get_header("Content-Type"), Some("application/json"));
    let body = body_json(&blocked);
    assert_eq!(body["code"], 503);
    assert_eq!(body["message"], "users busy");
    assert_eq!(body["route"], "users");
}

#[test]
fn test_unregistered_route_gets_default_fallback() {
    let (ctx, _clock) = manual_context();
    ctx.rules
        .load_flow_rules(vec![GatewayFlowRule::qps("orders", 0.0)])
        .unwrap();
    let chain = ctx.filter_chain();

    let req = GatewayRequest::new(Method::POST, "/orders", "orders");
    let resp = chain.process(&req, ok);
    assert_eq!(resp.status, 429);
    let body = body_json(&resp);
    assert_eq!(body["message"], "Sentinel block exception");
    assert_eq!(body["route"], "orders");
}

#[test]
fn test_burst_extends_qps_threshold() {
    let (ctx, clock) = manual_context();
    ctx.rules
        .load_flow_rules(vec![GatewayFlowRule::qps("users", 2.0).with_burst(1)])
        .unwrap();
    let chain = ctx.filter_chain();

    let statuses: Vec<u16> = (0..4)
        .map(|_| chain.process(&users_request(), ok).status)
        .collect();
    assert_eq!(statuses, vec![200, 200, 200, 429]);

    clock.advance(1_000);
    assert_eq!(chain.process(&users_request(), ok).status, 200);
}

#[test]
fn test_custom_api_block_answers_with_route_fallback() {
    let (ctx, _clock) = manual_context();
    ctx.apis
        .load(vec![ApiDefinition::new(
            "user-api",
            vec![ApiPathPredicate::new("/users/**", MatchStrategy::Prefix)],
        )])
        .unwrap();
    ctx.rules
        .load_flow_rules(vec![
            GatewayFlowRule::qps("user-api", 0.0).with_mode(ResourceMode::CustomApiName)
        ])
        .unwrap();
    ctx.fallbacks.register_provider(
        Arc::new(StaticFallbackProvider::new("users", 503, "users busy")) as Arc<dyn FallbackProvider>,
    );
    let chain = ctx.filter_chain();

    let resp = chain.process(&users_request(), ok);
    assert_eq!(resp.status, 503);
    assert_eq!(body_json(&resp)["route"], "users");

    // the route entry taken before the API blocked must not leak a thread slot
    let stats = ctx.rules.node_stats("users");
    assert_eq!(stats.threads, 0);
    assert_eq!(stats.total_success, 0);
    assert_eq!(ctx.rules.node_stats("user-api").total_block, 1);

    let other = GatewayRequest::new(Method::GET, "/orders/1", "orders");
    assert_eq!(chain.process(&other, ok).status, 200);
}

#[test]
fn test_route_mode_rule_ignores_api_with_same_name() {
    let (ctx, _clock) = manual_context();
    ctx.apis
        .load(vec![ApiDefinition::new(
            "users",
            vec![ApiPathPredicate::new("/users/**", MatchStrategy::Prefix)],
        )])
        .unwrap();
    ctx.rules
        .load_flow_rules(vec![GatewayFlowRule::qps("users", 1.0)])
        .unwrap();
    let chain = ctx.filter_chain();

    // the custom API entry on "users" is not limited by the route-id rule
    assert_eq!(chain.process(&users_request(), ok).status, 200);
    assert_eq!(chain.process(&users_request(), ok).status, 429);
}

#[test]
fn test_authority_rule_reads_origin_header() {
    let (ctx, _clock) = manual_context();
    ctx.rules
        .load_authority_rules(vec![AuthorityRule::new(
            "users",
            AuthorityStrategy::Black,
            vec!["crawler".into()],
        )])
        .unwrap();
    let chain = ctx.filter_chain();

    let crawler = users_request().with_header("S-Origin", "crawler");
    let resp = chain.process(&crawler, ok);
    assert_eq!(resp.status, 429);

    let mobile = users_request().with_header("s-origin", "mobile");
    assert_eq!(chain.process(&mobile, ok).status, 200);
    assert_eq!(chain.process(&users_request(), ok).status, 200);
}

#[test]
fn test_thread_grade_limits_concurrent_requests() {
    let (ctx, _clock) = manual_context();
    ctx.rules
        .load_flow_rules(vec![GatewayFlowRule::thread("users", 1.0)])
        .unwrap();
    let chain = ctx.filter_chain();

    let outer = chain.process(&users_request(), |_req| {
        let inner = chain.process(&users_request(), ok);
        Ok(GatewayResponse::new(200, Default::default(), inner.status.to_string()))
    });
    assert_eq!(outer.status, 200);
    assert_eq!(outer.body, "429");

    assert_eq!(chain.process(&users_request(), ok).status, 200);
}

#[test]
fn test_upstream_errors_open_and_probe_closes_breaker() {
    let (ctx, clock) = manual_context();
    ctx.rules
        .load_degrade_rules(vec![DegradeRule::new("users", 2, 5_000)])
        .unwrap();
    let filter = Arc::new(ctx.sentinel_filter());
    let mut chain = FilterChain::new(Arc::clone(&ctx.fallbacks));
    chain.add_filter(Arc::clone(&filter) as Arc<dyn GatewayFilter>);

    for _ in 0..2 {
        let resp = chain.process(&users_request(), |_req| Err("connection reset".to_string()));
        assert_eq!(resp.status, 500);
        assert_eq!(body_json(&resp)["message"], "System Error");
    }
    assert_eq!(filter.in_flight(), 0);
    assert_eq!(ctx.rules.node_stats("users").total_error, 2);

    // open: rejected as a block
    assert_eq!(chain.process(&users_request(), ok).status, 429);

    clock.advance(5_000);
    assert_eq!(chain.process(&users_request(), ok).status, 200);
    assert_eq!(chain.process(&users_request(), ok).status, 200);
    assert_eq!(filter.in_flight(), 0);
}

#[test]
fn test_config_apply_drives_chain() {
    let (ctx, _clock) = manual_context();
    let config = GatewayConfig::from_yaml(
        r#"
fallbacks:
  - route: "*"
    status: 503
    message: "try later"
flow_rules:
  - resource: users
    count: 1
"#,
    )
    .unwrap();
    ctx.apply(&config).unwrap();
    let chain = ctx.filter_chain();

    assert_eq!(chain.process(&users_request(), ok).status, 200);
    let resp = chain.process(&users_request(), ok);
    assert_eq!(resp.status, 503);
    assert_eq!(body_json(&resp)["message"], "try later");
}

fn request_with_id(id: &str) -> GatewayRequest {
    let mut headers = HeaderVec::new();
    headers.push((Arc::from("x-request-id"), id.to_string()));
    GatewayRequest::from_parts(Method::GET, "/users/42", "users", headers)
}

#[test]
fn test_shared_request_id_does_not_free_thread_slots() {
    let (ctx, _clock) = manual_context();
    ctx.rules
        .load_flow_rules(vec![GatewayFlowRule::thread("users", 2.0)])
        .unwrap();
    let filter = Arc::new(ctx.sentinel_filter());
    let mut chain = FilterChain::new(Arc::clone(&ctx.fallbacks));
    chain.add_filter(Arc::clone(&filter) as Arc<dyn GatewayFilter>);

    let shared = GatewayRequest::new(Method::GET, "/", "seed").request_id.to_string();
    let a = request_with_id(&shared);
    let b = request_with_id(&shared);
    assert_eq!(a.request_id, b.request_id);

    let statuses = chain.process(&a, |_| {
        let inner = chain.process(&b, |_| {
            assert_eq!(filter.in_flight(), 2);
            assert_eq!(ctx.rules.node_stats("users").threads, 2);
            let third = chain.process(&users_request(), ok);
            Ok(GatewayResponse::new(200, HeaderVec::new(), third.status.to_string()))
        });
        Ok(GatewayResponse::new(200, HeaderVec::new(), inner.body))
    });
    assert_eq!(statuses.body, "429");
    assert_eq!(filter.in_flight(), 0);
    assert_eq!(ctx.rules.node_stats("users").threads, 0);
}

#[test]
fn test_upstream_panic_releases_entries() {
    let (ctx, _clock) = manual_context();
    ctx.rules
        .load_flow_rules(vec![GatewayFlowRule::thread("users", 1.0)])
        .unwrap();
    let filter = Arc::new(ctx.sentinel_filter());
    let mut chain = FilterChain::new(Arc::clone(&ctx.fallbacks));
    chain.add_filter(Arc::clone(&filter) as Arc<dyn GatewayFilter>);

    let resp = chain.process(&users_request(), |_| panic!("upstream bug"));
    assert_eq!(resp.status, 500);
    assert_eq!(filter.in_flight(), 0);
    assert_eq!(ctx.rules.node_stats("users").total_error, 1);
    assert_eq!(chain.process(&users_request(), ok).status, 200);
}

#[test]
fn test_concurrent_requests_respect_qps() {
    let (ctx, _clock) = manual_context();
    ctx.rules
        .load_flow_rules(vec![GatewayFlowRule::qps("users", 10.0)])
        .unwrap();
    let chain = Arc::new(ctx.filter_chain());
    let barrier = Arc::new(std::sync::Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let chain = Arc::clone(&chain);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                (0..5)
                    .filter(|_| chain.process(&users_request(), ok).status == 200)
                    .count()
            })
        })
        .collect();
    let passed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(passed, 10);
    assert_eq!(ctx.rules.node_stats("users").total_block, 30);
}
