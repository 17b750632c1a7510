use std::sync::{Arc, Mutex};
use std::time::Duration;

use http::Method;
use sentinel_gateway::gateway::GatewayRequest;
use sentinel_gateway::hot_reload::watch_config;
use sentinel_gateway::load_config;

mod common;
use common::gateway::{manual_context, ok};
use common::temp_files;

const CONFIG_V1: &str = r#"
flow_rules:
  - resource: users
    count: 100
"#;

const CONFIG_V2: &str = r#"
fallbacks:
  - route: users
    status: 503
    message: reloaded
flow_rules:
  - resource: users
    count: 0
"#;

#[test]
fn test_watch_config_reload() {
    let path = temp_files::create_temp_yaml(CONFIG_V1);
    let (ctx, _clock) = manual_context();
    ctx.apply(&load_config(&path).unwrap()).unwrap();

    let chain = ctx.filter_chain();
    let req = || GatewayRequest::new(Method::GET, "/users", "users");
    assert_eq!(chain.process(&req(), ok).status, 200);

    let reloads: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let reloads_clone = Arc::clone(&reloads);
    let watcher = watch_config(&path, ctx.clone(), move |config| {
        reloads_clone.lock().unwrap().push(config.fallbacks.len());
    })
    .expect("watch_config");

    // allow watcher thread to start
    std::thread::sleep(Duration::from_millis(100));

    std::fs::write(&path, CONFIG_V2).unwrap();

    for _ in 0..40 {
        if reloads.lock().unwrap().contains(&1) {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    assert!(reloads.lock().unwrap().contains(&1));

    let resp = chain.process(&req(), ok);
    assert_eq!(resp.status, 503);
    assert!(resp.body.contains("reloaded"));

    drop(watcher);
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_bad_reload_keeps_rules() {
    let path = temp_files::create_temp_yaml(CONFIG_V2);
    let (ctx, _clock) = manual_context();
    ctx.apply(&load_config(&path).unwrap()).unwrap();

    let watcher = watch_config(&path, ctx.clone(), |_| {}).expect("watch_config");
    std::thread::sleep(Duration::from_millis(100));

    std::fs::write(&path, "flow_rules:\n  - resource: users\n    count: -1\n").unwrap();
    std::thread::sleep(Duration::from_millis(300));

    assert_eq!(ctx.rules.flow_rules().len(), 1);
    assert_eq!(ctx.rules.flow_rules()[0].count, 0.0);
    let resp = ctx
        .filter_chain()
        .process(&GatewayRequest::new(Method::GET, "/users", "users"), ok);
    assert_eq!(resp.status, 503);

    drop(watcher);
    std::fs::remove_file(&path).unwrap();
}
