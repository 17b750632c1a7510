#![allow(dead_code)]

pub mod temp_files {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// Write `content` to a uniquely named yaml file in the temp dir.
    pub fn create_temp_yaml(content: &str) -> PathBuf {
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::SeqCst);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "sentinel_gw_test_{}_{}_{}.yaml",
            std::process::id(),
            counter,
            nanos
        ));
        std::fs::write(&path, content).unwrap();
        path
    }
}

pub mod gateway {
    use std::sync::Arc;

    use sentinel_gateway::flow::{Clock, ManualClock};
    use sentinel_gateway::gateway::GatewayResponse;
    use sentinel_gateway::runtime_config::RuntimeConfig;
    use sentinel_gateway::GatewayContext;

    pub const T0: u64 = 1_700_000_000_000;

    /// Context on a manual clock, plus the clock.
    pub fn manual_context() -> (GatewayContext, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        let ctx = GatewayContext::with_clock(
            &RuntimeConfig::default(),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        (ctx, clock)
    }

    pub fn ok(_req: &sentinel_gateway::gateway::GatewayRequest) -> Result<GatewayResponse, String> {
        Ok(GatewayResponse::new(200, Default::default(), "ok"))
    }

    pub fn body_json(resp: &GatewayResponse) -> serde_json::Value {
        serde_json::from_str(&resp.body).unwrap()
    }
}
