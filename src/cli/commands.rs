use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use http::Method;
use serde::Serialize;

use crate::block::{BlockError, BlockType, FallbackCause};
use crate::config::{load_config, GatewayConfig};
use crate::context::GatewayContext;
use crate::flow::{Clock, ManualClock};
use crate::gateway::{GatewayRequest, GatewayResponse, HeaderVec};
use crate::runtime_config::RuntimeConfig;

/// Command-line interface for sentinel-gateway
#[derive(Parser)]
#[command(name = "sentinel-gateway")]
#[command(about = "Gateway flow control and fallback tooling", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a gateway config file
    Check {
        #[arg(short, long, env = "SENTINEL_GATEWAY_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Show the fallback response for a route
    Resolve {
        #[arg(short, long, env = "SENTINEL_GATEWAY_CONFIG")]
        config: Option<PathBuf>,

        /// Route id to resolve
        #[arg(short, long)]
        route: String,

        /// flow, degrade, system, authority, param_flow or error
        #[arg(long, default_value = "flow")]
        cause: String,
    },
    /// Run synthetic requests through the filter chain
    Simulate {
        #[arg(short, long, env = "SENTINEL_GATEWAY_CONFIG")]
        config: Option<PathBuf>,

        #[arg(short, long)]
        route: String,

        /// Request path, matched against API definitions
        #[arg(short, long, default_value = "/")]
        path: String,

        #[arg(short = 'n', long, default_value_t = 20)]
        requests: u32,

        /// Simulated time between requests
        #[arg(long, default_value_t = 0)]
        spacing_ms: u64,

        /// Origin sent in the origin header
        #[arg(long)]
        origin: Option<String>,

        /// Make every Nth upstream call fail (0 = never)
        #[arg(long, default_value_t = 0)]
        fail_every: u32,

        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// Outcome of a `simulate` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    pub requests: u32,
    pub passed: u32,
    pub blocked: u32,
    pub failed: u32,
    /// Responses per status code
    pub statuses: BTreeMap<u16, u32>,
}

fn config_path(flag: &Option<PathBuf>, runtime: &RuntimeConfig) -> Option<PathBuf> {
    flag.clone().or_else(|| runtime.config_path.clone())
}

fn read_config(path: Option<&Path>) -> Result<GatewayConfig> {
    match path {
        Some(p) => load_config(p),
        None => Ok(GatewayConfig::default()),
    }
}

fn parse_cause(cause: &str, route: &str) -> Result<FallbackCause> {
    if cause.eq_ignore_ascii_case("error") {
        return Ok(FallbackCause::Other("upstream error".to_string()));
    }
    match BlockType::parse(cause) {
        Some(block_type) => Ok(FallbackCause::Block(BlockError::new(block_type, route))),
        None => bail!("unknown cause '{cause}'"),
    }
}

/// Parse arguments and run.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_command(&cli.command, &RuntimeConfig::from_env()).map(|_| ())
}

/// Run one command. `simulate` also returns its report.
pub fn run_command(
    command: &Commands,
    runtime: &RuntimeConfig,
) -> Result<Option<SimulationReport>> {
    match command {
        Commands::Check { config } => {
            let Some(path) = config_path(config, runtime) else {
                bail!("no config file given (use --config or SENTINEL_GATEWAY_CONFIG)");
            };
            let cfg = load_config(&path)?;
            cfg.validate()
                .with_context(|| format!("{} is not a valid gateway config", path.display()))?;
            println!("✅ {} is valid", path.display());
            println!("   fallbacks:       {}", cfg.fallbacks.len());
            println!("   api definitions: {}", cfg.api_definitions.len());
            println!("   flow rules:      {}", cfg.flow_rules.len());
            println!("   degrade rules:   {}", cfg.degrade_rules.len());
            println!("   authority rules: {}", cfg.authority_rules.len());
            Ok(None)
        }
        Commands::Resolve {
            config,
            route,
            cause,
        } => {
            let cfg = read_config(config_path(config, runtime).as_deref())?;
            let ctx = GatewayContext::new(runtime);
            ctx.apply(&cfg)?;
            let cause = parse_cause(cause, route)?;
            let provider = ctx.fallbacks.get_fallback_provider(route);
            let resp = provider.fallback_response(route, &cause);
            println!("provider: {}", provider.route());
            println!("{resp}");
            Ok(None)
        }
        Commands::Simulate {
            config,
            route,
            path,
            requests,
            spacing_ms,
            origin,
            fail_every,
            json,
        } => {
            let cfg = read_config(config_path(config, runtime).as_deref())?;
            let report = simulate(
                &cfg,
                runtime,
                &SimulationParams {
                    route,
                    path,
                    requests: *requests,
                    spacing_ms: *spacing_ms,
                    origin: origin.as_deref(),
                    fail_every: *fail_every,
                },
            )?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} requests: {} passed, {} blocked, {} failed upstream",
                    report.requests, report.passed, report.blocked, report.failed
                );
                for (status, count) in &report.statuses {
                    println!("   {status}: {count}");
                }
            }
            Ok(Some(report))
        }
    }
}

struct SimulationParams<'a> {
    route: &'a str,
    path: &'a str,
    requests: u32,
    spacing_ms: u64,
    origin: Option<&'a str>,
    fail_every: u32,
}

fn simulate(
    cfg: &GatewayConfig,
    runtime: &RuntimeConfig,
    params: &SimulationParams<'_>,
) -> Result<SimulationReport> {
    let clock = Arc::new(ManualClock::new(1_000_000));
    let ctx = GatewayContext::with_clock(runtime, Arc::clone(&clock) as Arc<dyn Clock>);
    ctx.apply(cfg)?;
    let chain = ctx.filter_chain();

    let mut report = SimulationReport {
        requests: params.requests,
        ..SimulationReport::default()
    };
    for i in 1..=params.requests {
        let mut req = GatewayRequest::new(Method::GET, params.path, params.route);
        if let Some(origin) = params.origin {
            req = req.with_header(&runtime.origin_header, origin);
        }
        let mut reached_upstream = false;
        let mut upstream_failed = false;
        let resp = chain.process(&req, |_| {
            reached_upstream = true;
            if params.fail_every > 0 && i % params.fail_every == 0 {
                upstream_failed = true;
                Err("simulated upstream failure".to_string())
            } else {
                Ok(GatewayResponse::new(200, HeaderVec::new(), "ok"))
            }
        });
        if !reached_upstream {
            report.blocked += 1;
        } else if upstream_failed {
            report.failed += 1;
        } else {
            report.passed += 1;
        }
        *report.statuses.entry(resp.status).or_insert(0) += 1;
        clock.advance(params.spacing_ms);
    }
    Ok(report)
}
