//! # Hot Reload Module
//!
//! Re-applies the gateway config file whenever it changes on disk.
//!
//! ```rust,ignore
//! use sentinel_gateway::hot_reload::watch_config;
//!
//! let watcher = watch_config("gateway.yaml", ctx.clone(), |config| {
//!     println!("reloaded {} flow rules", config.flow_rules.len());
//! })?;
//! // keep `watcher` alive for as long as reloads are wanted
//! ```
//!
//! If the new file fails to parse or validate, the error is logged and the
//! previous rules, API definitions and fallbacks stay active.

use std::path::{Path, PathBuf};

use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{error, info};

use crate::config::{load_config, GatewayConfig};
use crate::context::GatewayContext;

/// Watch `config_path` and apply it to `ctx` on modification.
///
/// `on_reload` runs after each successful apply.
pub fn watch_config<P, F>(
    config_path: P,
    ctx: GatewayContext,
    mut on_reload: F,
) -> notify::Result<RecommendedWatcher>
where
    P: AsRef<Path>,
    F: FnMut(&GatewayConfig) + Send + 'static,
{
    let path: PathBuf = config_path.as_ref().to_path_buf();
    let watch_path = path.clone();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    match load_config(&watch_path) {
                        Ok(config) => match ctx.apply(&config) {
                            Ok(()) => {
                                info!(path = %watch_path.display(), "hot-reload: config applied");
                                on_reload(&config);
                            }
                            Err(e) => {
                                error!(path = %watch_path.display(), error = %e, "hot-reload: config rejected")
                            }
                        },
                        Err(e) => {
                            error!(path = %watch_path.display(), error = %e, "hot-reload: config unreadable")
                        }
                    }
                }
            }
            Err(e) => error!(error = ?e, "hot-reload: watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
