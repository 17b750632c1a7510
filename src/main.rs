use sentinel_gateway::{cli, logging};

fn main() -> anyhow::Result<()> {
    let _log_guard = logging::init_logging_with_config(&logging::LogConfig::from_env())?;
    cli::run_cli()
}
