use equipment_visualizer::app;
use equipment_visualizer::config::AppConfig;

/// Main entry point for the backend server
///
/// Reads the `EQUIPMENT_*` environment variables and serves the API until
/// the process is stopped. Log verbosity follows `RUST_LOG` (default `info`).
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    log::info!(
        "starting server with data dir {} (keeping {} datasets)",
        config.data_dir.display(),
        config.retention_limit
    );

    app::run(config).await?;
    Ok(())
}
