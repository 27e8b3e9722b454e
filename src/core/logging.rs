//! Logging initialization
//!
//! Call sites use the `log` facade; records are forwarded into a
//! `tracing-subscriber` fmt subscriber so they pick up the active request span.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber.
///
/// # Arguments
/// * `default_level` - Filter used when `RUST_LOG` is not set (e.g. `"info"`)
///
/// # Returns
/// * `Ok(())` - Subscriber installed
/// * `Err(anyhow::Error)` - A global subscriber or logger was already set
pub fn init_logger(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Startup banner with the values that matter when reading logs later.
pub fn log_startup_banner(bind_addr: &str, temp_dir: &std::path::Path) {
    let profile = crate::download::command::PerformanceProfile::DEFAULT;
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Null Downloader listening on http://{}", bind_addr);
    log::info!("  scratch dir : {}", temp_dir.display());
    log::info!("  connections : {}x parallel", profile.connections);
    log::info!("  fragments   : {}x concurrent", profile.fragments);
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
