//! Tracing setup for embedders of the banner cache.
//!
//! `RUST_LOG` takes precedence over `logging.level`. The level can be changed at
//! runtime through [`set_log_level`] once [`init_tracing`] has run.
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

use crate::config::LoggingConfig;

static LOG_RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Installs the global subscriber. Later calls, or calls after another
/// subscriber was installed, are no-ops.
pub fn init_tracing(config: &LoggingConfig) {
    init_tracing_with_level(&config.level);
}

pub fn init_tracing_with_level(level: &str) {
    let base_filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    if LOG_RELOAD_HANDLE.get().is_some() {
        return;
    }

    let (reload_layer, handle) = reload::Layer::new(base_filter);
    let installed = tracing_subscriber::registry()
        .with(reload_layer)
        .with(fmt::layer().with_target(true))
        .try_init();

    // Keep the handle only if our registry became the global subscriber
    if installed.is_ok() {
        let _ = LOG_RELOAD_HANDLE.set(handle);
    }
}

/// Replaces the active filter, e.g. `"debug"` or `"banner_cache=trace,info"`.
pub fn set_log_level(level: &str) -> Result<(), String> {
    let filter = EnvFilter::try_new(level).map_err(|e| format!("invalid log filter: {e}"))?;
    let handle = LOG_RELOAD_HANDLE
        .get()
        .ok_or_else(|| "tracing is not initialized".to_string())?;
    handle
        .modify(|f| *f = filter)
        .map_err(|e| format!("failed to reload log filter: {e}"))
}
