//! Structured logging for the Strata terrain engine.
//!
//! Console output with uptime timestamps and thread names (worker threads are
//! named `terrain-worker-N`), plus an optional JSON file layer for profiling
//! generation runs after the fact. Filtering follows `RUST_LOG` when set and
//! the configured level otherwise.

use std::path::Path;

use strata_config::WorldConfig;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor a config level is available.
pub const DEFAULT_FILTER: &str = "info";

/// File name of the JSON log written into `log_dir`.
pub const LOG_FILE: &str = "strata.log";

/// Resolve the filter directive from an optional config.
pub fn filter_directive(config: Option<&WorldConfig>) -> String {
    match config {
        Some(config) if !config.log.level.is_empty() => config.log.level.clone(),
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Initialize the global tracing subscriber.
///
/// # Arguments
///
/// * `log_dir` - Directory for the JSON log file
/// * `json_file` - Whether to also write JSON lines to `log_dir/strata.log`
/// * `config` - Optional configuration supplying the log level
///
/// # Examples
///
/// ```no_run
/// use strata_log::init_logging;
/// use strata_config::WorldConfig;
///
/// let config = WorldConfig::default();
/// init_logging(None, false, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, json_file: bool, config: Option<&WorldConfig>) {
    let filter_str = filter_directive(config);

    // RUST_LOG wins over the configured level.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if json_file
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// Create an `EnvFilter` with the default filter string.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}
