//! Tracing initialization for the CLI
//!
//! Events go to stderr so list output on stdout stays pipeable. The filter
//! comes from `--verbose`, then `CATALOG_LOG` / the config `log` key, then
//! `RUST_LOG`, and defaults to warnings only.

use tracing_subscriber::EnvFilter;

use crate::cli::GlobalOpts;
use crate::core::Config;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(global: &GlobalOpts, config: &Config) {
    let filter = if global.verbose {
        EnvFilter::new("debug")
    } else if global.quiet {
        EnvFilter::new("error")
    } else if let Some(directive) = config.log.as_deref() {
        EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
