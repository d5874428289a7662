//! `tracing-subscriber` installation.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter; `RUST_LOG` is the fallback.
pub const LOG_ENV_VAR: &str = "HEALTHFLOW_LOG";

/// Returns the filter directive for a run.
///
/// `HEALTHFLOW_LOG` wins over `RUST_LOG`. Without either, the level is
/// `debug` in debug mode and `info` otherwise.
#[must_use]
pub fn filter_directive(debug_mode: bool) -> String {
    std::env::var(LOG_ENV_VAR)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_level(debug_mode).to_string())
}

fn default_level(debug_mode: bool) -> &'static str {
    if debug_mode {
        "debug"
    } else {
        "info"
    }
}

/// Installs the global fmt subscriber, writing to stderr.
///
/// Returns false if a global subscriber was already installed.
pub fn init_tracing(debug_mode: bool, json: bool) -> bool {
    let directive = filter_directive(debug_mode);
    let filter = EnvFilter::try_new(&directive)
        .unwrap_or_else(|_| EnvFilter::new(default_level(debug_mode)));

    let installed = if json {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    };

    if installed {
        tracing::debug!("Log filter: {}", directive);
    }
    installed
}
