//! Logging setup

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "TFHELM_LOG";

/// Initializes `tracing` on stderr, keeping stdout for command output
///
/// `--debug` forces the `debug` level; otherwise `TFHELM_LOG` is used, falling
/// back to `warn`.
pub fn initialize_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
