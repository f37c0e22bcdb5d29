#![forbid(unsafe_code)]

//! Structured logging.
//!
//! Every crate in the workspace logs through `tracing` with a dotted
//! `message` name (`panel.mount`, `overlay.open`, ...). This module only
//! holds the optional subscriber setup for hosts that want JSON output.

/// Install a JSON subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns `false` if a global subscriber was already installed.
#[cfg(feature = "tracing-json")]
pub fn init_json_logging() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
