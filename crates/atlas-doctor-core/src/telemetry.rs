//! Log output for the atlas-doctor binary.
//!
//! Diagnostics go to stderr. stdout carries the check report and, in stdio
//! serve mode, belongs to the tool server's protocol stream.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, or `level` for everything when it is unset or
/// unparsable.
fn filter_for(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the global subscriber, as text or newline-delimited JSON.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_tracing(json: bool, level: Level) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter_for(level))
        .with_target(false)
        .with_writer(std::io::stderr);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.is_ok()
}
