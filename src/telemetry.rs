// src/telemetry.rs
use tracing::Level;

/// Install a formatted tracing subscriber at `level`.
///
/// Returns `false` when a global subscriber was already installed, which leaves it in place.
pub fn init_tracing(level: Level) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .is_ok()
}
