//! Tracing initialization for the roster binaries.

use tracing_subscriber::EnvFilter;

use crate::error::{ErrorKind, RosterResult};
use crate::roster_error;

/// Initializes the global tracing subscriber.
///
/// The filter is taken from `RUST_LOG` when set and defaults to `info`
/// otherwise. Fails if a global subscriber was already installed.
pub fn init_tracing() -> RosterResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| {
            roster_error!(
                ErrorKind::ConfigError,
                "Failed to install the tracing subscriber",
                err
            )
        })
}
