//! Tracing setup for the `voras` binary
//!
//! `RUST_LOG` selects the level; the default is `info`. Logs go to stderr so
//! command output on stdout stays clean.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{filter::EnvFilter, fmt, Layer};

/// Install the global subscriber
///
/// `json` selects flattened JSON events instead of human-readable lines.
///
/// # Errors
/// A global subscriber is already installed
pub fn init(json: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let layer = if json {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .flatten_event(true)
            .boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).with_target(false).boxed()
    };

    tracing_subscriber::registry().with(filter).with(layer).try_init()
}
