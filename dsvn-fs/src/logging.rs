//! Tracing subscriber setup for binaries and tests embedding the filesystem

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global fmt subscriber.
///
/// With `debug` the filter is `debug`; otherwise `RUST_LOG` is honoured with
/// `info` as the floor. Returns `false` if a subscriber was already set.
pub fn init_tracing(debug: bool) -> bool {
    let env_filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .try_init()
        .is_ok()
}
