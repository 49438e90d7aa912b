//! Tracing setup for the agent binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing. `TALLY_SYNC_LOG` overrides the default filter, which
/// keeps the HTTP stack quiet below warn.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("TALLY_SYNC_LOG")
                .unwrap_or_else(|_| "info,hyper=warn,reqwest=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
