use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Installs the stderr log subscriber.
///
/// Reads `COVENANT_LOG` for per-module levels (e.g. `covenant::services::reconcile=debug`),
/// falling back to `covenant=info`. Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("COVENANT_LOG")
            .unwrap_or_else(|_| EnvFilter::new("covenant=info"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter)
            .init();
    });
}
