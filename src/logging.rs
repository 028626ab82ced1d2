use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub const LOG_ENV: &str = "CALLGRAPH_LOG";
const DEFAULT_FILTER: &str = "callgraph_gen=info";

static INIT: Once = Once::new();

/// Installs the stderr subscriber. Filters come from `CALLGRAPH_LOG`
/// (e.g. `callgraph_gen=debug`), falling back to `callgraph_gen=info`.
///
/// Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .with(filter)
            .init();
    });
}
