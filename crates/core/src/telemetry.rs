use tracing_subscriber::{EnvFilter, fmt};

/// Directive used when `RUST_LOG` is unset. Transport crates are kept quiet so
/// per-event mapper logs stay readable.
const DEFAULT_DIRECTIVE: &str = "info,alloy_transport_http=warn,hyper_util=warn,reqwest=warn";

/// Initialise the global tracing subscriber.
///
/// Respects `RUST_LOG`; falls back to [`DEFAULT_DIRECTIVE`]. Safe to call more
/// than once (later calls are ignored), which keeps tests that log happy.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
