//! Process-wide JSON logging for garage services.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Directives applied when `RUST_LOG` is unset, blank or unparsable.
/// Connection-level chatter from the HTTP stack stays at `warn`.
pub const DEFAULT_DIRECTIVES: &str = "info,hyper_util=warn,reqwest=warn,rustls=warn";

fn build_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install the JSON stdout subscriber for `service` and log one startup line
/// naming it. Event fields are flattened to the top level and the innermost
/// span (the request span, for HTTP handlers) is attached.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(service: &str) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let installed = tracing_subscriber::registry()
        .with(build_filter(rust_log.as_deref()))
        .with(
            fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false),
        )
        .try_init()
        .is_ok();
    if installed {
        tracing::info!(service, version = env!("CARGO_PKG_VERSION"), "logging initialized");
    }
}
