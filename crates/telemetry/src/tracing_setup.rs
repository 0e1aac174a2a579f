//! Structured logging initialization.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initializes the global subscriber.
///
/// `RUST_LOG` wins over `filter` when set. JSON output carries source
/// locations and thread ids for log shippers; the plain formatter stays
/// terse for local runs.
pub fn init_tracing(filter: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_span_events(FmtSpan::NONE)
                    .with_target(true),
            )
            .init();
    }

    tracing::info!(filter = %filter, json = json, "Tracing initialized");
}

/// Initializes tracing from `RUST_LOG` and `CAPTURE_LOG_JSON`.
pub fn init_tracing_from_env() {
    let json = std::env::var("CAPTURE_LOG_JSON")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    init_tracing(&filter, json);
}
