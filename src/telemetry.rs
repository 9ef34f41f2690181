use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info";

/// JSON logs on stderr, filtered by `RUST_LOG` (default `info`).
///
/// Logs go to stderr so the report can be piped from stdout.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();
}
