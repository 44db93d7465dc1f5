//! Logging (C13): one `tracing-subscriber` install at supervisor start.
//! `RUST_LOG` drives the filter (`info` by default), matching the
//! env-filter style the pack's own proxy services use for their own
//! stderr logging.
pub fn init() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(true)
        .init();
}
