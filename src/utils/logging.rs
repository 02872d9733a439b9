//! Tracing subscriber initialization

/// Initialize the tracing subscriber from `RUST_LOG`, defaulting to
/// `media_fetcher_pro=info`. Repeated initialization is ignored.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "media_fetcher_pro=info".into());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
