//! Structured logging setup, gated behind the `monitoring` feature —
//! mirrors the teacher package family's `tracing`/`tracing-subscriber`
//! convention. Callers who don't enable `monitoring` still get `tracing`
//! events; they simply have no subscriber installed by this crate.

#[cfg(feature = "monitoring")]
pub fn init() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(not(feature = "monitoring"))]
pub fn init() {}
