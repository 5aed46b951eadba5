use tracing::{subscriber::set_global_default, Subscriber};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt::TestWriter, layer::SubscriberExt, EnvFilter};

/// Bunyan-formatted JSON log lines on stdout, filtered by `env_filter_str`
/// (overridable via `RUST_LOG`), the way the teacher wires
/// `get_subscriber`. No OpenTelemetry export: this backend has a single
/// worker process and a handful of job kinds, so plain structured logs
/// carry enough context without a trace collector.
pub fn get_subscriber(env_filter_str: &str) -> impl Subscriber + Send + Sync {
    let formatting_layer = BunyanFormattingLayer::new("ghn-api".into(), TestWriter::new);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter_str));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Installs `subscriber` as the global default and bridges the `log` facade
/// (used by `sqlx`, `reqwest`, ...) into `tracing` via `LogTracer`.
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync, log_level_filter: log::LevelFilter) {
    LogTracer::init_with_filter(log_level_filter).expect("Failed to set logger");
    set_global_default(subscriber).expect("Failed to set subscriber");
}
