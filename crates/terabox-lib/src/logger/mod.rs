use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the tracing subscriber with timestamp, level, and target fields.
/// If `debug` is true, sets the log level to DEBUG; otherwise INFO. `RUST_LOG`
/// overrides both.
///
/// Diagnostics go to stderr so they never interleave with the classified
/// stdout lines written by [`crate::output::Formatter`].
pub fn init(debug: bool) {
    let fallback = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_timer(fmt::time::SystemTime)
        .with_level(true)
        .with_target(true)
        .init();
}
