use tracing_subscriber::EnvFilter;

fn debug_requested() -> bool {
    std::env::var("DEBUG")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Logs go to stderr. `DEBUG=1|true` forces debug level, otherwise `RUST_LOG`
/// applies with `info` as the default.
pub fn init() {
    let filter = if debug_requested() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
