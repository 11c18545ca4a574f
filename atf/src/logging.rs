use tracing_subscriber::{fmt, EnvFilter};

/// Installs a formatted subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"atf=debug"`).
///
/// Returns `false` when a global subscriber was already set, which is the
/// normal case when several tests initialise logging.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .is_ok()
}
