use tracing::Level;
use tracing_subscriber::fmt;

/// Installs the stderr subscriber. Warnings always show; `verbose` adds the
/// per-engine and per-run detail.
pub fn init(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .with_level(true)
        .try_init();
}
