use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Initialize structured logging on stderr.
///
/// `RUST_LOG` wins when set; otherwise verbosity picks the default filter.
pub fn init_logging(verbose: bool, silent: bool) {
    let default_filter = if silent {
        "error"
    } else if verbose {
        "info,submission_export=debug"
    } else {
        "warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();

    tracing::debug!("logging initialized");
}
