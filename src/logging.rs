use tracing_subscriber::EnvFilter;

/// Install the stderr `tracing` subscriber for the CLI.
///
/// `RUST_LOG` wins when set; otherwise the level is `warn`, or `debug` for this
/// crate with `verbose`.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "warn,cfgrepo=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
