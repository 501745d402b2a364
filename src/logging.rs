use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when RUST_LOG is unset.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "warn,judge_tally=debug"
    } else {
        "warn,judge_tally=info"
    }
}

/// Initialize logging to stderr so stdout stays clean for tables and TSV.
/// RUST_LOG overrides the verbosity chosen on the command line.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    // A second init (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
