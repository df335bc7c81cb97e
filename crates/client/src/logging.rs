//! Log output for the command-line front end.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "oneview_client=info";

/// Install a stderr subscriber. `RUST_LOG` overrides the default filter;
/// `verbose` raises the default to debug.
pub fn init(verbose: bool) {
    let default = if verbose {
        "oneview_client=debug"
    } else {
        DEFAULT_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
