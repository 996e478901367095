//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "DETOUR_LOG";

fn main() {
    init_logging();
    if let Err(err) = detour_cli::run() {
        eprintln!("detour: {err}");
        std::process::exit(1);
    }
}

/// Route `log` records to stderr, filtered by `DETOUR_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber installed by an embedding process takes precedence.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
