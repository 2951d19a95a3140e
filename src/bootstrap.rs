//! Process setup shared by the binaries.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logs to stderr at `info` unless `RUST_LOG` says otherwise.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Unwraps parsed arguments. A clap error ends the process through
/// `clap::Error::exit`: help and version go to stdout with status 0, usage
/// errors to stderr with status 2. Validation errors are returned.
pub fn args_or_exit<T>(parsed: anyhow::Result<T>) -> anyhow::Result<T> {
    parsed.map_err(|err| match err.downcast_ref::<clap::Error>() {
        Some(usage) => usage.exit(),
        None => err,
    })
}
