//! DiskBroom — disk scanner with a crash-consistent journaled trash.
//!
//! Thin binary entry point. All logic lives in the `diskbroom-core` crate;
//! this binary parses arguments and formats output.

mod cli;

fn main() -> anyhow::Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    cli::run()
}
