use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the tracing subscriber for the CLI.
///
/// `RUST_LOG` wins when set; otherwise -v/-vv select debug/trace. Log lines
/// go to stderr so `dump`/`records` output stays pipeable.
pub fn init(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
