use clap::Arg;
use serde::Serialize;
use std::io::Write;
use tracing::Level;

pub mod reduce;
pub mod stability;

pub(crate) fn verbose_arg() -> Arg {
    Arg::new("VERBOSE")
        .long("verbose")
        .short('v')
        .help("Increase the verbosity")
        .action(clap::ArgAction::Count)
}

/// Installs the stderr log subscriber. Any `-v` on the command line takes
/// precedence over the configured level.
pub(crate) fn init_logging(verbose: u8, configured: Level) {
    let level = match verbose {
        0 => configured,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // keep an already installed subscriber
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
