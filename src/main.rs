use clap::Command;

mod cli;

fn main() {
    // parse command line options
    let matches = Command::new(env!("CARGO_BIN_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_about(
            "Reduces cryogenic current comparator bridge measurements to calibrated \
            resistance ratios and characterizes their stability.",
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(cli::reduce::command())
        .subcommand(cli::stability::command())
        .get_matches();

    let result = match matches.subcommand() {
        Some(("reduce", args)) => cli::reduce::Config::try_from(args.clone())
            .map_err(anyhow::Error::msg)
            .and_then(cli::reduce::run),
        Some(("stability", args)) => cli::stability::Config::try_from(args.clone())
            .map_err(anyhow::Error::msg)
            .and_then(cli::stability::run),
        _ => unreachable!("a subcommand is required"),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
