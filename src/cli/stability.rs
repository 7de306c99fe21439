use super::{init_logging, print_json, verbose_arg};
use anyhow::{bail, Context};
use ccc_reduce::recompute_stability;
use ccc_reduce::stability::{StabilityParams, TauSet, VarianceType};
use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;
use tracing::{debug, Level};

pub struct Config {
    series: PathBuf,
    rate: f64,
    params: StabilityParams,
    verbose: u8,
}

impl TryFrom<ArgMatches> for Config {
    type Error = String;

    fn try_from(args: ArgMatches) -> Result<Self, Self::Error> {
        let series = args
            .get_one::<PathBuf>("SERIES")
            .cloned()
            .ok_or("a series file is required")?;

        let rate = *args.get_one::<f64>("RATE").ok_or("a sampling rate is required")?;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(format!("sampling rate must be positive, got {rate}"));
        }

        let params = StabilityParams {
            variance: if args.get_flag("HADAMARD") {
                VarianceType::Hadamard
            } else {
                VarianceType::Allan
            },
            overlapping: args.get_flag("OVERLAPPING"),
            taus: if args.get_flag("OCTAVE") {
                TauSet::Octave
            } else {
                TauSet::All
            },
        };

        Ok(Config {
            series,
            rate,
            params,
            verbose: *args.get_one::<u8>("VERBOSE").unwrap_or(&0),
        })
    }
}

pub fn command() -> Command {
    Command::new("stability")
        .about("Allan deviation, PSD and autocorrelation of a series")
        .arg(
            Arg::new("SERIES")
                .help("File with one value per line or a JSON array")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("RATE")
                .long("rate")
                .short('r')
                .help("Sampling rate in Hz")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(f64))
                .required(true),
        )
        .arg(
            Arg::new("HADAMARD")
                .long("hadamard")
                .help("Use the Hadamard variance")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("OVERLAPPING")
                .long("overlapping")
                .help("Use the overlapping estimator")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("OCTAVE")
                .long("octave")
                .help("Evaluate only power-of-two averaging times")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(verbose_arg())
}

pub fn run(config: Config) -> anyhow::Result<()> {
    init_logging(config.verbose, Level::INFO);

    let content = std::fs::read_to_string(&config.series)
        .with_context(|| format!("reading {}", config.series.display()))?;
    let series = parse_series(&content)?;
    debug!("read {} values from {}", series.len(), config.series.display());

    let result = recompute_stability(&series, config.rate, &config.params);
    print_json(&result)
}

/// Accepts a JSON array or one value per line. Blank lines and lines
/// starting with `#` are skipped.
fn parse_series(content: &str) -> anyhow::Result<Vec<f64>> {
    if content.trim_start().starts_with('[') {
        return serde_json::from_str(content).context("malformed JSON series");
    }

    let mut series = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.parse::<f64>() {
            Ok(v) => series.push(v),
            Err(e) => bail!("line {}: {e}: {line:?}", number + 1),
        }
    }
    Ok(series)
}
