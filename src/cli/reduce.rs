use super::{init_logging, print_json, verbose_arg};
use anyhow::Context;
use ccc_instrument::{CalibrationTable, EnvironmentSource, Measurement, Readings};
use ccc_reduce::{Config as FileConfig, Session};
use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub struct Config {
    measurement: PathBuf,
    config: Option<PathBuf>,
    calibrations: Option<PathBuf>,
    environment: Option<PathBuf>,
    remove_outliers: bool,
    ignored_first: Option<usize>,
    ignored_last: Option<usize>,
    r1_stp: Option<f64>,
    r2_stp: Option<f64>,
    verbose: u8,
}

impl TryFrom<ArgMatches> for Config {
    type Error = String;

    fn try_from(args: ArgMatches) -> Result<Self, Self::Error> {
        let measurement = args
            .get_one::<PathBuf>("MEASUREMENT")
            .cloned()
            .ok_or("a measurement file is required")?;

        for name in ["R1_STP", "R2_STP"] {
            if let Some(v) = args.get_one::<f64>(name) {
                if !v.is_finite() {
                    return Err(format!("{} must be finite", name.to_lowercase()));
                }
            }
        }

        Ok(Config {
            measurement,
            config: args.get_one::<PathBuf>("CONFIG").cloned(),
            calibrations: args.get_one::<PathBuf>("CALIBRATIONS").cloned(),
            environment: args.get_one::<PathBuf>("ENVIRONMENT").cloned(),
            remove_outliers: args.get_flag("REMOVE_OUTLIERS"),
            ignored_first: args.get_one::<usize>("IGNORED_FIRST").copied(),
            ignored_last: args.get_one::<usize>("IGNORED_LAST").copied(),
            r1_stp: args.get_one::<f64>("R1_STP").copied(),
            r2_stp: args.get_one::<f64>("R2_STP").copied(),
            verbose: *args.get_one::<u8>("VERBOSE").unwrap_or(&0),
        })
    }
}

pub fn command() -> Command {
    Command::new("reduce")
        .about("Reduce a measurement to BVD, ratio and resistance series")
        .arg(
            Arg::new("MEASUREMENT")
                .help("Measurement document (JSON)")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("CONFIG")
                .long("config")
                .short('c')
                .help("TOML file with reduction defaults")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("CALIBRATIONS")
                .long("calibrations")
                .help("JSON calibration table used for resistors without a calibration")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("ENVIRONMENT")
                .long("environment")
                .help("JSON temperature and pressure readings, averaged over the acquisition")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("REMOVE_OUTLIERS")
                .long("remove-outliers")
                .help("Drop BVD records more than three standard deviations from the mean")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("IGNORED_FIRST")
                .long("ignored-first")
                .help("Settling samples dropped at the start of each half cycle")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("IGNORED_LAST")
                .long("ignored-last")
                .help("Samples dropped at the end of each half cycle")
                .action(clap::ArgAction::Set)
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("R1_STP")
                .long("r1-stp")
                .help("R1 deviation at standard conditions in ppm, replacing the predicted drift")
                .action(clap::ArgAction::Set)
                .allow_negative_numbers(true)
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("R2_STP")
                .long("r2-stp")
                .help("R2 deviation at standard conditions in ppm, replacing the predicted drift")
                .action(clap::ArgAction::Set)
                .allow_negative_numbers(true)
                .value_parser(value_parser!(f64)),
        )
        .arg(verbose_arg())
}

pub fn run(config: Config) -> anyhow::Result<()> {
    let file = match &config.config {
        Some(path) => FileConfig::load(path).map_err(anyhow::Error::msg)?,
        None => FileConfig::default(),
    };

    init_logging(config.verbose, file.log().level());

    debug!("loading measurement: {}", config.measurement.display());
    let mut measurement = Measurement::load(&config.measurement)
        .with_context(|| format!("loading {}", config.measurement.display()))?;

    if let Some(path) = &config.calibrations {
        let table = CalibrationTable::load(path)
            .with_context(|| format!("loading calibrations {}", path.display()))?;
        info!("loaded calibrations for {} resistors", table.len());
        let at = measurement.acquisition.midpoint();
        measurement.instrument.resolve_calibrations(&table, at);
    }

    if let Some(path) = &config.environment {
        let readings = Readings::load(path)
            .with_context(|| format!("loading environment {}", path.display()))?;
        let acquisition = &measurement.acquisition;
        match readings.average(acquisition.start, acquisition.end) {
            Some(environment) => measurement.instrument.environment = Some(environment),
            None => warn!("no environment readings inside the acquisition window"),
        }
    }

    let mut params = file.params();
    if config.remove_outliers {
        params.remove_outliers = true;
    }
    if config.ignored_first.is_some() {
        params.ignored_first = config.ignored_first;
    }
    if config.ignored_last.is_some() {
        params.ignored_last = config.ignored_last;
    }
    if config.r1_stp.is_some() {
        params.stp_override.r1 = config.r1_stp;
    }
    if config.r2_stp.is_some() {
        params.stp_override.r2 = config.r2_stp;
    }

    let mut session = Session::new(measurement.acquisition, measurement.instrument, params);
    let reduction = session.run()?;

    print_json(reduction)
}
