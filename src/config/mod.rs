use crate::pipeline::ReductionParams;
use crate::stability::StabilityParams;
use serde::Deserialize;
use std::path::Path;

mod log;

pub use log::Log;

/// Reduction defaults read from a TOML file. Command line flags override
/// the values found here.
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    log: Log,
    #[serde(default)]
    reduction: ReductionParams,
    #[serde(default)]
    stability: StabilityParams,
}

impl Config {
    pub fn load(path: &dyn AsRef<Path>) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("unable to open config file: {e}"))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| format!("failed to parse config file: {e}"))?;

        config.check()?;

        Ok(config)
    }

    fn check(&self) -> Result<(), String> {
        let reduction = &self.reduction;

        if let Some(v) = reduction.delta_i2_r2 {
            if !v.is_finite() {
                return Err(format!("reduction.delta_i2_r2 must be finite, got {v}"));
            }
        }

        for (name, value) in [
            ("r1", reduction.stp_override.r1),
            ("r2", reduction.stp_override.r2),
        ] {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(format!(
                        "reduction.stp_override.{name} must be finite, got {v}"
                    ));
                }
            }
        }

        if !reduction.deleted.is_empty() {
            return Err("reduction.deleted cannot be set from a config file".into());
        }

        Ok(())
    }

    pub fn log(&self) -> &Log {
        &self.log
    }

    /// Reduction parameters with the `[stability]` table applied.
    pub fn params(&self) -> ReductionParams {
        ReductionParams {
            stability: self.stability,
            ..self.reduction.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correct::ResistorRole;
    use crate::stability::{TauSet, VarianceType};
    use std::io::Write;
    use tracing::Level;

    fn load(content: &str) -> Result<Config, String> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        Config::load(&file.path())
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = load("").unwrap();
        assert_eq!(config.log().level(), Level::INFO);
        assert_eq!(config.params(), ReductionParams::default());
    }

    #[test]
    fn full_file() {
        let config = load(
            r#"
[log]
level = "debug"

[reduction]
ignored_first = 3
ignored_last = 1
remove_outliers = true
standard = "r1"
delta_i2_r2 = 0.025

[reduction.stp_override]
r2 = 0.15

[stability]
variance = "hadamard"
overlapping = true
taus = "octave"
"#,
        )
        .unwrap();

        assert_eq!(config.log().level(), Level::DEBUG);
        let params = config.params();
        assert_eq!(params.ignored_first, Some(3));
        assert_eq!(params.ignored_last, Some(1));
        assert!(params.remove_outliers);
        assert_eq!(params.standard, ResistorRole::R1);
        assert_eq!(params.delta_i2_r2, Some(0.025));
        assert_eq!(params.stp_override.r1, None);
        assert_eq!(params.stp_override.r2, Some(0.15));
        assert_eq!(params.stability.variance, VarianceType::Hadamard);
        assert!(params.stability.overlapping);
        assert_eq!(params.stability.taus, TauSet::Octave);
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(load("[reduction]\nignored = 3\n").is_err());
        assert!(load("[log]\nlevel = \"loud\"\n").is_err());
    }

    #[test]
    fn rejects_non_finite_overrides() {
        let err = load("[reduction]\ndelta_i2_r2 = nan\n").err().unwrap();
        assert!(err.contains("delta_i2_r2"));
        assert!(load("[reduction.stp_override]\nr1 = inf\n").is_err());
    }

    #[test]
    fn missing_file() {
        let err = Config::load(&"/nonexistent/ccc-reduce.toml").err().unwrap();
        assert!(err.starts_with("unable to open config file"));
    }
}
