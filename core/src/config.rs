use crate::{
    dataset::{DatasetConfig, DatasetScope},
    error::{AnalysisError, AnalysisResult},
    household::{HouseholdTemplate, SweepRange},
    metrics::ChangeFormula,
    reform::Reform,
    style::ChartStyle,
    types::Year,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_YEAR: Year = 2026;
pub const DEFAULT_POLICY_NAME: &str = "SC H.3492 partially refundable EITC";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Program and arguments of the engine bridge process.
    pub command: Vec<String>,
    /// Answer engine calls from this recording instead of the bridge.
    pub replay:  Option<PathBuf>,
    /// Save every bridge reply to this recording.
    pub record:  Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: vec!["policyengine-bridge".into()],
            replay:  None,
            record:  None,
        }
    }
}

/// Everything one report run needs. Every field has a default, so an empty
/// JSON object is a valid config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub year:           Year,
    pub dataset:        DatasetConfig,
    pub reform:         Reform,
    pub household:      HouseholdTemplate,
    pub sweep:          SweepRange,
    pub change_formula: ChangeFormula,
    pub output_dir:     PathBuf,
    pub policy_name:    String,
    pub engine:         EngineConfig,
    /// Fixed house style; not read from config files.
    #[serde(skip)]
    pub style:          ChartStyle,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            year:           DEFAULT_YEAR,
            dataset:        DatasetConfig::default(),
            reform:         Reform::default(),
            household:      HouseholdTemplate::default(),
            sweep:          SweepRange::default(),
            change_formula: ChangeFormula::default(),
            output_dir:     PathBuf::from("output/charts"),
            policy_name:    DEFAULT_POLICY_NAME.into(),
            engine:         EngineConfig::default(),
            style:          ChartStyle::policyengine(),
        }
    }
}

impl AnalysisConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> AnalysisResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AnalysisError::Config(format!("Cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| AnalysisError::Config(format!("Cannot parse {}: {e}", path.display())))?;
        Ok(config)
    }

    /// Small sweep, one child, fixed output dir. For tests.
    pub fn default_test() -> Self {
        Self {
            sweep: SweepRange { min: 0, max: 40_000, step: 10_000 },
            output_dir: PathBuf::from("target/test-charts"),
            ..Self::default()
        }
    }

    /// Check everything that can be checked before the engine is called.
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.year < 1900 {
            return Err(AnalysisError::Config(format!("implausible tax year {}", self.year)));
        }
        self.dataset.resolve()?;
        self.reform.validate()?;
        self.sweep.validate()?;
        // Fails on a state without a FIPS code.
        self.household.situation(0.0, self.year)?;
        if let DatasetScope::State { code } = &self.dataset.scope {
            if !code.eq_ignore_ascii_case(&self.household.state) {
                log::warn!(
                    "Dataset state {code} differs from household state {}",
                    self.household.state
                );
            }
        }
        if self.engine.replay.is_none() && self.engine.command.is_empty() {
            return Err(AnalysisError::Config("engine command is empty".into()));
        }
        Ok(())
    }
}
