//! Reform definitions handed to the engine.
//!
//! The engine owns every tax rule. A reform here is either the name of a
//! reform the engine ships with, or a set of parameter overrides.

use crate::error::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SC_H3492_REFUNDABLE: &str = "sc_h3492_eitc_refundable";
pub const SC_NO_EITC: &str = "sc_no_eitc";
pub const SC_CURRENT_LAW_EITC: &str = "sc_current_law_eitc";

const SC_EITC_RATE: &str = "gov.states.sc.tax.income.credits.eitc.rate";
const FROM_2026: &str = "2026-01-01.2100-12-31";

/// parameter path -> "start.end" period -> value
pub type ParameterOverrides = BTreeMap<String, BTreeMap<String, f64>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reform {
    /// A reform the engine already knows, referenced by name.
    Builtin { name: String },
    Parameters {
        name:      String,
        overrides: ParameterOverrides,
    },
}

impl Reform {
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin { name } | Self::Parameters { name, .. } => name,
        }
    }

    /// H.3492: 25% of the excess SC EITC becomes refundable.
    pub fn sc_h3492_refundable() -> Self {
        Self::Builtin { name: SC_H3492_REFUNDABLE.into() }
    }

    /// SC EITC match rate set to zero.
    pub fn sc_no_eitc() -> Self {
        Self::sc_eitc_rate(SC_NO_EITC, 0.0)
    }

    /// Current law written out explicitly: 125% match, nonrefundable.
    pub fn sc_current_law_eitc() -> Self {
        Self::sc_eitc_rate(SC_CURRENT_LAW_EITC, 1.25)
    }

    pub fn preset(name: &str) -> AnalysisResult<Self> {
        match name {
            SC_H3492_REFUNDABLE => Ok(Self::sc_h3492_refundable()),
            SC_NO_EITC          => Ok(Self::sc_no_eitc()),
            SC_CURRENT_LAW_EITC => Ok(Self::sc_current_law_eitc()),
            other => Err(AnalysisError::Config(format!("unknown reform preset '{other}'"))),
        }
    }

    fn sc_eitc_rate(name: &str, rate: f64) -> Self {
        let mut periods = BTreeMap::new();
        periods.insert(FROM_2026.to_string(), rate);
        let mut overrides = BTreeMap::new();
        overrides.insert(SC_EITC_RATE.to_string(), periods);
        Self::Parameters { name: name.into(), overrides }
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        if self.name().trim().is_empty() {
            return Err(AnalysisError::Config("reform name is empty".into()));
        }
        if let Self::Parameters { overrides, .. } = self {
            for (parameter, periods) in overrides {
                if periods.is_empty() {
                    return Err(AnalysisError::Config(format!(
                        "reform parameter '{parameter}' has no periods"
                    )));
                }
                if let Some((period, value)) = periods.iter().find(|(_, v)| !v.is_finite()) {
                    return Err(AnalysisError::Config(format!(
                        "reform parameter '{parameter}' has non-finite value {value} for {period}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for Reform {
    fn default() -> Self {
        Self::sc_h3492_refundable()
    }
}
