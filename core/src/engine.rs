//! The microsimulation engine boundary.
//!
//! RULE: Nothing in this crate evaluates tax or benefit rules.
//! Every number about a household comes through SimulationEngine::compute.
//! Implementations: BridgeEngine (external process), ReplayEngine (recorded
//! outputs), Recorder (wraps another engine and keeps what it returned).

use crate::{error::AnalysisResult, reform::Reform, types::Year};
use serde::Serialize;
use serde_json::Value;

/// Variable names requested from the engine.
pub mod variables {
    pub const HOUSEHOLD_NET_INCOME: &str = "household_net_income";
    pub const HOUSEHOLD_WEIGHT: &str = "household_weight";
    pub const HOUSEHOLD_COUNT_PEOPLE: &str = "household_count_people";
    pub const HOUSEHOLD_INCOME_DECILE: &str = "household_income_decile";
    pub const STATE_FIPS: &str = "state_fips";
}

/// What the engine simulates: a survey dataset, or one constructed household.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    Dataset { uri: String },
    Household { situation: Value },
}

impl DataSource {
    /// Stable text key for this source. Used to index recordings.
    pub fn key(&self) -> String {
        match self {
            Self::Dataset { uri } => format!("dataset:{uri}"),
            // serde_json maps are sorted, so this is canonical.
            Self::Household { situation } => format!("household:{situation}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scenario<'a> {
    Baseline,
    Reform(&'a Reform),
}

impl<'a> Scenario<'a> {
    pub fn reform(&self) -> Option<&'a Reform> {
        match self {
            Self::Baseline => None,
            Self::Reform(r) => Some(r),
        }
    }

    /// "baseline" or the reform's name.
    pub fn key(&self) -> &'a str {
        match self {
            Self::Baseline => "baseline",
            Self::Reform(r) => r.name(),
        }
    }
}

/// The narrow contract every engine fulfils.
pub trait SimulationEngine {
    /// Compute one variable for every household in `source`.
    ///
    /// Returns one value per household, in the engine's household order.
    /// That order is the same for every call on the same source.
    /// A source or variable the engine cannot resolve is an error.
    fn compute(
        &mut self,
        source: &DataSource,
        variable: &str,
        period: Year,
        scenario: Scenario<'_>,
    ) -> AnalysisResult<Vec<f64>>;
}

impl<E: SimulationEngine + ?Sized> SimulationEngine for &mut E {
    fn compute(
        &mut self,
        source: &DataSource,
        variable: &str,
        period: Year,
        scenario: Scenario<'_>,
    ) -> AnalysisResult<Vec<f64>> {
        (**self).compute(source, variable, period, scenario)
    }
}

impl<E: SimulationEngine + ?Sized> SimulationEngine for Box<E> {
    fn compute(
        &mut self,
        source: &DataSource,
        variable: &str,
        period: Year,
        scenario: Scenario<'_>,
    ) -> AnalysisResult<Vec<f64>> {
        (**self).compute(source, variable, period, scenario)
    }
}
