//! Simulation runner: turns engine calls into index-aligned household arrays.
//!
//! Population run (per reform):
//!   baseline: household_net_income, household_weight,
//!             household_count_people, household_income_decile, state_fips
//!   reform:   household_net_income
//!
//! Any engine error aborts the run. Nothing is retried.

use crate::{
    dataset::ResolvedDataset,
    engine::{variables, DataSource, Scenario, SimulationEngine},
    error::{AnalysisError, AnalysisResult},
    household::{HouseholdTemplate, SweepRange},
    reform::Reform,
    types::{Year, DECILE_COUNT},
};
use serde::Serialize;

/// Columnar per-household data. Index i is the same household in every vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HouseholdArrays {
    pub baseline_net_income:    Vec<f64>,
    pub reform_net_income:      Vec<f64>,
    pub household_weight:       Vec<f64>,
    pub household_count_people: Vec<f64>,
    /// 1..=10
    pub income_decile:          Vec<u8>,
}

impl HouseholdArrays {
    pub fn len(&self) -> usize {
        self.household_weight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check alignment and value domains.
    pub fn validate(&self) -> AnalysisResult<()> {
        let n = self.len();
        let lengths = [
            ("baseline_net_income", self.baseline_net_income.len()),
            ("reform_net_income", self.reform_net_income.len()),
            ("household_count_people", self.household_count_people.len()),
            ("income_decile", self.income_decile.len()),
        ];
        if let Some((name, len)) = lengths.iter().find(|(_, len)| *len != n) {
            return Err(AnalysisError::InvalidData(format!(
                "{name} has {len} entries, household_weight has {n}"
            )));
        }
        if let Some(i) = self.household_weight.iter().position(|w| !w.is_finite() || *w < 0.0) {
            return Err(AnalysisError::InvalidData(format!(
                "household {i} has weight {}",
                self.household_weight[i]
            )));
        }
        if let Some(i) = self.household_count_people.iter().position(|p| *p < 0.0) {
            return Err(AnalysisError::InvalidData(format!(
                "household {i} has {} people",
                self.household_count_people[i]
            )));
        }
        if let Some(i) = self
            .income_decile
            .iter()
            .position(|d| *d < 1 || *d as usize > DECILE_COUNT)
        {
            return Err(AnalysisError::InvalidData(format!(
                "household {i} has decile {}",
                self.income_decile[i]
            )));
        }
        let incomes = self.baseline_net_income.iter().chain(&self.reform_net_income);
        if incomes.chain(&self.household_count_people).any(|v| !v.is_finite()) {
            return Err(AnalysisError::InvalidData("non-finite income or person count".into()));
        }
        Ok(())
    }

    /// reform - baseline, per household.
    pub fn absolute_change(&self) -> Vec<f64> {
        self.reform_net_income
            .iter()
            .zip(&self.baseline_net_income)
            .map(|(r, b)| r - b)
            .collect()
    }

    /// Keep only the households where `keep[i]` is true.
    pub fn retain(&self, keep: &[bool]) -> Self {
        fn pick<T: Copy>(values: &[T], keep: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(keep)
                .filter(|(_, k)| **k)
                .map(|(v, _)| *v)
                .collect()
        }
        Self {
            baseline_net_income:    pick(&self.baseline_net_income, keep),
            reform_net_income:      pick(&self.reform_net_income, keep),
            household_weight:       pick(&self.household_weight, keep),
            household_count_people: pick(&self.household_count_people, keep),
            income_decile:          pick(&self.income_decile, keep),
        }
    }
}

/// Baseline and reform net income for one household across employment incomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IncomeSweep {
    pub employment_income:   Vec<f64>,
    pub baseline_net_income: Vec<f64>,
    pub reform_net_income:   Vec<f64>,
}

impl IncomeSweep {
    pub fn net_income_change(&self) -> Vec<f64> {
        self.reform_net_income
            .iter()
            .zip(&self.baseline_net_income)
            .map(|(r, b)| r - b)
            .collect()
    }
}

pub struct SimulationRunner<E: SimulationEngine> {
    engine: E,
    year:   Year,
}

impl<E: SimulationEngine> SimulationRunner<E> {
    pub fn new(engine: E, year: Year) -> Self {
        Self { engine, year }
    }

    pub fn year(&self) -> Year {
        self.year
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Baseline and reform arrays for every household in the dataset.
    /// With a state scope, households outside the state are dropped.
    pub fn run_population(
        &mut self,
        dataset: &ResolvedDataset,
        reform: &Reform,
    ) -> AnalysisResult<HouseholdArrays> {
        let source = DataSource::Dataset { uri: dataset.uri.clone() };
        let baseline = Scenario::Baseline;
        let year = self.year;

        log::info!("Running population simulation: {} ({year})", dataset.uri);

        let baseline_net_income =
            self.engine.compute(&source, variables::HOUSEHOLD_NET_INCOME, year, baseline)?;
        let household_weight =
            self.engine.compute(&source, variables::HOUSEHOLD_WEIGHT, year, baseline)?;
        let household_count_people =
            self.engine.compute(&source, variables::HOUSEHOLD_COUNT_PEOPLE, year, baseline)?;
        let raw_deciles =
            self.engine.compute(&source, variables::HOUSEHOLD_INCOME_DECILE, year, baseline)?;
        let reform_net_income = self.engine.compute(
            &source,
            variables::HOUSEHOLD_NET_INCOME,
            year,
            Scenario::Reform(reform),
        )?;

        let arrays = HouseholdArrays {
            baseline_net_income,
            reform_net_income,
            household_weight,
            household_count_people,
            income_decile: to_deciles(&raw_deciles)?,
        };
        arrays.validate()?;

        let arrays = match (&dataset.state, dataset.state_fips) {
            (Some(state), Some(fips)) => {
                let household_fips =
                    self.engine.compute(&source, variables::STATE_FIPS, year, baseline)?;
                if household_fips.len() != arrays.len() {
                    return Err(AnalysisError::InvalidData(format!(
                        "state_fips has {} entries, expected {}",
                        household_fips.len(),
                        arrays.len()
                    )));
                }
                let keep: Vec<bool> = household_fips.iter().map(|f| *f == fips as f64).collect();
                let filtered = arrays.retain(&keep);
                log::info!("  {state} households: {} of {}", filtered.len(), arrays.len());
                filtered
            }
            _ => arrays,
        };

        let changed = arrays.absolute_change().iter().filter(|c| **c != 0.0).count();
        log::info!("  households with change: {changed}");
        if arrays.is_empty() {
            log::warn!("No households left after filtering {}", dataset.uri);
        }

        Ok(arrays)
    }

    /// One engine call per income level and scenario.
    pub fn run_sweep(
        &mut self,
        template: &HouseholdTemplate,
        range: &SweepRange,
        reform: &Reform,
    ) -> AnalysisResult<IncomeSweep> {
        let points = range.points()?;
        log::info!(
            "Sweeping {} ({} points, ${}..=${} step ${})",
            template.describe(),
            points.len(),
            range.min,
            range.max,
            range.step
        );

        let mut sweep = IncomeSweep {
            employment_income:   Vec::with_capacity(points.len()),
            baseline_net_income: Vec::with_capacity(points.len()),
            reform_net_income:   Vec::with_capacity(points.len()),
        };
        for income in points {
            let source = DataSource::Household {
                situation: template.situation(income, self.year)?,
            };
            sweep.baseline_net_income.push(self.household_scalar(&source, Scenario::Baseline)?);
            sweep.reform_net_income.push(self.household_scalar(&source, Scenario::Reform(reform))?);
            sweep.employment_income.push(income);
        }
        Ok(sweep)
    }

    fn household_scalar(&mut self, source: &DataSource, scenario: Scenario<'_>) -> AnalysisResult<f64> {
        let values =
            self.engine.compute(source, variables::HOUSEHOLD_NET_INCOME, self.year, scenario)?;
        match values.as_slice() {
            [value] => Ok(*value),
            other => Err(AnalysisError::InvalidData(format!(
                "expected one household_net_income value, got {}",
                other.len()
            ))),
        }
    }
}

fn to_deciles(raw: &[f64]) -> AnalysisResult<Vec<u8>> {
    raw.iter()
        .enumerate()
        .map(|(i, d)| {
            if d.fract() == 0.0 && *d >= 1.0 && *d <= DECILE_COUNT as f64 {
                Ok(*d as u8)
            } else {
                Err(AnalysisError::InvalidData(format!("household {i} has decile {d}")))
            }
        })
        .collect()
}
