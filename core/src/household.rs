//! Household composition used for the single-household income sweep.

use crate::{
    dataset::state_fips,
    error::{AnalysisError, AnalysisResult},
    types::{StateCode, Year},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A single parent with `num_children` children.
/// The adult carries all employment income.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseholdTemplate {
    pub state:           StateCode,
    pub num_children:    u32,
    pub adult_age:       u32,
    /// Children are aged first_child_age, first_child_age + 1, ...
    pub first_child_age: u32,
}

impl Default for HouseholdTemplate {
    fn default() -> Self {
        Self {
            state:           "SC".into(),
            num_children:    1,
            adult_age:       35,
            first_child_age: 5,
        }
    }
}

impl HouseholdTemplate {
    /// "single parent, 1 child" / "single parent, 2 children"
    pub fn describe(&self) -> String {
        let noun = if self.num_children == 1 { "child" } else { "children" };
        format!("single parent, {} {noun}", self.num_children)
    }

    /// Build the engine situation for one employment income level.
    pub fn situation(&self, employment_income: f64, year: Year) -> AnalysisResult<Value> {
        let fips = state_fips(&self.state).ok_or_else(|| {
            AnalysisError::Config(format!("household state '{}' has no FIPS code", self.state))
        })?;
        let period = year.to_string();

        let mut people = Map::new();
        people.insert(
            "adult".into(),
            json!({
                "age": { &period: self.adult_age },
                "employment_income": { &period: employment_income },
            }),
        );
        let mut members = vec![Value::from("adult")];
        for i in 0..self.num_children {
            let name = format!("child_{}", i + 1);
            people.insert(
                name.clone(),
                json!({ "age": { &period: self.first_child_age + i } }),
            );
            members.push(Value::from(name));
        }

        Ok(json!({
            "people": people,
            "tax_units":     { "tax_unit":     { "members": members } },
            "spm_units":     { "spm_unit":     { "members": members } },
            "households":    { "household":    { "members": members, "state_fips": { &period: fips } } },
            "families":      { "family":       { "members": members } },
            "marital_units": { "marital_unit": { "members": ["adult"] } },
        }))
    }
}

/// Employment income range swept for the household chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepRange {
    pub min:  u64,
    pub max:  u64,
    pub step: u64,
}

impl Default for SweepRange {
    fn default() -> Self {
        Self { min: 0, max: 200_000, step: 100 }
    }
}

impl SweepRange {
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.step == 0 {
            return Err(AnalysisError::Config("sweep step must be > 0".into()));
        }
        if self.max < self.min {
            return Err(AnalysisError::Config(format!(
                "sweep max {} is below min {}",
                self.max, self.min
            )));
        }
        Ok(())
    }

    /// Number of points: (max - min) / step + 1.
    pub fn count(&self) -> usize {
        (self.max.saturating_sub(self.min) / self.step.max(1)) as usize + 1
    }

    pub fn points(&self) -> AnalysisResult<Vec<f64>> {
        self.validate()?;
        Ok((0..self.count() as u64)
            .map(|i| (self.min + i * self.step) as f64)
            .collect())
    }
}
