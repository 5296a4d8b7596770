//! Distributional metrics over household arrays.
//!
//! Income change (capped, as used by the reference distributional tool):
//!   absolute_change = reform - baseline
//!   capped_baseline = max(baseline, 1)
//!   capped_reform   = max(reform, 1) + absolute_change
//!   income_change   = (capped_reform - capped_baseline) / capped_baseline
//!
//! Outcome shares are person-weighted (household_weight * people).
//! Average benefit is household-weighted.
//! A decile with zero total weight yields None, never 0 or NaN.

use crate::{
    error::AnalysisResult,
    runner::HouseholdArrays,
    types::DECILE_COUNT,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Threshold of the "no change" band, as a fraction.
pub const NO_CHANGE_BAND: f64 = 0.001;
/// Threshold between small and large changes, as a fraction.
pub const LARGE_CHANGE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeFormula {
    /// The capped formula above.
    #[default]
    CappedReform,
    /// absolute_change / max(baseline, 1). Gives the same categories as the
    /// published SC H.3492 charts; select with "baseline_relative".
    BaselineRelative,
}

/// Relative income change with the capped formula. Not equivalent to
/// absolute_change / capped_baseline: the change enters the numerator twice
/// when reform income is above 1.
pub fn income_change(baseline: f64, reform: f64) -> f64 {
    let absolute_change = reform - baseline;
    let capped_baseline = baseline.max(1.0);
    let capped_reform = reform.max(1.0) + absolute_change;
    (capped_reform - capped_baseline) / capped_baseline
}

pub fn baseline_relative_change(baseline: f64, reform: f64) -> f64 {
    (reform - baseline) / baseline.max(1.0)
}

impl ChangeFormula {
    pub fn apply(&self, baseline: f64, reform: f64) -> f64 {
        match self {
            Self::CappedReform     => income_change(baseline, reform),
            Self::BaselineRelative => baseline_relative_change(baseline, reform),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeCategory {
    GainMoreThan5Pct,
    GainLessThan5Pct,
    NoChange,
    LoseLessThan5Pct,
    LoseMoreThan5Pct,
}

impl OutcomeCategory {
    /// Display and stacking order.
    pub const ALL: [Self; 5] = [
        Self::GainMoreThan5Pct,
        Self::GainLessThan5Pct,
        Self::NoChange,
        Self::LoseLessThan5Pct,
        Self::LoseMoreThan5Pct,
    ];

    /// Thresholds are checked top-down; each band is open below, closed above.
    pub fn classify(income_change: f64) -> Self {
        if income_change > LARGE_CHANGE {
            Self::GainMoreThan5Pct
        } else if income_change > NO_CHANGE_BAND {
            Self::GainLessThan5Pct
        } else if income_change > -NO_CHANGE_BAND {
            Self::NoChange
        } else if income_change > -LARGE_CHANGE {
            Self::LoseLessThan5Pct
        } else if income_change <= -LARGE_CHANGE {
            Self::LoseMoreThan5Pct
        } else {
            // NaN
            Self::NoChange
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::GainMoreThan5Pct => 0,
            Self::GainLessThan5Pct => 1,
            Self::NoChange         => 2,
            Self::LoseLessThan5Pct => 3,
            Self::LoseMoreThan5Pct => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::GainMoreThan5Pct => "Gain more than 5%",
            Self::GainLessThan5Pct => "Gain less than 5%",
            Self::NoChange         => "No change",
            Self::LoseLessThan5Pct => "Lose less than 5%",
            Self::LoseMoreThan5Pct => "Lose more than 5%",
        }
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            Self::GainMoreThan5Pct => "Gain >5%",
            Self::GainLessThan5Pct => "Gain <5%",
            Self::NoChange         => "No change",
            Self::LoseLessThan5Pct => "Loss <5%",
            Self::LoseMoreThan5Pct => "Loss >5%",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::GainMoreThan5Pct => "gain_more_than_5pct",
            Self::GainLessThan5Pct => "gain_less_than_5pct",
            Self::NoChange         => "no_change",
            Self::LoseLessThan5Pct => "loss_less_than_5pct",
            Self::LoseMoreThan5Pct => "loss_more_than_5pct",
        }
    }
}

/// Share of people in each outcome category, as fractions in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct OutcomeShares {
    values: [Option<f64>; 5],
}

impl OutcomeShares {
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn from_values(values: [Option<f64>; 5]) -> Self {
        Self { values }
    }

    pub fn get(&self, category: OutcomeCategory) -> Option<f64> {
        self.values[category.index()]
    }

    pub fn is_missing(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}

/// Per-decile shares (index 0 = decile 1) plus the "All" row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecileTable {
    pub deciles: Vec<OutcomeShares>,
    pub all:     OutcomeShares,
}

/// Unweighted mean of the values that are present.
pub fn unweighted_mean(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// The "All" row: for each category, the unweighted mean of the per-decile
/// shares. Not population-weighted.
pub fn all_row(deciles: &[OutcomeShares]) -> OutcomeShares {
    let mut values = [None; 5];
    for category in OutcomeCategory::ALL {
        let column: Vec<Option<f64>> = deciles.iter().map(|d| d.get(category)).collect();
        values[category.index()] = unweighted_mean(&column);
    }
    OutcomeShares { values }
}

pub fn classify_households(arrays: &HouseholdArrays, formula: ChangeFormula) -> Vec<OutcomeCategory> {
    arrays
        .baseline_net_income
        .iter()
        .zip(&arrays.reform_net_income)
        .map(|(b, r)| OutcomeCategory::classify(formula.apply(*b, *r)))
        .collect()
}

/// Person-weighted outcome shares per decile. Rejects arrays that fail
/// HouseholdArrays::validate().
pub fn decile_outcomes(arrays: &HouseholdArrays, formula: ChangeFormula) -> AnalysisResult<DecileTable> {
    arrays.validate()?;
    Ok(shares_by_decile(arrays, formula))
}

/// Household-weighted mean of (reform - baseline) per decile. Rejects arrays
/// that fail HouseholdArrays::validate().
pub fn average_benefit_by_decile(arrays: &HouseholdArrays) -> AnalysisResult<Vec<Option<f64>>> {
    arrays.validate()?;
    Ok(benefit_by_decile(arrays))
}

fn shares_by_decile(arrays: &HouseholdArrays, formula: ChangeFormula) -> DecileTable {
    let categories = classify_households(arrays, formula);
    let mut decile_people = [0.0_f64; DECILE_COUNT];
    let mut category_people = [[0.0_f64; 5]; DECILE_COUNT];

    for (i, category) in categories.iter().enumerate() {
        let d = arrays.income_decile[i] as usize - 1;
        let person_weight = arrays.household_weight[i] * arrays.household_count_people[i];
        decile_people[d] += person_weight;
        category_people[d][category.index()] += person_weight;
    }

    let deciles: Vec<OutcomeShares> = (0..DECILE_COUNT)
        .map(|d| {
            if decile_people[d] > 0.0 {
                let mut values = [None; 5];
                for (c, people) in category_people[d].iter().enumerate() {
                    values[c] = Some(people / decile_people[d]);
                }
                OutcomeShares { values }
            } else {
                OutcomeShares::missing()
            }
        })
        .collect();

    let all = all_row(&deciles);
    DecileTable { deciles, all }
}

fn benefit_by_decile(arrays: &HouseholdArrays) -> Vec<Option<f64>> {
    let mut weighted_change = [0.0_f64; DECILE_COUNT];
    let mut weight = [0.0_f64; DECILE_COUNT];

    for (i, change) in arrays.absolute_change().iter().enumerate() {
        let d = arrays.income_decile[i] as usize - 1;
        weighted_change[d] += change * arrays.household_weight[i];
        weight[d] += arrays.household_weight[i];
    }

    (0..DECILE_COUNT)
        .map(|d| (weight[d] > 0.0).then(|| weighted_change[d] / weight[d]))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactSummary {
    pub households:             usize,
    pub households_changed:     usize,
    pub households_gain_over_5: usize,
    pub max_income_change:      Option<f64>,
}

/// Everything the decile charts need.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionalImpact {
    pub outcomes:     DecileTable,
    pub avg_benefit:  Vec<Option<f64>>,
    pub summary:      ImpactSummary,
}

impl DistributionalImpact {
    pub fn compute(arrays: &HouseholdArrays, formula: ChangeFormula) -> AnalysisResult<Self> {
        arrays.validate()?;
        let changes: Vec<f64> = arrays
            .baseline_net_income
            .iter()
            .zip(&arrays.reform_net_income)
            .map(|(b, r)| formula.apply(*b, *r))
            .collect();

        let summary = ImpactSummary {
            households: arrays.len(),
            households_changed: arrays.absolute_change().iter().filter(|c| **c != 0.0).count(),
            households_gain_over_5: changes
                .iter()
                .filter(|c| OutcomeCategory::classify(**c) == OutcomeCategory::GainMoreThan5Pct)
                .count(),
            max_income_change: changes.iter().copied().reduce(f64::max),
        };

        let impact = Self {
            outcomes:    shares_by_decile(arrays, formula),
            avg_benefit: benefit_by_decile(arrays),
            summary,
        };

        if let Some(max) = impact.summary.max_income_change {
            log::info!("  max income change: {:.2}%", max * 100.0);
        }
        log::info!("  households with >5% gain: {}", impact.summary.households_gain_over_5);
        log::info!(
            "  overall gain >5%: {}  decile 1 gain >5%: {}",
            format_share(impact.outcomes.all.get(OutcomeCategory::GainMoreThan5Pct)),
            format_share(
                impact
                    .outcomes
                    .deciles
                    .first()
                    .and_then(|d| d.get(OutcomeCategory::GainMoreThan5Pct))
            ),
        );
        Ok(impact)
    }
}

/// "12.3%" or "n/a".
pub fn format_share(share: Option<f64>) -> String {
    share.map_or_else(|| "n/a".to_string(), |s| format!("{:.1}%", s * 100.0))
}

/// "$123" or "n/a".
pub fn format_dollars(amount: Option<f64>) -> String {
    amount.map_or_else(|| "n/a".to_string(), |a| format!("${a:.0}"))
}

impl fmt::Display for DistributionalImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<8}", "Decile")?;
        for category in OutcomeCategory::ALL {
            write!(f, " {:>10}", category.short_label())?;
        }
        writeln!(f, " {:>12}", "Avg benefit")?;

        let rows = self
            .outcomes
            .deciles
            .iter()
            .enumerate()
            .map(|(i, shares)| ((i + 1).to_string(), shares, self.avg_benefit.get(i).copied().flatten()));
        for (label, shares, benefit) in rows {
            write!(f, "{label:<8}")?;
            for category in OutcomeCategory::ALL {
                write!(f, " {:>10}", format_share(shares.get(category)))?;
            }
            writeln!(f, " {:>12}", format_dollars(benefit))?;
        }

        write!(f, "{:<8}", "All")?;
        for category in OutcomeCategory::ALL {
            write!(f, " {:>10}", format_share(self.outcomes.all.get(category)))?;
        }
        writeln!(f)
    }
}
