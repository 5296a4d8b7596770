//! Income-change classification and decile aggregation.

use h3492_core::{
    error::AnalysisError,
    metrics::{
        all_row, average_benefit_by_decile, baseline_relative_change, decile_outcomes,
        income_change, ChangeFormula, DistributionalImpact, OutcomeCategory, OutcomeShares,
    },
    runner::HouseholdArrays,
};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

const EPS: f64 = 1e-12;

/// (baseline, reform, weight, people, decile)
fn arrays(rows: &[(f64, f64, f64, f64, u8)]) -> HouseholdArrays {
    HouseholdArrays {
        baseline_net_income:    rows.iter().map(|r| r.0).collect(),
        reform_net_income:      rows.iter().map(|r| r.1).collect(),
        household_weight:       rows.iter().map(|r| r.2).collect(),
        household_count_people: rows.iter().map(|r| r.3).collect(),
        income_decile:          rows.iter().map(|r| r.4).collect(),
    }
}

#[test]
fn capped_formula_counts_the_change_twice_above_one() {
    // abs = 6, capped_baseline = 100, capped_reform = 106 + 6 = 112
    let change = income_change(100.0, 106.0);
    assert!((change - 0.12).abs() < EPS, "got {change}");
    assert_eq!(OutcomeCategory::classify(change), OutcomeCategory::GainMoreThan5Pct);

    // The simplified form gives half of that.
    assert!((baseline_relative_change(100.0, 106.0) - 0.06).abs() < EPS);
}

#[test]
fn negative_income_without_change_is_no_change() {
    // abs = 0, capped_baseline = 1, capped_reform = 1
    let change = income_change(-50.0, -50.0);
    assert_eq!(change, 0.0);
    assert_eq!(OutcomeCategory::classify(change), OutcomeCategory::NoChange);
}

#[test]
fn negative_baseline_is_capped_at_one() {
    // abs = 60, capped_baseline = 1, capped_reform = max(10, 1) + 60 = 70
    let change = income_change(-50.0, 10.0);
    assert!((change - 69.0).abs() < 1e-9, "got {change}");
}

#[test]
fn small_loss_depends_on_formula() {
    // Relative change is -0.0006: inside the no-change band.
    let relative = baseline_relative_change(1000.0, 999.4);
    assert!((relative + 0.0006).abs() < 1e-9, "got {relative}");
    assert_eq!(OutcomeCategory::classify(relative), OutcomeCategory::NoChange);

    // The capped formula doubles it to -0.0012: a small loss.
    let capped = income_change(1000.0, 999.4);
    assert!((capped + 0.0012).abs() < 1e-9, "got {capped}");
    assert_eq!(OutcomeCategory::classify(capped), OutcomeCategory::LoseLessThan5Pct);

    assert_eq!(ChangeFormula::default(), ChangeFormula::CappedReform);
    assert_eq!(ChangeFormula::BaselineRelative.apply(1000.0, 999.4), relative);
}

#[test]
fn boundaries_fall_into_the_lower_band() {
    use OutcomeCategory::*;
    assert_eq!(OutcomeCategory::classify(0.05), GainLessThan5Pct);
    assert_eq!(OutcomeCategory::classify(0.050_000_1), GainMoreThan5Pct);
    assert_eq!(OutcomeCategory::classify(0.001), NoChange);
    assert_eq!(OutcomeCategory::classify(0.001_000_1), GainLessThan5Pct);
    assert_eq!(OutcomeCategory::classify(-0.001), LoseLessThan5Pct);
    assert_eq!(OutcomeCategory::classify(-0.000_999_9), NoChange);
    assert_eq!(OutcomeCategory::classify(-0.05), LoseMoreThan5Pct);
    assert_eq!(OutcomeCategory::classify(-0.049_999_9), LoseLessThan5Pct);
}

#[test]
fn categories_partition_the_real_line() {
    let mut rng = Pcg64Mcg::seed_from_u64(7);
    let mut values = vec![
        0.0, 0.05, -0.05, 0.001, -0.001, f64::MIN, f64::MAX, f64::INFINITY, f64::NEG_INFINITY,
        f64::EPSILON, -f64::EPSILON,
    ];
    values.extend((0..10_000).map(|_| rng.gen_range(-0.2..0.2)));

    for x in values {
        let conditions = [
            x > 0.05,
            x > 0.001 && x <= 0.05,
            x > -0.001 && x <= 0.001,
            x > -0.05 && x <= -0.001,
            x <= -0.05,
        ];
        let matching: Vec<usize> = (0..5).filter(|i| conditions[*i]).collect();
        assert_eq!(matching.len(), 1, "{x} matched {matching:?}");
        assert_eq!(OutcomeCategory::classify(x).index(), matching[0], "{x}");
    }
}

#[test]
fn decile_shares_are_person_weighted() {
    let data = arrays(&[
        // decile 1: 2 * 3 = 6 people gain >5%, 1 * 4 = 4 people no change
        (1000.0, 2000.0, 2.0, 3.0, 1),
        (1000.0, 1000.0, 1.0, 4.0, 1),
        // decile 2: one household losing more than 5%
        (1000.0, 500.0, 5.0, 1.0, 2),
    ]);
    let table = decile_outcomes(&data, ChangeFormula::CappedReform).unwrap();

    let d1 = &table.deciles[0];
    assert!((d1.get(OutcomeCategory::GainMoreThan5Pct).unwrap() - 0.6).abs() < EPS);
    assert!((d1.get(OutcomeCategory::NoChange).unwrap() - 0.4).abs() < EPS);
    assert_eq!(d1.get(OutcomeCategory::LoseMoreThan5Pct), Some(0.0));

    let d2 = &table.deciles[1];
    assert_eq!(d2.get(OutcomeCategory::LoseMoreThan5Pct), Some(1.0));

    // No households at all in deciles 3..=10.
    assert!(table.deciles[2..].iter().all(OutcomeShares::is_missing));
}

#[test]
fn shares_within_a_decile_sum_to_one() {
    let mut rng = Pcg64Mcg::seed_from_u64(42);
    let rows: Vec<(f64, f64, f64, f64, u8)> = (0..500)
        .map(|_| {
            let baseline = rng.gen_range(-5_000.0..150_000.0);
            let reform = baseline + rng.gen_range(-3_000.0..3_000.0);
            (
                baseline,
                reform,
                rng.gen_range(0.0..500.0),
                rng.gen_range(1..7) as f64,
                rng.gen_range(1..=10),
            )
        })
        .collect();
    let table = decile_outcomes(&arrays(&rows), ChangeFormula::CappedReform).unwrap();

    for (i, shares) in table.deciles.iter().enumerate() {
        let total: f64 = OutcomeCategory::ALL
            .iter()
            .map(|c| shares.get(*c).expect("decile populated"))
            .sum();
        assert!((total - 1.0).abs() < 1e-9, "decile {} sums to {total}", i + 1);
    }
}

#[test]
fn all_row_is_unweighted_mean_of_deciles() {
    let deciles: Vec<OutcomeShares> = (1..=10)
        .map(|d| {
            let gain = d as f64 / 10.0; // 0.1, 0.2, ..., 1.0
            OutcomeShares::from_values([Some(gain), Some(0.0), Some(1.0 - gain), Some(0.0), Some(0.0)])
        })
        .collect();

    let all = all_row(&deciles);
    // (0.1 + 0.2 + ... + 1.0) / 10 = 5.5 / 10
    assert!((all.get(OutcomeCategory::GainMoreThan5Pct).unwrap() - 0.55).abs() < EPS);
    assert!((all.get(OutcomeCategory::NoChange).unwrap() - 0.45).abs() < EPS);
    assert_eq!(all.get(OutcomeCategory::LoseMoreThan5Pct), Some(0.0));
}

#[test]
fn all_row_ignores_population_size() {
    let data = arrays(&[
        // decile 1: a million people, all gaining
        (1000.0, 2000.0, 1_000_000.0, 1.0, 1),
        // decile 2: one person, no change
        (1000.0, 1000.0, 1.0, 1.0, 2),
    ]);
    let table = decile_outcomes(&data, ChangeFormula::CappedReform).unwrap();

    // Mean of the two present deciles, not 1_000_000 / 1_000_001.
    assert_eq!(table.all.get(OutcomeCategory::GainMoreThan5Pct), Some(0.5));
    assert_eq!(table.all.get(OutcomeCategory::NoChange), Some(0.5));
}

#[test]
fn average_benefit_is_household_weighted() {
    let data = arrays(&[
        (1000.0, 1100.0, 1.0, 9.0, 1),
        (1000.0, 1300.0, 3.0, 1.0, 1),
        (5000.0, 4950.0, 2.0, 2.0, 10),
    ]);
    let avg = average_benefit_by_decile(&data).unwrap();

    assert_eq!(avg.len(), 10);
    // (100 * 1 + 300 * 3) / 4; person counts play no part
    assert_eq!(avg[0], Some(250.0));
    assert_eq!(avg[9], Some(-50.0));
    assert!(avg[1..9].iter().all(Option::is_none));
}

#[test]
fn average_benefit_is_order_independent() {
    let mut rng = Pcg64Mcg::seed_from_u64(2026);
    let rows: Vec<(f64, f64, f64, f64, u8)> = (0..1_000)
        .map(|_| {
            let baseline = rng.gen_range(0.0..200_000.0);
            (
                baseline,
                baseline + rng.gen_range(0.0..1_500.0),
                rng.gen_range(0.0..1_000.0),
                rng.gen_range(1..6) as f64,
                rng.gen_range(1..=10),
            )
        })
        .collect();
    let mut shuffled = rows.clone();
    shuffled.shuffle(&mut rng);

    let original = average_benefit_by_decile(&arrays(&rows)).unwrap();
    let permuted = average_benefit_by_decile(&arrays(&shuffled)).unwrap();

    for (d, (a, b)) in original.iter().zip(&permuted).enumerate() {
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!((a - b).abs() <= 1e-9 * a.abs().max(1.0), "decile {}: {a} vs {b}", d + 1);
    }
}

#[test]
fn zero_weight_decile_is_missing() {
    let data = arrays(&[
        (1000.0, 2000.0, 0.0, 3.0, 4),
        (1000.0, 1000.0, 0.0, 2.0, 4),
        (1000.0, 1000.0, 1.0, 2.0, 5),
    ]);
    let table = decile_outcomes(&data, ChangeFormula::CappedReform).unwrap();
    let avg = average_benefit_by_decile(&data).unwrap();

    assert!(table.deciles[3].is_missing());
    assert_eq!(avg[3], None);
    assert_eq!(avg[4], Some(0.0));
    assert_eq!(table.deciles[4].get(OutcomeCategory::NoChange), Some(1.0));
}

#[test]
fn zero_people_decile_is_missing_for_shares_only() {
    // Weight present but nobody lives there: shares undefined, benefit defined.
    let data = arrays(&[(1000.0, 1200.0, 4.0, 0.0, 6)]);
    let table = decile_outcomes(&data, ChangeFormula::CappedReform).unwrap();
    let avg = average_benefit_by_decile(&data).unwrap();

    assert!(table.deciles[5].is_missing());
    assert_eq!(avg[5], Some(200.0));
}

#[test]
fn impact_summary_counts_changes() {
    let data = arrays(&[
        (1000.0, 2000.0, 1.0, 1.0, 1),
        (1000.0, 1000.0, 1.0, 1.0, 2),
        (1000.0, 1010.0, 1.0, 1.0, 3),
    ]);
    let impact = DistributionalImpact::compute(&data, ChangeFormula::CappedReform).unwrap();

    assert_eq!(impact.summary.households, 3);
    assert_eq!(impact.summary.households_changed, 2);
    assert_eq!(impact.summary.households_gain_over_5, 1);
    // (2000 + 1000 - 1000) / 1000
    assert_eq!(impact.summary.max_income_change, Some(2.0));

    let table = impact.to_string();
    assert!(table.starts_with("Decile"));
    assert!(table.contains("n/a"), "empty deciles print as n/a:\n{table}");
    assert!(table.lines().last().unwrap().starts_with("All"));
}

#[test]
fn unvalidated_arrays_are_rejected_not_indexed() {
    let decile_zero = arrays(&[(1000.0, 1100.0, 1.0, 1.0, 0)]);
    let decile_eleven = arrays(&[(1000.0, 1100.0, 1.0, 1.0, 11)]);
    let mut ragged = arrays(&[(1000.0, 1100.0, 1.0, 1.0, 1), (2000.0, 2000.0, 1.0, 1.0, 2)]);
    ragged.household_weight.pop();

    for data in [&decile_zero, &decile_eleven, &ragged] {
        assert!(matches!(
            decile_outcomes(data, ChangeFormula::CappedReform),
            Err(AnalysisError::InvalidData(_))
        ));
        assert!(matches!(average_benefit_by_decile(data), Err(AnalysisError::InvalidData(_))));
        assert!(matches!(
            DistributionalImpact::compute(data, ChangeFormula::CappedReform),
            Err(AnalysisError::InvalidData(_))
        ));
    }
}
