//! Report pipeline: simulate, measure, render.
//!
//! ORDER:
//!   1. Resolve dataset and validate config   (fatal)
//!   2. Household income sweep                (fatal)
//!   3. Population baseline + reform          (fatal)
//!   4. Metrics                               (missing deciles stay missing)
//!   5. Three charts, each on its own         (a failure is recorded, not raised)
//!   6. manifest.json
//!
//! Steps 1-3 finish before any file is written, so a data or config error
//! leaves no partial output behind.

use crate::{
    charts::{self, Figure, AVG_BENEFIT_FILE, NET_INCOME_FILE, WINNERS_FILE},
    config::AnalysisConfig,
    dataset::ResolvedDataset,
    engine::SimulationEngine,
    error::AnalysisResult,
    metrics::DistributionalImpact,
    runner::{IncomeSweep, SimulationRunner},
    types::Year,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChartStatus {
    Written { path: PathBuf },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartOutcome {
    pub title:     String,
    pub file_name: String,
    #[serde(flatten)]
    pub status:    ChartStatus,
}

impl ChartOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self.status, ChartStatus::Written { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub generated_at: DateTime<Utc>,
    pub year:         Year,
    pub dataset:      ResolvedDataset,
    pub reform:       String,
    pub charts:       Vec<ChartOutcome>,
}

impl Manifest {
    pub fn save(&self, dir: &Path) -> AnalysisResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(MANIFEST_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

pub struct ReportRun {
    pub impact:   DistributionalImpact,
    pub sweep:    IncomeSweep,
    pub manifest: Manifest,
}

impl ReportRun {
    pub fn failed_charts(&self) -> impl Iterator<Item = &ChartOutcome> {
        self.manifest.charts.iter().filter(|c| !c.is_written())
    }
}

/// Run the whole pipeline against `engine` and write into config.output_dir.
pub fn generate<E: SimulationEngine>(config: &AnalysisConfig, engine: E) -> AnalysisResult<ReportRun> {
    config.validate()?;
    let dataset = config.dataset.resolve()?;
    let mut runner = SimulationRunner::new(engine, config.year);

    let sweep = runner.run_sweep(&config.household, &config.sweep, &config.reform)?;
    let arrays = runner.run_population(&dataset, &config.reform)?;
    let impact = DistributionalImpact::compute(&arrays, config.change_formula)?;

    let policy = config.policy_name.as_str();
    let style = &config.style;
    let charts = vec![
        emit_chart(
            config,
            NET_INCOME_FILE,
            format!("Net income change - {policy}"),
            charts::net_income_change(&sweep, &config.household, style, policy),
        ),
        emit_chart(
            config,
            WINNERS_FILE,
            format!("Winners by income decile - {policy}"),
            charts::winners_by_decile(&impact.outcomes, style, policy),
        ),
        emit_chart(
            config,
            AVG_BENEFIT_FILE,
            format!("Average benefit by income decile - {policy}"),
            charts::avg_benefit_by_decile(&impact.avg_benefit, style, policy),
        ),
    ];

    let manifest = Manifest {
        generated_at: Utc::now(),
        year: config.year,
        dataset,
        reform: config.reform.name().to_string(),
        charts,
    };
    let manifest_path = manifest.save(&config.output_dir)?;
    log::debug!("Manifest written to {}", manifest_path.display());

    Ok(ReportRun { impact, sweep, manifest })
}

fn emit_chart(
    config: &AnalysisConfig,
    file_name: &str,
    title: String,
    figure: AnalysisResult<Figure>,
) -> ChartOutcome {
    let written = figure.and_then(|figure| {
        charts::write_chart(&config.output_dir, file_name, &title, &figure, &config.style)
    });
    let status = match written {
        Ok(path) => ChartStatus::Written { path },
        Err(e) => {
            log::error!("{file_name}: {e}");
            ChartStatus::Failed { message: e.to_string() }
        }
    };
    ChartOutcome {
        title,
        file_name: file_name.to_string(),
        status,
    }
}
