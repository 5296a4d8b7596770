//! chart-runner: generates the SC H.3492 distributional charts.
//!
//! Usage:
//!   chart-runner
//!   chart-runner --config analysis.json --output-dir out/charts
//!   chart-runner --state SC --year 2026 --reform sc_h3492_eitc_refundable
//!   chart-runner --national
//!   chart-runner --engine "python -m policyengine_bridge" --record run.json
//!   chart-runner --replay run.json

use anyhow::{bail, Result};
use h3492_core::{
    bridge::BridgeEngine,
    config::AnalysisConfig,
    dataset::DatasetScope,
    reform::Reform,
    replay::{Recorder, ReplayEngine},
    report::{self, ChartStatus, ReportRun},
};
use std::env;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = match arg_value(&args, "--config") {
        Some(path) => AnalysisConfig::load(Path::new(path))?,
        None => AnalysisConfig::default(),
    };
    apply_overrides(&mut config, &args)?;
    config.validate()?;

    let dataset = config.dataset.resolve()?;
    println!("{}", "=".repeat(60));
    println!("Generating charts for {}", config.policy_name);
    println!("  year:       {}", config.year);
    println!("  dataset:    {}", dataset.uri);
    println!("  reform:     {}", config.reform.name());
    println!("  household:  {}", config.household.describe());
    println!("  output:     {}", config.output_dir.display());
    println!("{}", "=".repeat(60));
    println!();

    let run = match (&config.engine.replay, &config.engine.record) {
        (Some(replay), _) => report::generate(&config, ReplayEngine::load(replay)?)?,
        (None, Some(record)) => {
            let mut recorder = Recorder::new(BridgeEngine::spawn(&config.engine.command)?);
            let run = report::generate(&config, &mut recorder)?;
            recorder.recording().save(record)?;
            log::info!(
                "Recorded {} engine series to {}",
                recorder.recording().series.len(),
                record.display()
            );
            run
        }
        (None, None) => report::generate(&config, BridgeEngine::spawn(&config.engine.command)?)?,
    };

    print_summary(&run);

    let failed = run.failed_charts().count();
    if failed > 0 {
        bail!("{failed} chart(s) failed to render");
    }
    Ok(())
}

fn apply_overrides(config: &mut AnalysisConfig, args: &[String]) -> Result<()> {
    if let Some(dir) = arg_value(args, "--output-dir") {
        config.output_dir = PathBuf::from(dir);
    }
    config.year = parse_arg(args, "--year", config.year);
    if let Some(code) = arg_value(args, "--state") {
        config.dataset.scope = DatasetScope::State { code: code.to_ascii_uppercase() };
        config.household.state = code.to_ascii_uppercase();
    }
    if args.iter().any(|a| a == "--national") {
        config.dataset.scope = DatasetScope::National;
    }
    if let Some(name) = arg_value(args, "--reform") {
        config.reform = Reform::preset(name)?;
    }
    if let Some(command) = arg_value(args, "--engine") {
        config.engine.command = command.split_whitespace().map(String::from).collect();
    }
    if let Some(path) = arg_value(args, "--replay") {
        config.engine.replay = Some(PathBuf::from(path));
    }
    if let Some(path) = arg_value(args, "--record") {
        config.engine.record = Some(PathBuf::from(path));
    }
    Ok(())
}

fn print_summary(run: &ReportRun) {
    let summary = &run.impact.summary;
    println!();
    println!("=== DECILE IMPACTS ===");
    println!("  households:          {}", summary.households);
    println!("  households changed:  {}", summary.households_changed);
    println!("  sweep points:        {}", run.sweep.employment_income.len());
    println!();
    print!("{}", run.impact);

    println!();
    println!("=== CHARTS ===");
    for chart in &run.manifest.charts {
        match &chart.status {
            ChartStatus::Written { path } => println!("  ok      {}", path.display()),
            ChartStatus::Failed { message } => println!("  FAILED  {}: {message}", chart.file_name),
        }
    }
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
