//! Recorded engine outputs.
//!
//! A Recording is a flat list of computed series. ReplayEngine answers
//! compute() from one; Recorder wraps a live engine and collects one.
//! Together they allow a run to be repeated offline.

use crate::{
    engine::{DataSource, Scenario, SimulationEngine},
    error::{AnalysisError, AnalysisResult},
    types::Year,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedSeries {
    /// DataSource::key() of the source.
    pub source:   String,
    /// Scenario::key(): "baseline" or the reform name.
    pub scenario: String,
    pub variable: String,
    pub period:   Year,
    pub values:   Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recording {
    pub series: Vec<RecordedSeries>,
}

impl Recording {
    pub fn load(path: &Path) -> AnalysisResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Config(format!("Cannot read recording {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> AnalysisResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }
}

type SeriesKey = (String, String, String, Year);

pub struct ReplayEngine {
    series: HashMap<SeriesKey, Vec<f64>>,
}

impl ReplayEngine {
    pub fn new() -> Self {
        Self { series: HashMap::new() }
    }

    pub fn load(path: &Path) -> AnalysisResult<Self> {
        let recording = Recording::load(path)?;
        log::info!(
            "Replaying {} recorded series from {}",
            recording.series.len(),
            path.display()
        );
        Ok(Self::from_recording(recording))
    }

    /// Later entries for the same key replace earlier ones.
    pub fn from_recording(recording: Recording) -> Self {
        let mut engine = Self::new();
        for s in recording.series {
            engine
                .series
                .insert((s.source, s.scenario, s.variable, s.period), s.values);
        }
        engine
    }

    pub fn insert(
        &mut self,
        source: &DataSource,
        scenario: Scenario<'_>,
        variable: &str,
        period: Year,
        values: Vec<f64>,
    ) {
        self.series.insert(
            (source.key(), scenario.key().to_string(), variable.to_string(), period),
            values,
        );
    }
}

impl Default for ReplayEngine {
    fn default() -> Self { Self::new() }
}

impl SimulationEngine for ReplayEngine {
    fn compute(
        &mut self,
        source: &DataSource,
        variable: &str,
        period: Year,
        scenario: Scenario<'_>,
    ) -> AnalysisResult<Vec<f64>> {
        let key = (source.key(), scenario.key().to_string(), variable.to_string(), period);
        self.series.get(&key).cloned().ok_or_else(|| AnalysisError::Engine {
            variable: variable.to_string(),
            message:  format!("no recorded values for {} [{}] {period}", key.0, key.1),
        })
    }
}

/// Passes calls through to `inner` and keeps every successful result.
pub struct Recorder<E: SimulationEngine> {
    inner:     E,
    recording: Recording,
}

impl<E: SimulationEngine> Recorder<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            recording: Recording::default(),
        }
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn into_recording(self) -> Recording {
        self.recording
    }
}

impl<E: SimulationEngine> SimulationEngine for Recorder<E> {
    fn compute(
        &mut self,
        source: &DataSource,
        variable: &str,
        period: Year,
        scenario: Scenario<'_>,
    ) -> AnalysisResult<Vec<f64>> {
        let values = self.inner.compute(source, variable, period, scenario)?;
        self.recording.series.push(RecordedSeries {
            source:   source.key(),
            scenario: scenario.key().to_string(),
            variable: variable.to_string(),
            period,
            values:   values.clone(),
        });
        Ok(values)
    }
}
