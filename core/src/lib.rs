//! h3492-core: distributional analysis of SC H.3492 on top of an external
//! microsimulation engine.
//!
//! Data flows one way:
//!   runner (engine calls) -> metrics (decile tables) -> charts (HTML pages)
//! report.rs wires the three together for a full run.

pub mod bridge;
pub mod charts;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod household;
pub mod metrics;
pub mod reform;
pub mod replay;
pub mod report;
pub mod runner;
pub mod style;
pub mod types;
