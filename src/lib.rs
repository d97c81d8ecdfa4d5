//! Disaster-resilient cross-border energy orchestration.
//!
//! Each cycle forecasts regional demand and supply under disaster conditions,
//! allocates transfers over lossy, capacity-limited interconnections with a
//! greedy heuristic, and drops transfers whose forecasts are not trusted.

pub mod config;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod ingestion;
pub mod optimizer;
pub mod orchestrator;
pub mod simulation;
pub mod telemetry;
