//! Scenario loading: disaster events and baseline energy status per region.

use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{DisasterEvent, EnergyStatus};
use crate::error::{GridError, Result};

/// On-disk scenario definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub events: Vec<DisasterEvent>,
    /// Keyed by region name, in file order
    #[serde(default)]
    pub baseline: IndexMap<String, EnergyStatus>,
}

impl ScenarioFile {
    pub fn parse(path: &Path, contents: &str) -> Result<Self> {
        serde_json::from_str(contents).map_err(|source| GridError::ScenarioParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Regions named in the baseline section.
    pub fn region_list(&self) -> Vec<String> {
        self.baseline.keys().cloned().collect()
    }

    /// Last event listed for `region`, if any.
    pub fn event_for(&self, region: &str) -> Option<&DisasterEvent> {
        self.events.iter().rev().find(|e| e.region == region)
    }
}

/// Reads `<data_root>/<scenario>.json`.
#[derive(Debug, Clone)]
pub struct RegionalDataIngestor {
    data_root: PathBuf,
    load_attempts: u32,
    retry_backoff: Duration,
}

impl RegionalDataIngestor {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            load_attempts: 3,
            retry_backoff: Duration::from_millis(100),
        }
    }

    pub fn with_retry(mut self, load_attempts: u32, retry_backoff: Duration) -> Self {
        self.load_attempts = load_attempts.max(1);
        self.retry_backoff = retry_backoff;
        self
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn scenario_path(&self, scenario: &str) -> PathBuf {
        self.data_root.join(format!("{scenario}.json"))
    }

    /// Single blocking read, no retries.
    pub fn read_scenario(&self, scenario: &str) -> Result<ScenarioFile> {
        let path = self.scenario_path(scenario);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
        ScenarioFile::parse(&path, &contents)
    }

    /// Async read that retries transient I/O failures; missing or malformed files fail immediately.
    pub async fn load_scenario(&self, scenario: &str) -> Result<ScenarioFile> {
        let path = self.scenario_path(scenario);
        let mut attempt = 1;
        loop {
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => {
                    debug!(path = %path.display(), attempt, "scenario loaded");
                    return ScenarioFile::parse(&path, &contents);
                }
                Err(e) => {
                    let err = io_error(&path, e);
                    if !err.is_transient() || attempt >= self.load_attempts {
                        return Err(err);
                    }
                    warn!(error = %err, attempt, "scenario load failed, retrying");
                    tokio::time::sleep(self.retry_backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    pub fn load_disaster_events(&self, scenario: &str) -> Result<Vec<DisasterEvent>> {
        Ok(self.read_scenario(scenario)?.events)
    }

    pub fn load_energy_baseline(&self, scenario: &str) -> Result<IndexMap<String, EnergyStatus>> {
        Ok(self.read_scenario(scenario)?.baseline)
    }

    pub fn region_list(&self, scenario: &str) -> Result<Vec<String>> {
        Ok(self.read_scenario(scenario)?.region_list())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> GridError {
    if source.kind() == std::io::ErrorKind::NotFound {
        GridError::ScenarioNotFound {
            path: path.to_path_buf(),
        }
    } else {
        GridError::ScenarioIo {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SCENARIO: &str = r#"{
        "events": [
            {"region": "Japan", "event_type": "earthquake", "severity": 0.6,
             "infrastructure_impact": 0.3, "description": "Offshore quake"},
            {"region": "EU", "event_type": "heatwave"}
        ],
        "baseline": {
            "Korea": {"demand_mw": 35000, "generation_mw": 40000, "stored_mwh": 9000},
            "Japan": {"demand_mw": 52000, "generation_mw": 48000, "stored_mwh": 8000}
        }
    }"#;

    #[test]
    fn test_reads_events_and_baseline() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("quake.json"), SCENARIO).unwrap();
        let ingestor = RegionalDataIngestor::new(dir.path());

        let events = ingestor.load_disaster_events("quake").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "earthquake");
        assert_eq!(events[1].severity, 0.0);
        assert_eq!(events[1].description, "");

        let baseline = ingestor.load_energy_baseline("quake").unwrap();
        assert_eq!(baseline["Japan"].generation_mw, 48000.0);
        assert_eq!(ingestor.region_list("quake").unwrap(), vec!["Korea", "Japan"]);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let ingestor = RegionalDataIngestor::new(dir.path());
        assert!(matches!(
            ingestor.read_scenario("absent"),
            Err(GridError::ScenarioNotFound { .. })
        ));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        let ingestor = RegionalDataIngestor::new(dir.path());
        assert!(matches!(
            ingestor.read_scenario("broken"),
            Err(GridError::ScenarioParse { .. })
        ));
    }

    #[test]
    fn test_missing_baseline_field_is_parse_error() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("partial.json"),
            r#"{"baseline": {"EU": {"demand_mw": 1, "generation_mw": 2}}}"#,
        )
        .unwrap();
        let ingestor = RegionalDataIngestor::new(dir.path());
        assert!(ingestor.load_energy_baseline("partial").is_err());
    }

    #[test]
    fn test_last_event_wins() {
        let scenario: ScenarioFile = serde_json::from_str(
            r#"{"events": [
                {"region": "EU", "event_type": "storm", "severity": 1.0},
                {"region": "EU", "event_type": "flood", "severity": 2.0}
            ]}"#,
        )
        .unwrap();
        assert_eq!(scenario.event_for("EU").unwrap().event_type, "flood");
        assert!(scenario.event_for("Japan").is_none());
        assert!(scenario.baseline.is_empty());
    }

    #[tokio::test]
    async fn test_async_load_fails_fast_when_missing() {
        let dir = tempdir().unwrap();
        let ingestor = RegionalDataIngestor::new(dir.path()).with_retry(5, Duration::from_secs(60));
        // Would take minutes if not-found were retried
        let err = ingestor.load_scenario("absent").await.unwrap_err();
        assert!(matches!(err, GridError::ScenarioNotFound { .. }));
    }

    #[tokio::test]
    async fn test_async_load_parses() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("quake.json"), SCENARIO).unwrap();
        let scenario = RegionalDataIngestor::new(dir.path())
            .load_scenario("quake")
            .await
            .unwrap();
        assert_eq!(scenario.region_list(), vec!["Korea", "Japan"]);
    }
}
