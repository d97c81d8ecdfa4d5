use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the orchestration core.
///
/// Load-time problems (missing scenario, malformed JSON, bad region
/// configuration) surface here and are never retried by the core itself,
/// with the exception of transient I/O during scenario loading.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("Scenario file not found: {}", path.display())]
    ScenarioNotFound { path: PathBuf },

    #[error("Failed to read scenario file {}: {source}", path.display())]
    ScenarioIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed scenario file {}: {source}", path.display())]
    ScenarioParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown region '{region}' referenced by '{referenced_by}'")]
    UnknownRegion {
        region: String,
        referenced_by: String,
    },

    #[error("Duplicate region configuration: {0}")]
    DuplicateRegion(String),

    #[error("Invalid parameter {name}={value}: {reason}")]
    InvalidParameter {
        name: String,
        value: f64,
        reason: &'static str,
    },

    #[error("Orchestration cycle timed out after {elapsed_ms}ms")]
    CycleTimeout { elapsed_ms: u64 },

    #[error("Forecast task failed: {0}")]
    TaskFailed(String),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl GridError {
    pub(crate) fn invalid(name: impl Into<String>, value: f64, reason: &'static str) -> Self {
        GridError::InvalidParameter {
            name: name.into(),
            value,
            reason,
        }
    }

    /// Whether a failed scenario load is worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            GridError::ScenarioIo { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

impl From<figment::Error> for GridError {
    fn from(err: figment::Error) -> Self {
        GridError::Config(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, GridError>;

/// Reject negative or non-finite values.
pub(crate) fn ensure_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(GridError::invalid(name, value, "must be finite"));
    }
    if value < 0.0 {
        return Err(GridError::invalid(name, value, "must be >= 0"));
    }
    Ok(())
}

/// Reject values outside the closed unit interval.
pub(crate) fn ensure_fraction(name: &str, value: f64) -> Result<()> {
    ensure_non_negative(name, value)?;
    if value > 1.0 {
        return Err(GridError::invalid(name, value, "must be within [0, 1]"));
    }
    Ok(())
}
