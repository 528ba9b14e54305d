//! Health monitor error types.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while building a monitor or its configuration.
#[derive(Debug, Error)]
pub enum HealthError {
    #[error("invalid config: `{field}` {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),
}

pub type HealthResult<T> = Result<T, HealthError>;

/// Why a probe cycle failed.
///
/// Delivered to error listeners only. The failed cycle itself is still
/// recorded as an unhealthy result.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("no probe installed")]
    NoProbe,

    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("probe failed: {0}")]
    Failed(#[from] anyhow::Error),
}

impl ProbeError {
    /// The error returned by the probe itself, if there was one.
    pub fn probe_error(&self) -> Option<&anyhow::Error> {
        match self {
            ProbeError::Failed(err) => Some(err),
            _ => None,
        }
    }
}
