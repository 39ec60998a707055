//! Error types for the Docker backend.

use hog_core::ExecError;
use hog_types::ChaosError;
use thiserror::Error;

/// Errors from the Docker backend.
#[derive(Debug, Error)]
pub enum DockerError {
    /// Docker API error.
    #[error("docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    /// Container does not exist.
    #[error("container {0} not found")]
    NotFound(String),

    /// Container exists but is not running.
    #[error("container {0} is not running")]
    NotRunning(String),

    /// Label selector could not be parsed.
    #[error("invalid label selector: {0}")]
    InvalidSelector(String),
}

impl DockerError {
    /// Map a bollard error, turning 404 responses into [`DockerError::NotFound`].
    pub(crate) fn from_api(err: bollard::errors::Error, container: &str) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            } => DockerError::NotFound(container.to_string()),
            other => DockerError::Docker(other),
        }
    }
}

impl From<DockerError> for ExecError {
    fn from(err: DockerError) -> Self {
        match err {
            DockerError::NotFound(name) => ExecError::TargetNotFound(name),
            other => ExecError::Backend(other.to_string()),
        }
    }
}

impl From<DockerError> for ChaosError {
    fn from(err: DockerError) -> Self {
        ChaosError::TargetSelection {
            reason: err.to_string(),
        }
    }
}
