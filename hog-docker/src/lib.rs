//! # memhog-docker
//!
//! Docker backend for memhog.
//!
//! - [`DockerExecutor`] runs the stress and kill commands with `docker exec`
//!   semantics through the Docker API
//! - [`DockerTargetSource`] resolves targets by container name or label
//!
//! Containers are mapped onto instances as follows: the compose project is
//! the namespace, the container name is the instance name, and the compose
//! service is the single container entry.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod executor;
mod source;

pub use error::DockerError;
pub use executor::DockerExecutor;
pub use source::{parse_label_selector, DockerTargetSource};

use bollard::Docker;

/// Connect to the local Docker daemon using the default socket or
/// `DOCKER_HOST`.
pub fn connect() -> Result<Docker, DockerError> {
    Ok(Docker::connect_with_local_defaults()?)
}
