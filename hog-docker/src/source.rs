//! Target discovery from the Docker daemon.

use crate::error::DockerError;
use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, ListContainersOptions};
use bollard::Docker;
use hog_core::select::pick_affected;
use hog_core::TargetSource;
use hog_types::{ChaosError, Instance, TargetSelector};
use std::collections::HashMap;

const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project";
const COMPOSE_SERVICE_LABEL: &str = "com.docker.compose.service";
const DEFAULT_NAMESPACE: &str = "default";

/// Resolves targets among the containers of the local daemon.
///
/// Explicit names are inspected one by one and must be running. A label
/// selector lists running containers carrying every label, then narrows the
/// list to the affected percentage.
#[derive(Debug, Clone)]
pub struct DockerTargetSource {
    docker: Docker,
}

impl DockerTargetSource {
    /// Create a source over an existing client.
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Connect to the local daemon.
    pub fn connect() -> Result<Self, DockerError> {
        Ok(Self::new(crate::connect()?))
    }

    async fn by_name(&self, name: &str) -> Result<Instance, DockerError> {
        let info = self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
            .map_err(|e| DockerError::from_api(e, name))?;

        let running = info
            .state
            .as_ref()
            .and_then(|s| s.running)
            .unwrap_or(false);
        if !running {
            return Err(DockerError::NotRunning(name.to_string()));
        }

        let container_name = info.name.as_deref().unwrap_or(name);
        let labels = info.config.and_then(|c| c.labels).unwrap_or_default();
        Ok(instance_from_container(container_name, &labels))
    }

    async fn by_labels(&self, selector: &str) -> Result<Vec<Instance>, DockerError> {
        let mut filters = HashMap::new();
        filters.insert("label".to_string(), parse_label_selector(selector)?);
        filters.insert("status".to_string(), vec!["running".to_string()]);

        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions {
                all: false,
                filters,
                ..Default::default()
            }))
            .await?;

        let mut instances: Vec<Instance> = containers
            .into_iter()
            .filter_map(|summary| {
                let name = summary.names.as_ref()?.first()?.clone();
                let labels = summary.labels.unwrap_or_default();
                Some(instance_from_container(&name, &labels))
            })
            .collect();
        instances.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(instances)
    }
}

#[async_trait]
impl TargetSource for DockerTargetSource {
    async fn instances(&self, selector: &TargetSelector) -> Result<Vec<Instance>, ChaosError> {
        if !selector.names.is_empty() {
            let mut instances = Vec::with_capacity(selector.names.len());
            for name in &selector.names {
                instances.push(self.by_name(name).await?);
            }
            return Ok(instances);
        }

        let labels = selector.labels.as_deref().unwrap_or_default();
        let matched = self.by_labels(labels).await?;
        tracing::info!(
            selector = labels,
            matched = matched.len(),
            "listed containers for label selector"
        );
        let mut rng = rand::thread_rng();
        Ok(pick_affected(matched, selector.affected_percentage, &mut rng))
    }
}

/// Split `key=value[,key=value]` into Docker label filters.
pub fn parse_label_selector(selector: &str) -> Result<Vec<String>, DockerError> {
    let labels: Vec<String> = selector
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|label| match label.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok(format!("{}={}", key.trim(), value.trim()))
            }
            Some(_) => Err(DockerError::InvalidSelector(selector.to_string())),
            None => Ok(label.to_string()),
        })
        .collect::<Result<_, _>>()?;

    if labels.is_empty() {
        return Err(DockerError::InvalidSelector(selector.to_string()));
    }
    Ok(labels)
}

fn instance_from_container(name: &str, labels: &HashMap<String, String>) -> Instance {
    let name = name.trim_start_matches('/');
    let namespace = labels
        .get(COMPOSE_PROJECT_LABEL)
        .map(String::as_str)
        .unwrap_or(DEFAULT_NAMESPACE);
    let container = labels
        .get(COMPOSE_SERVICE_LABEL)
        .map(String::as_str)
        .unwrap_or(name);
    Instance::new(namespace, name, &[container])
}
