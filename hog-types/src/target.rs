//! Target identity and selection types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A workload instance as returned by target discovery, before a container
/// has been chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Namespace (or project) the instance lives in.
    pub namespace: String,
    /// Instance name.
    pub name: String,
    /// Container names in declaration order.
    pub containers: Vec<String>,
}

impl Instance {
    /// Create an instance description.
    pub fn new(namespace: &str, name: &str, containers: &[&str]) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            containers: containers.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// First declared container, if any.
    pub fn first_container(&self) -> Option<&str> {
        self.containers.first().map(String::as_str)
    }
}

/// One remote execution endpoint: instance plus the container to exec into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    /// Namespace (or project) the instance lives in.
    pub namespace: String,
    /// Instance name.
    pub name: String,
    /// Container the commands run in.
    pub container: String,
}

impl Target {
    /// Create a target.
    pub fn new(namespace: &str, name: &str, container: &str) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            container: container.into(),
        }
    }

    /// Bind an instance to an already resolved container name.
    pub fn from_instance(instance: &Instance, container: &str) -> Self {
        Self {
            namespace: instance.namespace.clone(),
            name: instance.name.clone(),
            container: container.to_string(),
        }
    }

    /// Full identity used in error reports.
    pub fn identity(&self) -> String {
        format!(
            "{{name: {}, namespace: {}, container: {}}}",
            self.name, self.namespace, self.container
        )
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// How targets are chosen by the discovery collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSelector {
    /// Explicit instance names. Takes precedence over `labels`.
    #[serde(default)]
    pub names: Vec<String>,
    /// Label selector, `key=value[,key=value]`.
    #[serde(default)]
    pub labels: Option<String>,
    /// Percentage of label-matched instances to affect (0 means all).
    #[serde(default)]
    pub affected_percentage: u8,
}

impl TargetSelector {
    /// Returns true if neither explicit names nor a label selector is set.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.labels.as_deref().map_or(true, |l| l.trim().is_empty())
    }
}

/// Lifecycle marks recorded for every target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    /// Stress command has been started.
    Injected,
    /// Kill command succeeded.
    Reverted,
}

impl TargetStatus {
    /// Get the status as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStatus::Injected => "injected",
            TargetStatus::Reverted => "reverted",
        }
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
