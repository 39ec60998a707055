//! Shared per-run target status map.
//!
//! Written by the orchestration path and the abort path at the same time in
//! parallel mode, so the map is a `DashMap` and the transition log sits
//! behind its own lock.

use dashmap::DashMap;
use hog_types::TargetStatus;
use std::sync::Mutex;

/// Tracks `injected` / `reverted` marks for every target of a run.
#[derive(Debug, Default)]
pub struct TargetStatusMap {
    current: DashMap<String, TargetStatus>,
    /// Every mark in the order it was made.
    log: Mutex<Vec<(String, TargetStatus)>>,
}

impl TargetStatusMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a status for a target.
    pub fn mark(&self, name: &str, status: TargetStatus) {
        tracing::debug!(target_name = name, status = %status, "target status updated");
        self.current.insert(name.to_string(), status);
        if let Ok(mut log) = self.log.lock() {
            log.push((name.to_string(), status));
        }
    }

    /// Current status of a target.
    pub fn status(&self, name: &str) -> Option<TargetStatus> {
        self.current.get(name).map(|entry| *entry.value())
    }

    /// Targets currently marked injected and not yet reverted.
    pub fn still_injected(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .current
            .iter()
            .filter(|entry| *entry.value() == TargetStatus::Injected)
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Every mark made so far, in order.
    pub fn transitions(&self) -> Vec<(String, TargetStatus)> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Number of targets with any mark.
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Returns true if no target has been marked.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}
