//! Target narrowing helpers shared by target sources.

use hog_types::{ChaosError, Instance};
use rand::Rng;

/// Number of instances to affect for a percentage. 0 means all, and at
/// least one instance is always affected.
pub fn affected_count(total: usize, percentage: u8) -> usize {
    if total == 0 {
        return 0;
    }
    if percentage == 0 || percentage >= 100 {
        return total;
    }
    (total * percentage as usize / 100).max(1)
}

/// Randomly keep `percentage` of `instances`, preserving enumeration order.
pub fn pick_affected<R: Rng + ?Sized>(
    instances: Vec<Instance>,
    percentage: u8,
    rng: &mut R,
) -> Vec<Instance> {
    let count = affected_count(instances.len(), percentage);
    if count == instances.len() {
        return instances;
    }

    let mut keep = rand::seq::index::sample(rng, instances.len(), count).into_vec();
    keep.sort_unstable();
    let mut slots: Vec<Option<Instance>> = instances.into_iter().map(Some).collect();
    keep.into_iter().filter_map(|i| slots[i].take()).collect()
}

/// Pick instances by explicit name, in the order the names were given.
pub fn pick_by_names(instances: &[Instance], names: &[String]) -> Result<Vec<Instance>, ChaosError> {
    names
        .iter()
        .map(|name| {
            instances
                .iter()
                .find(|i| &i.name == name)
                .cloned()
                .ok_or_else(|| ChaosError::TargetSelection {
                    reason: format!("target {} not found", name),
                })
        })
        .collect()
}
