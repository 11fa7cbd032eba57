//! Probe destinations.
//!
//! A [`TargetRegistry`] is an immutable, cheaply clonable list of [`Target`]s.
//! Topology changes never edit a registry in place; a new one is built and
//! swapped in whole, so a scrape holding a clone keeps a consistent view.

use std::net::IpAddr;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A single destination to probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    /// IP literal of the destination.
    #[serde(rename = "ipAddress")]
    pub address: String,
    /// Advisory display name, may be empty.
    #[serde(default)]
    pub name: String,
}

impl Target {
    /// Create a new target.
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }

    /// Whether the address is a non-empty, parseable IP literal.
    pub fn is_valid(&self) -> bool {
        !self.address.is_empty() && self.address.parse::<IpAddr>().is_ok()
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ipAddress: {}, name: {}}}", self.address, self.name)
    }
}

/// Ordered, immutable set of probe targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetRegistry(Arc<[Target]>);

impl TargetRegistry {
    /// Build a registry from already validated targets.
    pub fn new(targets: Vec<Target>) -> Self {
        Self(targets.into())
    }

    /// Validate the given targets and build a registry from the survivors.
    pub fn validated(targets: impl IntoIterator<Item = Target>) -> Self {
        Self::new(validate_targets(targets))
    }
}

impl Deref for TargetRegistry {
    type Target = [Target];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Target>> for TargetRegistry {
    fn from(targets: Vec<Target>) -> Self {
        Self::new(targets)
    }
}

/// Drop targets whose address is empty or not an IP literal, preserving order.
pub fn validate_targets(targets: impl IntoIterator<Item = Target>) -> Vec<Target> {
    targets
        .into_iter()
        .filter(|t| {
            let valid = t.is_valid();
            if !valid {
                tracing::warn!(
                    target_address = %t.address,
                    target_name = %t.name,
                    "Skip the invalid ping target. The `ipAddress` should be a non-empty valid IP address"
                );
            }
            valid
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Target> {
        vec![
            Target::new("1.2.3.4", "node1"),
            Target::new("1.2.3.4", ""),
            Target::new("", ""),
            Target::new("1.2", "node2"),
        ]
    }

    #[test]
    fn test_validate_targets_filters_invalid() {
        let actual = validate_targets(sample());
        assert_eq!(
            actual,
            vec![Target::new("1.2.3.4", "node1"), Target::new("1.2.3.4", "")]
        );
    }

    #[test]
    fn test_validate_targets_idempotent() {
        let once = validate_targets(sample());
        let twice = validate_targets(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_validate_targets_ipv6() {
        let actual = validate_targets(vec![Target::new("fe80::1", "v6"), Target::new("::1", "")]);
        assert_eq!(actual.len(), 2);
    }

    #[test]
    fn test_target_yaml_keys() {
        let yaml = "- ipAddress: 10.0.0.1\n  name: worker-1\n- ipAddress: 10.0.0.2\n";
        let targets: Vec<Target> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(targets[0], Target::new("10.0.0.1", "worker-1"));
        assert_eq!(targets[1], Target::new("10.0.0.2", ""));
    }
}
