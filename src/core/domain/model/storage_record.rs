//! Normalized state of one storage pool as seen from one node.

use serde::{Deserialize, Serialize};

/// A storage pool on a node. Shared pools appear once per node that mounts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub node: String,
    /// Storage id as configured in PVE, e.g. `local-lvm`.
    pub storage: String,
    /// Backend type (`dir`, `lvmthin`, `zfspool`, `nfs`, ...).
    #[serde(rename = "type")]
    pub storage_type: String,
    /// Content types the pool accepts (`images`, `rootdir`, `iso`, ...).
    pub content: Vec<String>,
    pub shared: bool,
    pub enabled: bool,
    pub active: bool,
    pub used: u64,
    pub total: u64,
    pub available: u64,
    pub usage_percent: f64,
    /// Share of `total` reported as available, which thin pools may keep below `total - used`.
    pub free_percent: f64,
}

impl StorageRecord {
    /// `storage/<node>/<storage>`.
    pub fn key(&self) -> String {
        format!("storage/{}/{}", self.node, self.storage)
    }

    /// `disabled`, `active` or `inactive`.
    pub fn state(&self) -> &'static str {
        match (self.enabled, self.active) {
            (false, _) => "disabled",
            (true, true) => "active",
            (true, false) => "inactive",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(enabled: bool, active: bool) -> StorageRecord {
        StorageRecord {
            node: "pve1".to_string(),
            storage: "local-lvm".to_string(),
            storage_type: "lvmthin".to_string(),
            content: vec!["images".to_string(), "rootdir".to_string()],
            shared: false,
            enabled,
            active,
            used: 0,
            total: 0,
            available: 0,
            usage_percent: 0.0,
            free_percent: 0.0,
        }
    }

    #[test]
    fn test_key_and_state() {
        assert_eq!(pool(true, true).key(), "storage/pve1/local-lvm");
        assert_eq!(pool(true, true).state(), "active");
        assert_eq!(pool(true, false).state(), "inactive");
        assert_eq!(pool(false, true).state(), "disabled");
    }

    #[test]
    fn test_type_serialized_under_pve_name() {
        let value = serde_json::to_value(pool(true, true)).unwrap();
        assert_eq!(value["type"], "lvmthin");
        assert!(value.get("storage_type").is_none());
    }
}
