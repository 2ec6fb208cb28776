use serde::{Deserialize, Serialize};

/// Release information from `GET /version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PveVersion {
    pub version: String,
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub repoid: String,
}

impl std::fmt::Display for PveVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.repoid.is_empty() {
            write!(f, "pve-manager/{}", self.version)
        } else {
            write!(f, "pve-manager/{}/{}", self.version, self.repoid)
        }
    }
}
