//! Normalized state of one guest (QEMU VM or LXC container).

use serde::{Deserialize, Serialize};

/// Guest flavour; also the API path segment (`qemu` / `lxc`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestKind {
    Qemu,
    Lxc,
}

impl GuestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuestKind::Qemu => "qemu",
            GuestKind::Lxc => "lxc",
        }
    }

    /// Name used when the API reports none.
    pub(crate) fn fallback_name(&self, vmid: u32) -> String {
        match self {
            GuestKind::Qemu => format!("VM {}", vmid),
            GuestKind::Lxc => format!("Container {}", vmid),
        }
    }
}

impl std::fmt::Display for GuestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of guest states used for logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestStatus {
    Running,
    Stopped,
    Paused,
    Suspended,
    Unknown,
}

impl GuestStatus {
    /// Maps a raw status string; anything unrecognized is `Unknown`.
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "running" => GuestStatus::Running,
            "stopped" | "shutdown" => GuestStatus::Stopped,
            "paused" => GuestStatus::Paused,
            "suspended" => GuestStatus::Suspended,
            _ => GuestStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GuestStatus::Running => "running",
            GuestStatus::Stopped => "stopped",
            GuestStatus::Paused => "paused",
            GuestStatus::Suspended => "suspended",
            GuestStatus::Unknown => "unknown",
        }
    }
}

/// One VM or container of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestRecord {
    pub kind: GuestKind,
    pub vmid: u32,
    pub name: String,
    /// Owning node; always names a node of the same snapshot.
    pub node: String,
    pub status: GuestStatus,
    /// CPU usage as a fraction (0.0 to 1.0).
    pub cpu: f64,
    pub cpu_percent: f64,
    pub memory_used: u64,
    pub memory_total: u64,
    pub memory_percent: f64,
    pub disk_used: u64,
    pub disk_total: u64,
    pub disk_percent: f64,
    pub disk_free_percent: f64,
    /// Uptime in seconds.
    pub uptime: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub template: bool,
}

impl GuestRecord {
    /// Stable key, e.g. `qemu/100`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.kind.as_str(), self.vmid)
    }

    /// Base API path of this guest.
    pub fn api_path(&self) -> String {
        guest_path(&self.node, self.kind, self.vmid)
    }
}

/// `/nodes/{node}/{qemu|lxc}/{vmid}`
pub(crate) fn guest_path(node: &str, kind: GuestKind, vmid: u32) -> String {
    format!("/nodes/{}/{}/{}", node, kind.as_str(), vmid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_status_closed_set() {
        assert_eq!(GuestStatus::from_raw("running"), GuestStatus::Running);
        assert_eq!(GuestStatus::from_raw("stopped"), GuestStatus::Stopped);
        assert_eq!(GuestStatus::from_raw("shutdown"), GuestStatus::Stopped);
        assert_eq!(GuestStatus::from_raw("Paused"), GuestStatus::Paused);
        assert_eq!(GuestStatus::from_raw("suspended"), GuestStatus::Suspended);
        assert_eq!(GuestStatus::from_raw("prelaunch"), GuestStatus::Unknown);
        assert_eq!(GuestStatus::from_raw(""), GuestStatus::Unknown);
    }

    #[test]
    fn test_paths() {
        assert_eq!(guest_path("pve1", GuestKind::Lxc, 101), "/nodes/pve1/lxc/101");
        assert_eq!(GuestKind::Qemu.fallback_name(100), "VM 100");
        assert_eq!(GuestKind::Lxc.fallback_name(7), "Container 7");
    }
}
