//! Normalized state of one PVE node.

use serde::{Deserialize, Serialize};

/// Node connectivity as reported by `/nodes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Offline,
    Unknown,
}

impl NodeStatus {
    /// Maps a raw status string; anything unrecognized is `Unknown`.
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "online" => NodeStatus::Online,
            "offline" => NodeStatus::Offline,
            _ => NodeStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Online => "online",
            NodeStatus::Offline => "offline",
            NodeStatus::Unknown => "unknown",
        }
    }
}

/// Which extraction strategy produced a node's load averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadSource {
    RrdHour,
    RrdDay,
    NodeStatus,
    Fallback,
}

/// Load averages in 1/5/15-minute order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

impl LoadAverage {
    pub const ZERO: LoadAverage = LoadAverage {
        one: 0.0,
        five: 0.0,
        fifteen: 0.0,
    };

    /// Builds a triple from up to three values; missing trailing values are zero.
    pub fn from_values(values: &[f64]) -> Self {
        let at = |i: usize| values.get(i).copied().unwrap_or(0.0);
        Self {
            one: at(0),
            five: at(1),
            fifteen: at(2),
        }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.one, self.five, self.fifteen]
    }
}

/// CPU description from the node status `cpuinfo` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuInfo {
    pub model: String,
    /// Nominal frequency in MHz.
    pub mhz: u32,
    /// Cores per socket.
    pub cores: u32,
    pub sockets: u32,
    /// Logical CPUs as reported by PVE, or cores × sockets when absent.
    pub cpus: u32,
}

impl Default for CpuInfo {
    fn default() -> Self {
        Self {
            model: "Unknown".to_string(),
            mhz: 0,
            cores: 0,
            sockets: 0,
            cpus: 0,
        }
    }
}

/// One node of a snapshot. Replaced wholesale every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    pub status: NodeStatus,
    /// False when the node detail call failed this cycle.
    pub available: bool,
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
    pub load_average: LoadAverage,
    pub load_source: LoadSource,
    pub cpu_info: CpuInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_status_mapping() {
        assert_eq!(NodeStatus::from_raw("online"), NodeStatus::Online);
        assert_eq!(NodeStatus::from_raw("OFFLINE"), NodeStatus::Offline);
        assert_eq!(NodeStatus::from_raw("maintenance"), NodeStatus::Unknown);
    }

    #[test]
    fn test_load_average_pads_trailing_zeros() {
        assert_eq!(
            LoadAverage::from_values(&[1.5]).as_array(),
            [1.5, 0.0, 0.0]
        );
        assert_eq!(
            LoadAverage::from_values(&[1.0, 2.0, 3.0, 4.0]).as_array(),
            [1.0, 2.0, 3.0]
        );
        assert_eq!(LoadAverage::from_values(&[]), LoadAverage::ZERO);
    }
}
