//! CPU description strategies.
//!
//! Older PVE releases omit `cpuinfo` from the node status, in which case the
//! node's hardware listing is the only place the CPU model and clock appear.

use crate::core::domain::model::node_record::CpuInfo;
use serde_json::Value;

/// One way of finding the CPU description of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuInfoStrategy {
    /// The `cpuinfo` block of `GET /nodes/{node}/status`
    NodeStatus,
    /// The `cpu` entry of `GET /nodes/{node}/hardware`
    Hardware,
}

impl CpuInfoStrategy {
    pub const ORDER: [CpuInfoStrategy; 2] = [CpuInfoStrategy::NodeStatus, CpuInfoStrategy::Hardware];

    /// A complete description (known model and non-zero clock), if the response has one.
    pub fn extract(&self, raw: &Value) -> Option<CpuInfo> {
        self.parse(raw)
            .filter(|info| info.model != CpuInfo::default().model && info.mhz > 0)
    }

    /// Whatever the response describes, complete or not.
    fn parse(&self, raw: &Value) -> Option<CpuInfo> {
        match self {
            CpuInfoStrategy::NodeStatus => {
                let info = raw.get("cpuinfo").filter(|v| v.is_object())?;
                Some(build(
                    info.get("model"),
                    info.get("mhz"),
                    info.get("cores"),
                    info.get("sockets"),
                    info.get("cpus"),
                ))
            }
            CpuInfoStrategy::Hardware => {
                let data = raw
                    .as_array()?
                    .iter()
                    .find(|item| item.get("type").and_then(Value::as_str) == Some("cpu"))?
                    .get("data")?;
                Some(build(
                    data.get("model name"),
                    data.get("cpu MHz"),
                    data.get("cpu cores"),
                    data.get("cpu sockets"),
                    data.get("cpu total"),
                ))
            }
        }
    }
}

/// Picks the first complete description; failing that, the first partial
/// one; failing that, the `Unknown` default.
///
/// `None` entries stand for failed or skipped calls.
pub fn resolve_cpu_info<'a>(
    candidates: impl IntoIterator<Item = (CpuInfoStrategy, Option<&'a Value>)>,
) -> CpuInfo {
    let candidates: Vec<(CpuInfoStrategy, &Value)> = candidates
        .into_iter()
        .filter_map(|(strategy, raw)| raw.map(|raw| (strategy, raw)))
        .collect();
    candidates
        .iter()
        .find_map(|(strategy, raw)| strategy.extract(raw))
        .or_else(|| {
            candidates
                .iter()
                .find_map(|(strategy, raw)| strategy.parse(raw))
        })
        .unwrap_or_default()
}

fn build(
    model: Option<&Value>,
    mhz: Option<&Value>,
    cores: Option<&Value>,
    sockets: Option<&Value>,
    cpus: Option<&Value>,
) -> CpuInfo {
    let count = |value: Option<&Value>| {
        value
            .and_then(number)
            .map(|n| n as u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    };
    let cores = count(cores);
    let sockets = count(sockets);
    let cpus = match count(cpus) {
        0 => cores.saturating_mul(sockets),
        n => n,
    };
    CpuInfo {
        model: model
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| CpuInfo::default().model),
        mhz: mhz.and_then(number).map(|f| f as u32).unwrap_or(0),
        cores,
        sockets,
        cpus,
    }
}

fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (parsed.is_finite() && parsed >= 0.0).then_some(parsed)
}
