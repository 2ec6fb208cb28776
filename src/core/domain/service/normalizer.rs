//! Maps raw, version-variant PVE JSON onto the fixed record schema.
//!
//! Everything here is pure: the same raw input always yields the same
//! records. Field-name variants are resolved through small named strategy
//! lists tried in a fixed order instead of ad hoc probing.

use crate::core::domain::{
    error::NormalizationDefect,
    model::{
        guest_record::{GuestKind, GuestRecord, GuestStatus},
        node_record::{LoadAverage, LoadSource, NodeRecord, NodeStatus},
        server_config::ServerId,
        snapshot::Snapshot,
        storage_record::StorageRecord,
    },
    service::cpu_info::{CpuInfoStrategy, resolve_cpu_info},
};
use serde_json::Value;
use std::collections::HashSet;
use std::time::SystemTime;

/// Raw responses gathered for one node during a cycle.
#[derive(Debug, Clone)]
pub struct RawNode {
    /// Name the node was enumerated under.
    pub name: String,
    /// Entry from `GET /nodes`.
    pub summary: Value,
    /// `GET /nodes/{node}/status`, when that call succeeded.
    pub status: Option<Value>,
    /// `GET /nodes/{node}/hardware`, fetched only when the status lacks `cpuinfo`.
    pub hardware: Option<Value>,
    /// Entries of `GET /nodes/{node}/storage`; empty when that call failed.
    pub storage: Vec<Value>,
    pub load_average: LoadAverage,
    pub load_source: LoadSource,
    pub guests: Vec<RawGuest>,
}

/// Raw responses gathered for one guest during a cycle.
#[derive(Debug, Clone)]
pub struct RawGuest {
    pub kind: GuestKind,
    /// Entry from `GET /nodes/{node}/{qemu|lxc}`.
    pub summary: Value,
    /// `GET …/status/current`, when fetched and successful.
    pub detail: Option<Value>,
}

/// A normalized cycle and the defects found while building it.
#[derive(Debug, Clone)]
pub struct NormalizedCycle {
    pub snapshot: Snapshot,
    pub defects: Vec<NormalizationDefect>,
}

/// Where a guest's numeric identifier may live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdentifierField {
    Vmid,
    /// `id`, either numeric or of the form `qemu/100`
    Id,
}

impl IdentifierField {
    const ORDER: [IdentifierField; 2] = [IdentifierField::Vmid, IdentifierField::Id];

    fn key(&self) -> &'static str {
        match self {
            IdentifierField::Vmid => "vmid",
            IdentifierField::Id => "id",
        }
    }

    fn parse(&self, value: &Value) -> Option<u32> {
        match (self, value) {
            (_, Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            (IdentifierField::Vmid, Value::String(s)) => s.trim().parse().ok(),
            (IdentifierField::Id, Value::String(s)) => {
                let tail = s.rsplit_once('/').map_or(s.as_str(), |(_, tail)| tail);
                tail.trim().parse().ok()
            }
            _ => None,
        }
    }
}

/// Resolves a guest identifier: `vmid` first, then `id`.
pub fn guest_identifier(raw: &Value, kind: GuestKind, node: &str) -> Result<u32, NormalizationDefect> {
    let mut seen: Option<String> = None;
    for field in IdentifierField::ORDER {
        let Some(value) = raw.get(field.key()).filter(|v| !v.is_null()) else {
            continue;
        };
        if let Some(id) = field.parse(value) {
            return Ok(id);
        }
        seen.get_or_insert_with(|| value.to_string());
    }
    Err(match seen {
        Some(raw) => NormalizationDefect::InvalidIdentifier {
            kind: kind.as_str().to_string(),
            node: node.to_string(),
            raw,
        },
        None => NormalizationDefect::MissingIdentifier {
            kind: kind.as_str().to_string(),
            node: node.to_string(),
        },
    })
}

/// `round(100 * used / total, 1)` clamped to [0, 100]; a zero total yields 0.
pub fn percentage(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(100.0 * used as f64 / total as f64).clamp(0.0, 100.0)
}

/// Share of `total` that is still free, on the same rules as [`percentage`].
pub fn free_percentage(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    percentage(total.saturating_sub(used), total)
}

fn cpu_percent(fraction: f64) -> f64 {
    round1(fraction * 100.0).clamp(0.0, 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u64)),
        _ => None,
    }
}

fn field<'a>(raw: Option<&'a Value>, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(raw?, |value, key| value.get(key))
        .filter(|v| !v.is_null())
}

/// First numeric hit over (source, path) candidates.
fn first_u64(candidates: &[(Option<&Value>, &[&str])]) -> u64 {
    candidates
        .iter()
        .find_map(|(raw, path)| field(*raw, path).and_then(as_u64))
        .unwrap_or(0)
}

fn first_f64(candidates: &[(Option<&Value>, &[&str])]) -> f64 {
    candidates
        .iter()
        .find_map(|(raw, path)| field(*raw, path).and_then(as_f64))
        .unwrap_or(0.0)
}

fn first_str<'a>(candidates: &[(Option<&'a Value>, &[&str])]) -> Option<&'a str> {
    candidates
        .iter()
        .find_map(|(raw, path)| field(*raw, path).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
}

/// Builds a node record from its `/nodes` entry and, when available, its status detail.
///
/// Summary values win; the detail fills whatever the summary lacks.
pub fn normalize_node(raw: &RawNode) -> NodeRecord {
    let summary = Some(&raw.summary);
    let status = raw.status.as_ref();

    let cpu = first_f64(&[(summary, &["cpu"]), (status, &["cpu"])]);
    let memory_used = first_u64(&[(summary, &["mem"]), (status, &["memory", "used"])]);
    let memory_total = first_u64(&[(summary, &["maxmem"]), (status, &["memory", "total"])]);
    let disk_used = first_u64(&[(summary, &["disk"]), (status, &["rootfs", "used"])]);
    let disk_total = first_u64(&[(summary, &["maxdisk"]), (status, &["rootfs", "total"])]);
    let uptime = first_u64(&[(summary, &["uptime"]), (status, &["uptime"])]);

    NodeRecord {
        name: raw.name.clone(),
        status: first_str(&[(summary, &["status"])])
            .map(NodeStatus::from_raw)
            .unwrap_or(NodeStatus::Unknown),
        available: status.is_some(),
        cpu,
        cpu_percent: cpu_percent(cpu),
        memory_used,
        memory_total,
        memory_percent: percentage(memory_used, memory_total),
        disk_used,
        disk_total,
        disk_percent: percentage(disk_used, disk_total),
        disk_free_percent: free_percentage(disk_used, disk_total),
        uptime,
        load_average: raw.load_average,
        load_source: raw.load_source,
        cpu_info: resolve_cpu_info(CpuInfoStrategy::ORDER.map(|strategy| {
            let response = match strategy {
                CpuInfoStrategy::NodeStatus => status,
                CpuInfoStrategy::Hardware => raw.hardware.as_ref(),
            };
            (strategy, response)
        })),
    }
}

fn flag(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(other) => as_u64(other).map_or(default, |n| n != 0),
        None => default,
    }
}

/// Builds a storage record from one entry of a node's storage index.
///
/// Percentages are derived from the byte counts; PVE's own `used_fraction`
/// is ignored.
pub fn normalize_storage(node: &str, raw: &Value) -> Result<StorageRecord, NormalizationDefect> {
    let entry = Some(raw);
    let storage = first_str(&[(entry, &["storage"])])
        .map(str::trim)
        .ok_or_else(|| NormalizationDefect::MissingField("storage".to_string()))?;

    let used = first_u64(&[(entry, &["used"])]);
    let total = first_u64(&[(entry, &["total"])]);
    let available = first_u64(&[(entry, &["avail"])]);

    Ok(StorageRecord {
        node: node.to_string(),
        storage: storage.to_string(),
        storage_type: first_str(&[(entry, &["type"])])
            .unwrap_or("unknown")
            .to_string(),
        content: first_str(&[(entry, &["content"])])
            .map(|content| {
                content
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        shared: flag(field(entry, &["shared"]), false),
        enabled: flag(field(entry, &["enabled"]), true),
        active: flag(field(entry, &["active"]), true),
        used,
        total,
        available,
        usage_percent: percentage(used, total),
        free_percent: percentage(available, total),
    })
}

fn guest_status(summary: Option<&Value>, detail: Option<&Value>) -> GuestStatus {
    let status = first_str(&[(summary, &["status"]), (detail, &["status"])])
        .map(GuestStatus::from_raw)
        .unwrap_or(GuestStatus::Unknown);
    // QEMU reports a paused/suspended guest as "running" with a finer qmpstatus
    let qmp = first_str(&[(detail, &["qmpstatus"]), (summary, &["qmpstatus"])])
        .map(GuestStatus::from_raw);
    match (status, qmp) {
        (GuestStatus::Running, Some(fine @ (GuestStatus::Paused | GuestStatus::Suspended))) => fine,
        _ => status,
    }
}

fn tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|tags| {
        tags.split([';', ',', ' '])
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn is_template(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(other) => as_u64(other).is_some_and(|n| n != 0),
        None => false,
    }
}

/// Builds a guest record owned by `node` (the node it was enumerated under,
/// unless the payload names another one).
pub fn normalize_guest(node: &str, raw: &RawGuest) -> Result<GuestRecord, NormalizationDefect> {
    let summary = Some(&raw.summary);
    let detail = raw.detail.as_ref();
    let vmid = guest_identifier(&raw.summary, raw.kind, node)?;

    let cpu = first_f64(&[(summary, &["cpu"]), (detail, &["cpu"])]);
    let memory_used = first_u64(&[(summary, &["mem"]), (detail, &["mem"])]);
    let memory_total = first_u64(&[(summary, &["maxmem"]), (detail, &["maxmem"])]);
    let disk_used = first_u64(&[(summary, &["disk"]), (detail, &["disk"])]);
    let disk_total = first_u64(&[(summary, &["maxdisk"]), (detail, &["maxdisk"])]);
    let uptime = first_u64(&[(summary, &["uptime"]), (detail, &["uptime"])]);

    Ok(GuestRecord {
        kind: raw.kind,
        vmid,
        name: first_str(&[(summary, &["name"]), (detail, &["name"])])
            .map(str::to_string)
            .unwrap_or_else(|| raw.kind.fallback_name(vmid)),
        node: first_str(&[(summary, &["node"])])
            .unwrap_or(node)
            .to_string(),
        status: guest_status(summary, detail),
        cpu,
        cpu_percent: cpu_percent(cpu),
        memory_used,
        memory_total,
        memory_percent: percentage(memory_used, memory_total),
        disk_used,
        disk_total,
        disk_percent: percentage(disk_used, disk_total),
        disk_free_percent: free_percentage(disk_used, disk_total),
        uptime,
        tags: tags(first_str(&[(summary, &["tags"]), (detail, &["tags"])])),
        template: is_template(field(summary, &["template"]).or(field(detail, &["template"]))),
    })
}

/// Normalizes a whole cycle and enforces the snapshot invariants:
/// unique node names, unique guest ids per kind, unique pools per node,
/// no orphan guests.
pub fn normalize_cycle(server: &ServerId, taken_at: SystemTime, raw: &[RawNode]) -> NormalizedCycle {
    let mut defects = Vec::new();
    let mut nodes = Vec::with_capacity(raw.len());
    let mut node_names = HashSet::new();

    for raw_node in raw {
        if !node_names.insert(raw_node.name.clone()) {
            defects.push(NormalizationDefect::DuplicateIdentifier {
                kind: "node".to_string(),
                id: raw_node.name.clone(),
            });
            continue;
        }
        nodes.push(normalize_node(raw_node));
    }

    let mut guests = Vec::new();
    let mut guest_ids = HashSet::new();
    for raw_node in raw {
        for raw_guest in &raw_node.guests {
            let guest = match normalize_guest(&raw_node.name, raw_guest) {
                Ok(guest) => guest,
                Err(defect) => {
                    defects.push(defect);
                    continue;
                }
            };
            if !node_names.contains(&guest.node) {
                defects.push(NormalizationDefect::OrphanGuest {
                    kind: guest.kind.as_str().to_string(),
                    vmid: guest.vmid,
                    node: guest.node,
                });
                continue;
            }
            if !guest_ids.insert((guest.kind, guest.vmid)) {
                defects.push(NormalizationDefect::DuplicateIdentifier {
                    kind: guest.kind.as_str().to_string(),
                    id: guest.vmid.to_string(),
                });
                continue;
            }
            guests.push(guest);
        }
    }

    let mut storage = Vec::new();
    let mut pool_keys = HashSet::new();
    let mut seen_nodes = HashSet::new();
    for raw_node in raw {
        if !seen_nodes.insert(raw_node.name.as_str()) {
            continue;
        }
        for entry in &raw_node.storage {
            let pool = match normalize_storage(&raw_node.name, entry) {
                Ok(pool) => pool,
                Err(defect) => {
                    defects.push(defect);
                    continue;
                }
            };
            if !pool_keys.insert(pool.key()) {
                defects.push(NormalizationDefect::DuplicateIdentifier {
                    kind: "storage".to_string(),
                    id: pool.key(),
                });
                continue;
            }
            storage.push(pool);
        }
    }

    NormalizedCycle {
        snapshot: Snapshot {
            server: server.clone(),
            taken_at,
            nodes,
            guests,
            storage,
        },
        defects,
    }
}
