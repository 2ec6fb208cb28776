//! One poll cycle against one server: the ordered set of API calls and the
//! partial-failure policy around them.

use crate::core::{
    domain::{
        config::MonitorConfig,
        error::{NormalizationDefect, ProxmoxError, ProxmoxResult},
        model::{
            guest_record::{GuestKind, guest_path},
            server_config::ServerId,
            snapshot::Snapshot,
        },
        service::{
            cpu_info::CpuInfoStrategy,
            load_average::{LoadStrategy, resolve_load},
            normalizer::{RawGuest, RawNode, guest_identifier, normalize_cycle},
        },
    },
    infrastructure::api_client::PveTransport,
};
use futures::{StreamExt, future::join_all, stream};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::{debug, info, warn};

/// Fetches and normalizes complete snapshots for one server.
///
/// Only the node list is mandatory: if `GET /nodes` fails the whole cycle
/// fails. Every other call degrades the record it feeds.
pub struct SnapshotFetcher {
    server: ServerId,
    transport: Arc<dyn PveTransport>,
    node_concurrency: usize,
    fetch_guest_details: bool,
}

impl SnapshotFetcher {
    pub fn new(server: ServerId, transport: Arc<dyn PveTransport>, monitor: &MonitorConfig) -> Self {
        Self {
            server,
            transport,
            node_concurrency: monitor.effective_node_concurrency(),
            fetch_guest_details: monitor.fetch_guest_details,
        }
    }

    pub fn server(&self) -> &ServerId {
        &self.server
    }

    /// Runs one cycle and returns the normalized snapshot.
    ///
    /// Nodes are processed with bounded parallelism; within a node the status,
    /// RRD, VM list, container list and storage index calls run concurrently.
    pub async fn fetch(&self) -> ProxmoxResult<Snapshot> {
        let started = Instant::now();
        let nodes = self.transport.get("/nodes").await?;
        let entries = self.node_entries(nodes)?;

        let raw_nodes: Vec<RawNode> = stream::iter(entries)
            .map(|(name, summary)| self.fetch_node(name, summary))
            .buffered(self.node_concurrency)
            .collect()
            .await;

        let cycle = normalize_cycle(&self.server, SystemTime::now(), &raw_nodes);
        for defect in &cycle.defects {
            warn!(server = %self.server, %defect, "record skipped");
        }
        info!(
            server = %self.server,
            nodes = cycle.snapshot.nodes.len(),
            guests = cycle.snapshot.guests.len(),
            storage = cycle.snapshot.storage.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "cycle complete"
        );
        Ok(cycle.snapshot)
    }

    /// Extracts `(name, summary)` pairs from the `/nodes` response, sorted by name.
    fn node_entries(&self, nodes: Value) -> ProxmoxResult<Vec<(String, Value)>> {
        let Value::Array(items) = nodes else {
            return Err(ProxmoxError::Unexpected(
                "/nodes did not return a list".to_string(),
            ));
        };

        let mut entries: Vec<(String, Value)> = items
            .into_iter()
            .filter_map(|item| {
                match item.get("node").and_then(Value::as_str).map(str::trim) {
                    Some(name) if !name.is_empty() => Some((name.to_string(), item)),
                    _ => {
                        let defect = NormalizationDefect::MissingField("node".to_string());
                        warn!(server = %self.server, %defect, "node entry skipped");
                        None
                    }
                }
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    async fn fetch_node(&self, name: String, summary: Value) -> RawNode {
        let status_path = format!("/nodes/{}/status", name);
        let hour_path = rrd_path(&name, LoadStrategy::RrdHour);
        let qemu_path = format!("/nodes/{}/{}", name, GuestKind::Qemu.as_str());
        let lxc_path = format!("/nodes/{}/{}", name, GuestKind::Lxc.as_str());
        let storage_path = format!("/nodes/{}/storage", name);

        let (status, hour, qemu, lxc, storage) = tokio::join!(
            self.transport.get(&status_path),
            self.transport.get(&hour_path),
            self.transport.get(&qemu_path),
            self.transport.get(&lxc_path),
            self.transport.get(&storage_path),
        );

        let status = self.degrade(&name, "status", status);
        let hour = self.degrade(&name, "rrd hour", hour);
        let storage = match self.degrade(&name, "storage", storage) {
            Some(Value::Array(pools)) => pools,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                warn!(server = %self.server, node = %name, "storage index is not an array");
                Vec::new()
            }
        };

        // Only a reachable node whose status lacks a usable cpuinfo block is asked for its hardware.
        let hardware = match status.as_ref() {
            Some(raw) if CpuInfoStrategy::NodeStatus.extract(raw).is_none() => {
                debug!(server = %self.server, node = %name, "cpuinfo missing, trying hardware");
                let hardware_path = format!("/nodes/{}/hardware", name);
                self.degrade(&name, "hardware", self.transport.get(&hardware_path).await)
            }
            _ => None,
        };

        let hour_usable = hour
            .as_ref()
            .and_then(|raw| LoadStrategy::RrdHour.extract(raw))
            .is_some();
        let day = if hour_usable {
            None
        } else {
            debug!(server = %self.server, node = %name, "hour RRD unusable, trying day");
            let day_path = rrd_path(&name, LoadStrategy::RrdDay);
            self.degrade(&name, "rrd day", self.transport.get(&day_path).await)
        };

        let (load_average, load_source) = resolve_load([
            (LoadStrategy::RrdHour, hour.as_ref()),
            (LoadStrategy::RrdDay, day.as_ref()),
            (LoadStrategy::NodeStatus, status.as_ref()),
        ]);
        debug!(server = %self.server, node = %name, ?load_source, "load average resolved");

        let mut guests = self.guest_summaries(&name, GuestKind::Qemu, qemu);
        guests.extend(self.guest_summaries(&name, GuestKind::Lxc, lxc));
        if self.fetch_guest_details {
            guests = self.attach_details(&name, guests).await;
        }

        RawNode {
            name,
            summary,
            status,
            hardware,
            storage,
            load_average,
            load_source,
            guests,
        }
    }

    fn guest_summaries(
        &self,
        node: &str,
        kind: GuestKind,
        result: ProxmoxResult<Value>,
    ) -> Vec<RawGuest> {
        match self.degrade(node, kind.as_str(), result) {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|summary| RawGuest {
                    kind,
                    summary,
                    detail: None,
                })
                .collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                warn!(server = %self.server, node, %kind, "guest list is not an array");
                Vec::new()
            }
        }
    }

    /// Fetches `status/current` for every identifiable guest.
    ///
    /// A 404 means the guest vanished since enumeration and drops it; any
    /// other failure keeps the summary as is.
    async fn attach_details(&self, node: &str, guests: Vec<RawGuest>) -> Vec<RawGuest> {
        let fetches = guests.into_iter().map(|mut guest| async move {
            let Ok(vmid) = guest_identifier(&guest.summary, guest.kind, node) else {
                return Some(guest);
            };
            let path = format!("{}/status/current", guest_path(node, guest.kind, vmid));
            match self.transport.get(&path).await {
                Ok(detail) => {
                    guest.detail = Some(detail);
                    Some(guest)
                }
                Err(e) if e.is_not_found() => {
                    debug!(server = %self.server, node, kind = %guest.kind, vmid, "guest vanished");
                    None
                }
                Err(e) => {
                    warn!(server = %self.server, node, kind = %guest.kind, vmid, error = %e, "guest detail unavailable");
                    Some(guest)
                }
            }
        });
        join_all(fetches).await.into_iter().flatten().collect()
    }

    fn degrade(&self, node: &str, call: &str, result: ProxmoxResult<Value>) -> Option<Value> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(server = %self.server, node, call, error = %e, "node call failed");
                None
            }
        }
    }
}

fn rrd_path(node: &str, strategy: LoadStrategy) -> String {
    format!(
        "/nodes/{}/rrddata?timeframe={}",
        node,
        strategy.timeframe().unwrap_or("hour")
    )
}
