//! The atomic unit of publication: one complete poll cycle of one server.

use crate::core::domain::{
    model::{
        command::GuestAction,
        guest_record::{GuestKind, GuestRecord},
        node_record::NodeRecord,
        server_config::ServerId,
        storage_record::StorageRecord,
    },
    value_object::serde_helpers::unix_millis,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::SystemTime;

/// A complete, internally consistent view of one server as of one cycle.
///
/// Every guest's and pool's `node` names a node of the same snapshot, guest
/// identifiers are unique within their kind and pools are unique per node.
/// Only the normalizer builds snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub server: ServerId,
    #[serde(with = "unix_millis")]
    pub taken_at: SystemTime,
    pub nodes: Vec<NodeRecord>,
    pub guests: Vec<GuestRecord>,
    #[serde(default)]
    pub storage: Vec<StorageRecord>,
}

impl Snapshot {
    pub fn node(&self, name: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|node| node.name == name)
    }

    pub fn guest(&self, kind: GuestKind, vmid: u32) -> Option<&GuestRecord> {
        self.guests
            .iter()
            .find(|guest| guest.kind == kind && guest.vmid == vmid)
    }

    pub fn vms(&self) -> impl Iterator<Item = &GuestRecord> {
        self.guests.iter().filter(|g| g.kind == GuestKind::Qemu)
    }

    pub fn containers(&self) -> impl Iterator<Item = &GuestRecord> {
        self.guests.iter().filter(|g| g.kind == GuestKind::Lxc)
    }

    /// Guests hosted by `node`, in snapshot order.
    pub fn guests_on<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a GuestRecord> + 'a {
        self.guests.iter().filter(move |g| g.node == node)
    }

    pub fn storage_pool(&self, node: &str, storage: &str) -> Option<&StorageRecord> {
        self.storage
            .iter()
            .find(|pool| pool.node == node && pool.storage == storage)
    }

    /// Projects the snapshot onto host-facing entity states.
    pub fn entities(&self) -> Vec<EntityState> {
        let nodes = self.nodes.iter().map(|node| EntityState {
            key: format!("node/{}", node.name),
            kind: EntityKind::Node,
            state: node.status.as_str().to_string(),
            attributes: attribute_map(node),
            actions: Vec::new(),
        });
        let guests = self.guests.iter().map(|guest| EntityState {
            key: guest.key(),
            kind: match guest.kind {
                GuestKind::Qemu => EntityKind::Qemu,
                GuestKind::Lxc => EntityKind::Lxc,
            },
            state: guest.status.as_str().to_string(),
            attributes: attribute_map(guest),
            actions: GuestAction::offered_for(guest.kind, guest.status),
        });
        let storage = self.storage.iter().map(|pool| EntityState {
            key: pool.key(),
            kind: EntityKind::Storage,
            state: pool.state().to_string(),
            attributes: attribute_map(pool),
            actions: Vec::new(),
        });
        nodes.chain(guests).chain(storage).collect()
    }
}

/// What an entity state describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Node,
    Qemu,
    Lxc,
    Storage,
}

/// A read-only status value with its attributes and currently offered actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// `node/<name>`, `qemu/<vmid>`, `lxc/<vmid>` or `storage/<node>/<storage>`.
    pub key: String,
    pub kind: EntityKind,
    pub state: String,
    pub attributes: BTreeMap<String, serde_json::Value>,
    pub actions: Vec<GuestAction>,
}

fn attribute_map<T: Serialize>(record: &T) -> BTreeMap<String, serde_json::Value> {
    match serde_json::to_value(record) {
        Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    }
}
