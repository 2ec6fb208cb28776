//! Polling-and-normalization coordinator for Proxmox VE.
//!
//! Each configured server gets its own authenticated transport, a periodic
//! non-overlapping fetch loop, and a store holding the latest complete
//! [`Snapshot`] of its nodes, VMs, containers and storage pools. Guest
//! lifecycle commands go through the same transport.
//!
//! # Examples
//!
//! ```no_run
//! use leeca_proxmox_monitor::{
//!     CommandRequest, GuestAction, GuestKind, MonitorConfig, ProxmoxResult, ServerOptions,
//!     ServerRegistry,
//! };
//!
//! #[tokio::main]
//! async fn main() -> ProxmoxResult<()> {
//!     let options: ServerOptions = serde_json::from_str(
//!         r#"{ "host": "pve.example.com", "username": "root", "password": "secret" }"#,
//!     )
//!     .expect("valid options");
//!     let config = options.into_config()?;
//!     let server = config.id().clone();
//!
//!     let registry = ServerRegistry::new();
//!     let store = registry.setup(config, MonitorConfig::default()).await?;
//!
//!     if let Some(snapshot) = store.latest() {
//!         for entity in snapshot.entities() {
//!             println!("{} = {}", entity.key, entity.state);
//!         }
//!     }
//!
//!     registry
//!         .dispatch(&CommandRequest {
//!             server,
//!             kind: GuestKind::Qemu,
//!             vmid: 100,
//!             node: "pve1".to_string(),
//!             action: GuestAction::Start,
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

mod auth;
mod core;

pub use crate::auth::application::service::credential_resolver::CredentialResolver;
pub use crate::core::{
    application::{
        command_dispatcher::CommandDispatcher,
        poller::PollerHandle,
        registry::ServerRegistry,
        snapshot_fetcher::SnapshotFetcher,
        snapshot_store::{Availability, SnapshotStore},
    },
    domain::{
        config::{MonitorConfig, RateLimitConfig},
        error::{NormalizationDefect, ProxmoxError, ProxmoxResult, ValidationError},
        model::{
            command::{CommandOutcome, CommandRequest, GuestAction},
            credential::{AuthMethod, Credential, CredentialSecret},
            guest_record::{GuestKind, GuestRecord, GuestStatus},
            node_record::{CpuInfo, LoadAverage, LoadSource, NodeRecord, NodeStatus},
            proxmox_auth::ProxmoxAuth,
            pve_version::PveVersion,
            server_config::{
                DEFAULT_UPDATE_INTERVAL_SECS, MAX_UPDATE_INTERVAL_SECS, MIN_UPDATE_INTERVAL_SECS,
                ServerConfig, ServerConfigBuilder, ServerId, ServerOptions,
            },
            snapshot::{EntityKind, EntityState, Snapshot},
            storage_record::StorageRecord,
        },
        service::{
            cpu_info::{CpuInfoStrategy, resolve_cpu_info},
            load_average::{LoadStrategy, resolve_load},
            normalizer::{
                NormalizedCycle, RawGuest, RawNode, free_percentage, normalize_cycle,
                normalize_guest, normalize_node, normalize_storage, percentage,
            },
        },
        value_object::{
            DEFAULT_PORT, DEFAULT_REALM, ProxmoxApiToken, ProxmoxCSRFToken, ProxmoxHost,
            ProxmoxPassword, ProxmoxPort, ProxmoxRealm, ProxmoxTicket, ProxmoxUrl,
            ProxmoxUsername,
        },
    },
    infrastructure::api_client::{ApiClient, PveTransport},
};

#[cfg(test)]
mod tests;
