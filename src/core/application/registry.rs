//! Process-wide set of configured servers.

use crate::core::{
    application::{
        command_dispatcher::CommandDispatcher, poller::PollerHandle,
        snapshot_fetcher::SnapshotFetcher, snapshot_store::SnapshotStore,
    },
    domain::{
        config::MonitorConfig,
        error::{ProxmoxError, ProxmoxResult},
        model::{
            command::{CommandOutcome, CommandRequest},
            server_config::{ServerConfig, ServerId},
        },
    },
    infrastructure::api_client::{ApiClient, PveTransport},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

struct ServerEntry {
    client: Arc<ApiClient>,
    store: SnapshotStore,
    dispatcher: CommandDispatcher,
    poller: PollerHandle,
    stale_threshold: u32,
}

/// Owns one transport, store, dispatcher and poller per configured server.
///
/// Servers never share anything: two entries with the same username but
/// different hosts get separate clients, stores and poll loops.
///
/// # Examples
///
/// ```no_run
/// use leeca_proxmox_monitor::{MonitorConfig, ProxmoxResult, ServerConfig, ServerRegistry};
///
/// #[tokio::main]
/// async fn main() -> ProxmoxResult<()> {
///     let registry = ServerRegistry::new();
///     let config = ServerConfig::builder()
///         .host("pve.example.com")
///         .token_auth("root@pam", "monitor", "00000000-0000-0000-0000-000000000000")
///         .build()?;
///
///     let store = registry.setup(config, MonitorConfig::default()).await?;
///     let mut updates = store.subscribe();
///     updates.changed().await.ok();
///     if let Some(snapshot) = store.latest() {
///         println!("{} nodes, {} guests", snapshot.nodes.len(), snapshot.guests.len());
///     }
///
///     registry.teardown_all().await;
///     Ok(())
/// }
/// ```
#[derive(Default)]
pub struct ServerRegistry {
    servers: RwLock<HashMap<ServerId, ServerEntry>>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifies the server's credentials and starts polling it.
    ///
    /// # Errors
    /// A configuration error for an id that is already registered; the
    /// client's error when the server cannot be reached or rejects the
    /// credentials. The client is closed on every failure path.
    pub async fn setup(
        &self,
        config: ServerConfig,
        monitor: MonitorConfig,
    ) -> ProxmoxResult<SnapshotStore> {
        let id = config.id().clone();
        if self.servers.read().await.contains_key(&id) {
            return Err(duplicate(&id));
        }

        let client = Arc::new(ApiClient::new(&config, &monitor)?);
        if let Err(e) = client.authenticate().await {
            warn!(server = %id, error = %e, "setup failed");
            client.close().await;
            return Err(e);
        }
        match client.version().await {
            Ok(version) => info!(server = %id, %version, "connected"),
            Err(e) => warn!(server = %id, error = %e, "version unavailable"),
        }

        let mut servers = self.servers.write().await;
        if servers.contains_key(&id) {
            client.close().await;
            return Err(duplicate(&id));
        }

        let transport: Arc<dyn PveTransport> = client.clone();
        let store = SnapshotStore::new();
        let fetcher = SnapshotFetcher::new(id.clone(), transport.clone(), &monitor);
        let dispatcher = CommandDispatcher::new(id.clone(), transport, store.clone());
        let poller = PollerHandle::spawn(fetcher, store.clone(), config.update_interval());

        servers.insert(
            id,
            ServerEntry {
                client,
                store: store.clone(),
                dispatcher,
                poller,
                stale_threshold: monitor.stale_threshold,
            },
        );
        Ok(store)
    }

    pub async fn store(&self, id: &ServerId) -> Option<SnapshotStore> {
        self.servers.read().await.get(id).map(|e| e.store.clone())
    }

    /// Configured stale threshold of a server, for [`SnapshotStore::availability`].
    pub async fn stale_threshold(&self, id: &ServerId) -> Option<u32> {
        self.servers.read().await.get(id).map(|e| e.stale_threshold)
    }

    pub async fn server_ids(&self) -> Vec<ServerId> {
        let mut ids: Vec<ServerId> = self.servers.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Dispatches a command and, if PVE accepted it, schedules a refresh.
    ///
    /// The registry lock is released before the command goes out, so a slow
    /// server never blocks lookups, setup or teardown of the others.
    pub async fn dispatch(&self, request: &CommandRequest) -> ProxmoxResult<CommandOutcome> {
        let (dispatcher, refresh) = {
            let servers = self.servers.read().await;
            let entry = servers
                .get(&request.server)
                .ok_or_else(|| unknown(&request.server))?;
            (entry.dispatcher.clone(), entry.poller.refresh_signal())
        };
        let outcome = dispatcher.dispatch(request).await?;
        if matches!(outcome, CommandOutcome::Dispatched { .. }) {
            refresh.notify_one();
        }
        Ok(outcome)
    }

    /// Requests an immediate cycle for `id`.
    pub async fn refresh(&self, id: &ServerId) -> ProxmoxResult<()> {
        let servers = self.servers.read().await;
        servers.get(id).ok_or_else(|| unknown(id))?.poller.refresh();
        Ok(())
    }

    /// Stops polling `id` and closes its client.
    pub async fn teardown(&self, id: &ServerId) -> ProxmoxResult<()> {
        let entry = self
            .servers
            .write()
            .await
            .remove(id)
            .ok_or_else(|| unknown(id))?;
        shutdown(id, entry).await;
        Ok(())
    }

    pub async fn teardown_all(&self) {
        let entries: Vec<(ServerId, ServerEntry)> =
            self.servers.write().await.drain().collect();
        for (id, entry) in entries {
            shutdown(&id, entry).await;
        }
    }
}

async fn shutdown(id: &ServerId, entry: ServerEntry) {
    entry.poller.shutdown().await;
    entry.client.close().await;
    info!(server = %id, "server torn down");
}

fn duplicate(id: &ServerId) -> ProxmoxError {
    ProxmoxError::Configuration(format!("server '{}' is already configured", id))
}

fn unknown(id: &ServerId) -> ProxmoxError {
    ProxmoxError::Configuration(format!("server '{}' is not configured", id))
}
