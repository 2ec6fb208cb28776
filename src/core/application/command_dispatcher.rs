//! Guarded guest lifecycle commands.

use crate::core::{
    application::snapshot_store::SnapshotStore,
    domain::{
        error::{ProxmoxError, ProxmoxResult, ValidationError},
        model::{
            command::{CommandOutcome, CommandRequest},
            server_config::ServerId,
        },
    },
    infrastructure::api_client::PveTransport,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sends guest lifecycle commands for one server.
///
/// Shares the server's transport with its poller. Commands are guarded
/// against the last known guest status, POSTed once, and the PVE task id
/// is returned without following the task. Cloning is cheap and clones
/// share the transport and store.
#[derive(Clone)]
pub struct CommandDispatcher {
    server: ServerId,
    transport: Arc<dyn PveTransport>,
    store: SnapshotStore,
}

impl CommandDispatcher {
    pub fn new(server: ServerId, transport: Arc<dyn PveTransport>, store: SnapshotStore) -> Self {
        Self {
            server,
            transport,
            store,
        }
    }

    /// Dispatches `request`.
    ///
    /// Returns [`CommandOutcome::Skipped`] without any call when the last
    /// snapshot shows the action is not a valid transition. Guests absent
    /// from the snapshot are dispatched unguarded.
    ///
    /// # Errors
    /// Validation errors for requests that can never succeed; otherwise the
    /// transport's classified error, unretried.
    pub async fn dispatch(&self, request: &CommandRequest) -> ProxmoxResult<CommandOutcome> {
        self.validate(request)?;

        if let Some(reason) = self.refusal(request) {
            debug!(server = %self.server, kind = %request.kind, vmid = request.vmid, action = %request.action, %reason, "command skipped");
            return Ok(CommandOutcome::Skipped { reason });
        }

        let endpoint = request.endpoint();
        let data = self
            .transport
            .post(&endpoint, &json!({}))
            .await
            .inspect_err(|e| {
                warn!(server = %self.server, kind = %request.kind, vmid = request.vmid, action = %request.action, error = %e, "command failed");
            })?;

        let task_id = match data {
            Value::String(upid) => upid,
            other => {
                return Err(ProxmoxError::Unexpected(format!(
                    "{} returned no task id: {}",
                    endpoint, other
                )));
            }
        };
        info!(server = %self.server, kind = %request.kind, vmid = request.vmid, action = %request.action, task = %task_id, "command dispatched");
        Ok(CommandOutcome::Dispatched { task_id })
    }

    fn validate(&self, request: &CommandRequest) -> Result<(), ValidationError> {
        if request.server != self.server {
            return Err(ValidationError::Field {
                field: "server".to_string(),
                message: format!(
                    "request targets '{}' but this dispatcher serves '{}'",
                    request.server, self.server
                ),
            });
        }
        if request.node.trim().is_empty() {
            return Err(ValidationError::Field {
                field: "node".to_string(),
                message: "Owning node is required".to_string(),
            });
        }
        if !request.action.is_supported_by(request.kind) {
            return Err(ValidationError::ConstraintViolation(format!(
                "'{}' is not available for {} guests",
                request.action, request.kind
            )));
        }
        Ok(())
    }

    fn refusal(&self, request: &CommandRequest) -> Option<String> {
        let snapshot = self.store.latest()?;
        let guest = snapshot.guest(request.kind, request.vmid)?;
        (!request.action.is_offered(guest.kind, guest.status)).then(|| {
            format!(
                "{} is {}; '{}' does not apply",
                guest.key(),
                guest.status.as_str(),
                request.action
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::model::{
        command::GuestAction,
        guest_record::{GuestKind, GuestRecord, GuestStatus},
        snapshot::Snapshot,
    };
    use crate::core::infrastructure::api_client::MockPveTransport;
    use std::time::UNIX_EPOCH;

    fn guest(kind: GuestKind, vmid: u32, status: GuestStatus) -> GuestRecord {
        GuestRecord {
            kind,
            vmid,
            name: format!("guest-{}", vmid),
            node: "pve1".to_string(),
            status,
            cpu: 0.0,
            cpu_percent: 0.0,
            memory_used: 0,
            memory_total: 0,
            memory_percent: 0.0,
            disk_used: 0,
            disk_total: 0,
            disk_percent: 0.0,
            disk_free_percent: 0.0,
            uptime: 0,
            tags: vec![],
            template: false,
        }
    }

    fn store_with(guests: Vec<GuestRecord>) -> SnapshotStore {
        let store = SnapshotStore::new();
        store.publish(Snapshot {
            server: ServerId::new("pve:8006"),
            taken_at: UNIX_EPOCH,
            nodes: vec![],
            guests,
            storage: vec![],
        });
        store
    }

    fn request(kind: GuestKind, vmid: u32, action: GuestAction) -> CommandRequest {
        CommandRequest {
            server: ServerId::new("pve:8006"),
            kind,
            vmid,
            node: "pve1".to_string(),
            action,
        }
    }

    fn dispatcher(transport: MockPveTransport, store: SnapshotStore) -> CommandDispatcher {
        CommandDispatcher::new(ServerId::new("pve:8006"), Arc::new(transport), store)
    }

    #[tokio::test]
    async fn test_dispatch_returns_task_id() {
        let mut transport = MockPveTransport::new();
        transport
            .expect_post()
            .withf(|path, _| path == "/nodes/pve1/lxc/101/status/shutdown")
            .times(1)
            .returning(|_, _| Ok(json!("UPID:pve1:00001234:0000ABCD:vzshutdown:101:root@pam:")));

        let store = store_with(vec![guest(GuestKind::Lxc, 101, GuestStatus::Running)]);
        let outcome = dispatcher(transport, store)
            .dispatch(&request(GuestKind::Lxc, 101, GuestAction::Shutdown))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CommandOutcome::Dispatched {
                task_id: "UPID:pve1:00001234:0000ABCD:vzshutdown:101:root@pam:".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_stop_on_stopped_guest_is_skipped() {
        let mut transport = MockPveTransport::new();
        transport.expect_post().never();

        let store = store_with(vec![guest(GuestKind::Qemu, 100, GuestStatus::Stopped)]);
        let outcome = dispatcher(transport, store)
            .dispatch(&request(GuestKind::Qemu, 100, GuestAction::Stop))
            .await
            .unwrap();
        assert!(matches!(outcome, CommandOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_unknown_guest_dispatches_unguarded() {
        let mut transport = MockPveTransport::new();
        transport
            .expect_post()
            .withf(|path, _| path == "/nodes/pve1/qemu/300/status/start")
            .times(1)
            .returning(|_, _| Ok(json!("UPID:pve1:1:2:qmstart:300:root@pam:")));

        let outcome = dispatcher(transport, SnapshotStore::new())
            .dispatch(&request(GuestKind::Qemu, 300, GuestAction::Start))
            .await
            .unwrap();
        assert!(matches!(outcome, CommandOutcome::Dispatched { .. }));
    }

    #[tokio::test]
    async fn test_reset_for_container_is_rejected_before_network() {
        let mut transport = MockPveTransport::new();
        transport.expect_post().never();

        let result = dispatcher(transport, SnapshotStore::new())
            .dispatch(&request(GuestKind::Lxc, 101, GuestAction::Reset))
            .await;
        assert!(matches!(result, Err(ProxmoxError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_transport_error_surfaces_unretried() {
        let mut transport = MockPveTransport::new();
        transport
            .expect_post()
            .times(1)
            .returning(|_, _| Err(ProxmoxError::Authentication("401".to_string())));

        let result = dispatcher(transport, SnapshotStore::new())
            .dispatch(&request(GuestKind::Qemu, 100, GuestAction::Reboot))
            .await;
        assert!(matches!(result, Err(ProxmoxError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_request_for_other_server_is_rejected() {
        let mut transport = MockPveTransport::new();
        transport.expect_post().never();

        let mut foreign = request(GuestKind::Qemu, 100, GuestAction::Start);
        foreign.server = ServerId::new("other:8006");
        let result = dispatcher(transport, SnapshotStore::new())
            .dispatch(&foreign)
            .await;
        assert!(result.unwrap_err().is_configuration());
    }

    #[tokio::test]
    async fn test_missing_task_id_is_unexpected() {
        let mut transport = MockPveTransport::new();
        transport
            .expect_post()
            .returning(|_, _| Ok(Value::Null));

        let result = dispatcher(transport, SnapshotStore::new())
            .dispatch(&request(GuestKind::Qemu, 100, GuestAction::Resume))
            .await;
        assert!(matches!(result, Err(ProxmoxError::Unexpected(_))));
    }
}
