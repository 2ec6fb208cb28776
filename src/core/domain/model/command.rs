//! Control commands issued against guests.

use crate::core::domain::model::{
    guest_record::{GuestKind, GuestStatus, guest_path},
    server_config::ServerId,
};
use serde::{Deserialize, Serialize};

/// A lifecycle action on a guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestAction {
    Start,
    Stop,
    Shutdown,
    Reboot,
    Suspend,
    Resume,
    /// Hard reset; QEMU only.
    Reset,
}

impl GuestAction {
    pub const ALL: [GuestAction; 7] = [
        GuestAction::Start,
        GuestAction::Stop,
        GuestAction::Shutdown,
        GuestAction::Reboot,
        GuestAction::Suspend,
        GuestAction::Resume,
        GuestAction::Reset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GuestAction::Start => "start",
            GuestAction::Stop => "stop",
            GuestAction::Shutdown => "shutdown",
            GuestAction::Reboot => "reboot",
            GuestAction::Suspend => "suspend",
            GuestAction::Resume => "resume",
            GuestAction::Reset => "reset",
        }
    }

    /// Suffix appended to the guest path, e.g. `/status/start`.
    pub fn path_suffix(&self) -> String {
        format!("/status/{}", self.as_str())
    }

    /// Whether the API offers this action for the guest kind at all.
    pub fn is_supported_by(&self, kind: GuestKind) -> bool {
        !matches!((self, kind), (GuestAction::Reset, GuestKind::Lxc))
    }

    /// Whether the action is a meaningful transition from `status`.
    ///
    /// An `unknown` status offers everything; PVE decides.
    pub fn is_offered(&self, kind: GuestKind, status: GuestStatus) -> bool {
        if !self.is_supported_by(kind) {
            return false;
        }
        match status {
            GuestStatus::Unknown => true,
            GuestStatus::Stopped => matches!(self, GuestAction::Start),
            GuestStatus::Running => matches!(
                self,
                GuestAction::Stop
                    | GuestAction::Shutdown
                    | GuestAction::Reboot
                    | GuestAction::Suspend
                    | GuestAction::Reset
            ),
            GuestStatus::Paused | GuestStatus::Suspended => matches!(self, GuestAction::Resume),
        }
    }

    /// All actions offered for a guest in the given state.
    pub fn offered_for(kind: GuestKind, status: GuestStatus) -> Vec<GuestAction> {
        Self::ALL
            .into_iter()
            .filter(|action| action.is_offered(kind, status))
            .collect()
    }
}

impl std::fmt::Display for GuestAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A one-shot request to act on a guest. Evaluated once, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub server: ServerId,
    pub kind: GuestKind,
    pub vmid: u32,
    pub node: String,
    pub action: GuestAction,
}

impl CommandRequest {
    /// The POST path, e.g. `/nodes/pve1/qemu/100/status/start`.
    pub fn endpoint(&self) -> String {
        format!(
            "{}{}",
            guest_path(&self.node, self.kind, self.vmid),
            self.action.path_suffix()
        )
    }
}

/// Result of a dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// PVE accepted the request; the task is not followed to completion.
    Dispatched { task_id: String },
    /// Refused client-side from the last known status; nothing was sent.
    Skipped { reason: String },
}
