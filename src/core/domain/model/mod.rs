pub mod command;
pub mod credential;
pub mod guest_record;
pub mod node_record;
pub mod proxmox_auth;
pub mod pve_version;
pub mod server_config;
pub mod snapshot;
pub mod storage_record;
