//! Sends one lifecycle command to a guest.
//!
//! Usage: `cargo run --example guest_control -- <node> <qemu|lxc> <vmid> <action>`
//! with the same environment variables as `poll_server`.

use leeca_proxmox_monitor::{
    CommandOutcome, CommandRequest, GuestAction, GuestKind, MonitorConfig, ProxmoxError,
    ProxmoxResult, ServerConfig, ServerRegistry,
};
use std::env;
use tracing_subscriber::EnvFilter;

fn parse_kind(raw: &str) -> ProxmoxResult<GuestKind> {
    match raw {
        "qemu" | "vm" => Ok(GuestKind::Qemu),
        "lxc" | "ct" => Ok(GuestKind::Lxc),
        other => Err(ProxmoxError::Configuration(format!("unknown guest kind '{}'", other))),
    }
}

fn parse_action(raw: &str) -> ProxmoxResult<GuestAction> {
    GuestAction::ALL
        .into_iter()
        .find(|action| action.as_str() == raw)
        .ok_or_else(|| ProxmoxError::Configuration(format!("unknown action '{}'", raw)))
}

#[tokio::main]
async fn main() -> ProxmoxResult<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let [node, kind, vmid, action] = args.as_slice() else {
        return Err(ProxmoxError::Configuration(
            "usage: guest_control <node> <qemu|lxc> <vmid> <action>".to_string(),
        ));
    };
    let vmid: u32 = vmid
        .parse()
        .map_err(|_| ProxmoxError::Configuration(format!("invalid vmid '{}'", vmid)))?;

    let mut builder = ServerConfig::builder()
        .host(env::var("PROXMOX_HOST").unwrap_or_else(|_| "192.168.1.182".to_string()))
        .username(env::var("PROXMOX_USERNAME").unwrap_or_else(|_| "root".to_string()))
        .verify_ssl(false);
    if let Ok(password) = env::var("PROXMOX_PASSWORD") {
        builder = builder.password(password);
    }
    if let (Ok(name), Ok(value)) = (env::var("PROXMOX_TOKEN_NAME"), env::var("PROXMOX_TOKEN_VALUE")) {
        builder = builder.token(name, value);
    }
    let config = builder.build()?;
    let server = config.id().clone();

    let registry = ServerRegistry::new();
    let store = registry.setup(config, MonitorConfig::default()).await?;
    store.subscribe().wait_for(Option::is_some).await.ok();

    let request = CommandRequest {
        server,
        kind: parse_kind(kind)?,
        vmid,
        node: node.clone(),
        action: parse_action(action)?,
    };
    match registry.dispatch(&request).await? {
        CommandOutcome::Dispatched { task_id } => println!("dispatched: {}", task_id),
        CommandOutcome::Skipped { reason } => println!("skipped: {}", reason),
    }

    registry.teardown_all().await;
    Ok(())
}
