//! Polls one server and prints every published snapshot.
//!
//! Reads `PROXMOX_HOST`, `PROXMOX_USERNAME` and either `PROXMOX_PASSWORD` or
//! `PROXMOX_TOKEN_NAME` + `PROXMOX_TOKEN_VALUE` from the environment or `.env`.

use leeca_proxmox_monitor::{MonitorConfig, ProxmoxResult, ServerOptions, ServerRegistry};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ProxmoxResult<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options = ServerOptions {
        host: env::var("PROXMOX_HOST").unwrap_or_else(|_| "192.168.1.182".to_string()),
        port: env::var("PROXMOX_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8006),
        username: env::var("PROXMOX_USERNAME").unwrap_or_else(|_| "root".to_string()),
        auth_method: None,
        password: env::var("PROXMOX_PASSWORD").ok(),
        token_name: env::var("PROXMOX_TOKEN_NAME").ok(),
        token_value: env::var("PROXMOX_TOKEN_VALUE").ok(),
        verify_ssl: false,
        update_interval: 10,
    };
    let config = options.into_config()?;
    let server = config.id().clone();

    let registry = ServerRegistry::new();
    let store = registry.setup(config, MonitorConfig::default()).await?;
    let mut updates = store.subscribe();

    for _ in 0..3 {
        if updates.changed().await.is_err() {
            break;
        }
        let Some(snapshot) = updates.borrow_and_update().clone() else {
            continue;
        };
        println!("== {} ({:?})", server, store.availability(3));
        for node in &snapshot.nodes {
            println!(
                "node {:<12} {:<8} cpu {:>5.1}%  mem {:>5.1}%  disk {:>5.1}%  load {:?} ({:?})",
                node.name,
                node.status.as_str(),
                node.cpu_percent,
                node.memory_percent,
                node.disk_percent,
                node.load_average.as_array(),
                node.load_source,
            );
        }
        for guest in &snapshot.guests {
            println!(
                "  {:<10} {:<20} {:<10} on {}",
                guest.key(),
                guest.name,
                guest.status.as_str(),
                guest.node
            );
        }
    }

    registry.teardown_all().await;
    Ok(())
}
