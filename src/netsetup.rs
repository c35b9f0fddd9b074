//! Host network orchestration, run once before the responder loop.
//!
//! Assigns the server's address to the client-facing interface, brings it
//! up, enables IP forwarding, and installs the NAT rules that let the
//! client reach the internet through the WAN interface. Everything here is
//! a shell-level side effect (`ip`, `sysctl`, `iptables`); the protocol
//! core never touches host configuration.

use tokio::process::Command;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{Error, Result};

/// Fails unless running with an effective UID of 0.
///
/// Required before any side effect: port 67 is privileged and the
/// interface/NAT commands alter host configuration.
pub fn ensure_root() -> Result<()> {
    // SAFETY: geteuid has no preconditions and cannot fail.
    let euid = unsafe { libc::geteuid() };

    if euid != 0 {
        return Err(Error::Netsetup(
            "must run as root to bind port 67 and configure interfaces".to_string(),
        ));
    }

    Ok(())
}

/// Assigns the configured server address to `interface` and brings the
/// link up.
pub async fn configure_lan(interface: &str, config: &ServerConfig) -> Result<()> {
    let address = format!("{}/{}", config.server_ip, config.prefix_len());

    info!("Assigning {} to {}", address, interface);

    run_command("ip", &["addr", "flush", "dev", interface]).await?;
    run_command("ip", &["addr", "add", &address, "dev", interface]).await?;
    run_command("ip", &["link", "set", interface, "up"]).await?;

    Ok(())
}

/// Enables IPv4 forwarding on the host.
pub async fn enable_forwarding() -> Result<()> {
    info!("Enabling IP forwarding");

    run_command("sysctl", &["-w", "net.ipv4.ip_forward=1"]).await
}

/// Installs the masquerade and forward rules between the LAN and WAN
/// interfaces.
pub async fn install_nat(wan_interface: &str, lan_interface: &str) -> Result<()> {
    info!(
        "Configuring NAT: {} -> {}",
        lan_interface, wan_interface
    );

    run_command(
        "iptables",
        &[
            "-t",
            "nat",
            "-A",
            "POSTROUTING",
            "-o",
            wan_interface,
            "-j",
            "MASQUERADE",
        ],
    )
    .await?;

    run_command(
        "iptables",
        &[
            "-A",
            "FORWARD",
            "-i",
            wan_interface,
            "-o",
            lan_interface,
            "-m",
            "state",
            "--state",
            "RELATED,ESTABLISHED",
            "-j",
            "ACCEPT",
        ],
    )
    .await?;

    run_command(
        "iptables",
        &[
            "-A", "FORWARD", "-i", lan_interface, "-o", wan_interface, "-j", "ACCEPT",
        ],
    )
    .await?;

    Ok(())
}

async fn run_command(program: &str, args: &[&str]) -> Result<()> {
    let status = Command::new(program)
        .args(args)
        .status()
        .await
        .map_err(|error| Error::Netsetup(format!("failed to run {}: {}", program, error)))?;

    if !status.success() {
        return Err(Error::Netsetup(format!(
            "{} {} exited with {}",
            program,
            args.join(" "),
            status
        )));
    }

    Ok(())
}
