use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use onelease::{netsetup, DhcpServer, Result, ServerConfig};

#[derive(Parser)]
#[command(name = "onelease")]
#[command(author, version, about = "A single-lease DHCP server and NAT gateway", long_about = None)]
struct Cli {
    /// Internet-facing (WAN) network interface, e.g. wlan0
    wan_interface: String,

    /// Client-facing (LAN) network interface, e.g. eth0
    lan_interface: String,

    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    netsetup::ensure_root()?;

    let config = ServerConfig::load_or_create(&cli.config)?;

    info!("WAN (internet): {}", cli.wan_interface);
    info!("LAN (client):   {}", cli.lan_interface);

    netsetup::configure_lan(&cli.lan_interface, &config).await?;
    netsetup::enable_forwarding().await?;
    netsetup::install_nat(&cli.wan_interface, &cli.lan_interface).await?;

    let server = DhcpServer::new(config, Some(&cli.lan_interface))?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping server...");
            Ok(())
        }
    }
}
