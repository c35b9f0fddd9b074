use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;

use crate::error::{Error, Result};

/// Immutable server configuration, fixed at startup.
///
/// The single client/IP binding lives here: there is no lease store, so
/// the configuration *is* the lease. Loaded from a JSON file via
/// [`load_or_create`](Self::load_or_create) and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The server's own address on the client-facing interface.
    pub server_ip: Ipv4Addr,
    /// The one address handed out, to the one client.
    pub client_ip: Ipv4Addr,
    /// Subnet mask for the point-to-point link.
    pub subnet_mask: Ipv4Addr,
    /// Default gateway offered to the client.
    pub router: Ipv4Addr,
    /// DNS server offered to the client.
    pub dns_server: Ipv4Addr,
    /// Lease duration in seconds.
    pub lease_time_seconds: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_ip: Ipv4Addr::new(192, 168, 50, 1),
            client_ip: Ipv4Addr::new(192, 168, 50, 2),
            subnet_mask: Ipv4Addr::new(255, 255, 255, 0),
            router: Ipv4Addr::new(192, 168, 50, 1),
            dns_server: Ipv4Addr::new(8, 8, 8, 8),
            lease_time_seconds: 86400,
        }
    }
}

impl ServerConfig {
    /// Loads the configuration from `path`, or writes the defaults there
    /// and returns them if the file doesn't exist yet.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: ServerConfig = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = ServerConfig::default();
            config.save(path)?;
            Ok(config)
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.lease_time_seconds == 0 {
            return Err(Error::InvalidConfig(
                "lease_time_seconds must be greater than 0".to_string(),
            ));
        }

        if !is_contiguous_mask(self.subnet_mask) {
            return Err(Error::InvalidConfig(format!(
                "subnet_mask {} is not a valid netmask",
                self.subnet_mask
            )));
        }

        if self.client_ip == self.server_ip {
            return Err(Error::InvalidConfig(
                "client_ip must differ from server_ip".to_string(),
            ));
        }

        if !self.same_subnet(self.client_ip) {
            return Err(Error::InvalidConfig(format!(
                "client_ip {} is not in the server's subnet",
                self.client_ip
            )));
        }

        if !self.same_subnet(self.router) {
            return Err(Error::InvalidConfig(format!(
                "router {} is not in the server's subnet",
                self.router
            )));
        }

        Ok(())
    }

    /// Prefix length of the configured subnet mask (e.g. 24 for
    /// 255.255.255.0). Used to derive the CIDR address assigned to the
    /// client-facing interface.
    pub fn prefix_len(&self) -> u32 {
        u32::from(self.subnet_mask).count_ones()
    }

    fn same_subnet(&self, addr: Ipv4Addr) -> bool {
        let mask = u32::from(self.subnet_mask);
        u32::from(addr) & mask == u32::from(self.server_ip) & mask
    }
}

fn is_contiguous_mask(mask: Ipv4Addr) -> bool {
    let bits = u32::from(mask);
    bits != 0 && (!bits).wrapping_add(1) & !bits == 0
}
