//! # onelease
//!
//! A single-lease DHCP server for point-to-point device links, with the
//! host-side gateway plumbing (interface addressing, forwarding, NAT) to
//! put the attached device on the internet.
//!
//! ## Features
//!
//! - DISCOVER/OFFER and REQUEST/ACK handshake with one fixed lease
//! - RFC 2131 packet framing with TLV options and magic cookie validation
//! - Broadcast-only replies, stateless and idempotent per packet
//! - Host network setup for NAT gateway operation (Linux)
//! - Async/await with Tokio
//!
//! ## Quick Start
//!
//! ```no_run
//! use onelease::{DhcpServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> onelease::Result<()> {
//!     let config = ServerConfig::load_or_create("config.json")?;
//!     let server = DhcpServer::new(config, Some("eth0"))?;
//!     server.run().await
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`ServerConfig`] - The fixed server/client binding and lease terms
//! - [`DhcpPacket`] - DHCP packet parsing and encoding
//! - [`DhcpOption`] - The TLV options carried in replies
//! - [`DhcpServer`] - The responder loop on UDP port 67
//! - [`netsetup`] - One-shot host network orchestration

pub mod config;
pub mod error;
pub mod netsetup;
pub mod options;
pub mod packet;
pub mod server;

pub use config::ServerConfig;
pub use error::{Error, Result};
pub use options::{DhcpOption, MessageType};
pub use packet::DhcpPacket;
pub use server::DhcpServer;
