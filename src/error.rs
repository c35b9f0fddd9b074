//! Error types for the DHCP server.
//!
//! All fallible operations in this crate return [`Result<T>`], which uses
//! the [`Error`] enum for error variants.

/// Errors that can occur during server operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File system or network I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (config file).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed DHCP packet received.
    ///
    /// This includes packets that are too short, have invalid magic cookies,
    /// invalid option lengths, or other protocol violations. The responder
    /// loop drops such packets and continues.
    #[error("Invalid DHCP packet: {0}")]
    InvalidPacket(String),

    /// Invalid server configuration.
    ///
    /// Returned by [`ServerConfig::validate`](crate::ServerConfig::validate)
    /// when the configuration contains invalid values (e.g., a client
    /// address outside the server's subnet).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Socket creation or configuration error.
    ///
    /// Typically occurs when binding to port 67 without root privileges,
    /// or when the specified network interface doesn't exist. Fatal at
    /// startup.
    #[error("Socket error: {0}")]
    Socket(String),

    /// Host network setup failure.
    ///
    /// One of the interface-addressing, forwarding, or NAT commands failed
    /// before the responder loop started. Fatal at startup.
    #[error("Network setup failed: {0}")]
    Netsetup(String),
}

/// A specialized Result type for DHCP operations.
pub type Result<T> = std::result::Result<T, Error>;
