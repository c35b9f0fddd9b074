//! The responder loop: receive, classify, reply.
//!
//! A single task owns the UDP socket for the lifetime of the process and
//! handles each datagram to completion before the next receive. There is
//! no per-packet concurrency and no state beyond the configuration, which
//! is what makes the server idempotent: replaying a REQUEST produces a
//! byte-identical ACK.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::options::MessageType;
use crate::packet::{DhcpPacket, BOOTREQUEST};

const DHCP_SERVER_PORT: u16 = 67;
const DHCP_CLIENT_PORT: u16 = 68;
const RECV_BUFFER_SIZE: usize = 1500;

/// A single-lease DHCP server.
///
/// Owns the UDP socket and answers DISCOVER with OFFER and REQUEST with
/// ACK, always carrying the one fixed binding from [`ServerConfig`].
/// Every other message type is ignored.
pub struct DhcpServer {
    config: ServerConfig,
    socket: UdpSocket,
}

impl DhcpServer {
    /// Binds the server socket and prepares the responder.
    ///
    /// `lan_interface` restricts the socket to the client-facing link
    /// (SO_BINDTODEVICE, Linux only).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Socket`] if the socket cannot be created or bound
    /// (port 67 in use, insufficient privilege). This is fatal at startup;
    /// there is no retry.
    pub fn new(config: ServerConfig, lan_interface: Option<&str>) -> Result<Self> {
        let socket = Self::create_socket(&config, lan_interface)?;

        info!(
            "DHCP server starting on {}:{}",
            config.server_ip, DHCP_SERVER_PORT
        );
        info!(
            "Fixed lease: {} for {} seconds",
            config.client_ip, config.lease_time_seconds
        );

        Ok(Self { config, socket })
    }

    fn create_socket(config: &ServerConfig, lan_interface: Option<&str>) -> Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(|error| Error::Socket(format!("Failed to create socket: {}", error)))?;

        socket
            .set_reuse_address(true)
            .map_err(|error| Error::Socket(format!("Failed to set SO_REUSEADDR: {}", error)))?;

        socket
            .set_broadcast(true)
            .map_err(|error| Error::Socket(format!("Failed to set SO_BROADCAST: {}", error)))?;

        socket
            .set_nonblocking(true)
            .map_err(|error| Error::Socket(format!("Failed to set non-blocking: {}", error)))?;

        if let Some(interface) = lan_interface {
            #[cfg(target_os = "linux")]
            {
                socket
                    .bind_device(Some(interface.as_bytes()))
                    .map_err(|error| {
                        Error::Socket(format!(
                            "Failed to bind to device {}: {}",
                            interface, error
                        ))
                    })?;
            }
            #[cfg(not(target_os = "linux"))]
            {
                warn!(
                    "Binding to interface {} is only supported on Linux and will be ignored",
                    interface
                );
            }
        }

        let bind_addr = SocketAddrV4::new(config.server_ip, DHCP_SERVER_PORT);
        socket.bind(&bind_addr.into()).map_err(|error| {
            Error::Socket(format!("Failed to bind to {}: {}", bind_addr, error))
        })?;

        let std_socket: std::net::UdpSocket = socket.into();
        let tokio_socket = UdpSocket::from_std(std_socket).map_err(|error| {
            Error::Socket(format!("Failed to convert to tokio socket: {}", error))
        })?;

        Ok(tokio_socket)
    }

    /// Runs the responder loop forever.
    ///
    /// Blocks on datagram receipt and handles each packet fully before the
    /// next receive. Per-packet errors are logged and skipped; the loop has
    /// no internal exit condition.
    pub async fn run(&self) -> Result<()> {
        let mut buffer = [0u8; RECV_BUFFER_SIZE];

        info!("DHCP server ready and listening");

        loop {
            match self.socket.recv_from(&mut buffer).await {
                Ok((size, source)) => {
                    if let Err(packet_error) = self.handle_datagram(&buffer[..size], source).await
                    {
                        warn!("Dropping packet from {}: {}", source, packet_error);
                    }
                }
                Err(recv_error) => {
                    error!("Error receiving packet: {}", recv_error);
                }
            }
        }
    }

    async fn handle_datagram(&self, data: &[u8], source: SocketAddr) -> Result<()> {
        let packet = DhcpPacket::parse(data)?;

        if packet.op != BOOTREQUEST {
            debug!("Ignoring non-BOOTREQUEST packet from {}", source);
            return Ok(());
        }

        let mac = packet.format_mac();

        match packet.message_type() {
            Some(MessageType::Discover) => {
                info!("DISCOVER from {} ({})", mac, source);
                self.handle_discover(&packet).await
            }
            Some(MessageType::Request) => {
                info!("REQUEST from {} ({})", mac, source);
                self.handle_request(&packet).await
            }
            Some(other) => {
                debug!("Ignoring {} from {}", other, mac);
                Ok(())
            }
            None => {
                debug!("No message type in packet from {}, ignoring", mac);
                Ok(())
            }
        }
    }

    async fn handle_discover(&self, packet: &DhcpPacket) -> Result<()> {
        let offer = DhcpPacket::create_reply(packet, MessageType::Offer, &self.config);
        self.broadcast_reply(&offer).await?;

        info!("OFFER {} to {}", self.config.client_ip, packet.format_mac());

        Ok(())
    }

    async fn handle_request(&self, packet: &DhcpPacket) -> Result<()> {
        let ack = DhcpPacket::create_reply(packet, MessageType::Ack, &self.config);
        self.broadcast_reply(&ack).await?;

        info!("ACK {} to {}", self.config.client_ip, packet.format_mac());

        Ok(())
    }

    /// Sends a reply to the link-local broadcast address.
    ///
    /// Replies are never unicast: during DISCOVER the client has no bound
    /// address yet, and REQUEST is kept uniform with DISCOVER.
    async fn broadcast_reply(&self, reply: &DhcpPacket) -> Result<()> {
        let encoded = reply.encode();
        let destination =
            SocketAddr::from(SocketAddrV4::new(Ipv4Addr::BROADCAST, DHCP_CLIENT_PORT));

        self.socket.send_to(&encoded, destination).await?;

        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{DhcpOption, OptionCode};
    use crate::packet::{HLEN_ETHERNET, HTYPE_ETHERNET};

    const DHCP_MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];

    #[test]
    fn test_constants() {
        assert_eq!(DHCP_SERVER_PORT, 67);
        assert_eq!(DHCP_CLIENT_PORT, 68);
        assert_eq!(RECV_BUFFER_SIZE, 1500);
    }

    fn create_dhcp_packet(message_type: MessageType, mac: [u8; 6], xid: u32) -> Vec<u8> {
        let mut packet = vec![0u8; 300];

        packet[0] = BOOTREQUEST;
        packet[1] = HTYPE_ETHERNET;
        packet[2] = HLEN_ETHERNET;
        packet[4..8].copy_from_slice(&xid.to_be_bytes());
        packet[10..12].copy_from_slice(&0x8000u16.to_be_bytes());
        packet[28..34].copy_from_slice(&mac);
        packet[236..240].copy_from_slice(&DHCP_MAGIC_COOKIE);

        packet[240] = OptionCode::MessageType as u8;
        packet[241] = 1;
        packet[242] = message_type as u8;
        packet[243] = OptionCode::End as u8;
        packet
    }

    async fn create_test_server() -> DhcpServer {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        DhcpServer {
            config: ServerConfig::default(),
            socket,
        }
    }

    fn is_network_error(err: &Error) -> bool {
        // Broadcast sends are not always permitted in test environments.
        matches!(err, Error::Io(_))
    }

    #[tokio::test]
    async fn test_discover_produces_offer() {
        let server = create_test_server().await;

        let mac = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01];
        let data = create_dhcp_packet(MessageType::Discover, mac, 0x12345678);
        let source: SocketAddr = "0.0.0.0:68".parse().unwrap();

        let result = server.handle_datagram(&data, source).await;
        assert!(result.is_ok() || result.as_ref().err().map(is_network_error).unwrap_or(false));
    }

    #[tokio::test]
    async fn test_request_produces_ack() {
        let server = create_test_server().await;

        let mac = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x02];
        let data = create_dhcp_packet(MessageType::Request, mac, 0xCAFEBABE);
        let source: SocketAddr = "0.0.0.0:68".parse().unwrap();

        let result = server.handle_datagram(&data, source).await;
        assert!(result.is_ok() || result.as_ref().err().map(is_network_error).unwrap_or(false));
    }

    #[tokio::test]
    async fn test_other_message_types_ignored() {
        let server = create_test_server().await;
        let source: SocketAddr = "0.0.0.0:68".parse().unwrap();
        let mac = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x03];

        for message_type in [
            MessageType::Decline,
            MessageType::Release,
            MessageType::Inform,
            MessageType::Offer,
            MessageType::Ack,
            MessageType::Nak,
        ] {
            let data = create_dhcp_packet(message_type, mac, 0x1111);
            // Ignored without touching the socket, so this can never be a
            // network error.
            assert!(server.handle_datagram(&data, source).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_missing_message_type_ignored() {
        let server = create_test_server().await;
        let source: SocketAddr = "0.0.0.0:68".parse().unwrap();

        let mut data = create_dhcp_packet(MessageType::Discover, [0; 6], 0x2222);
        // Strip option 53, leaving only the End marker.
        data[240] = OptionCode::End as u8;

        assert!(server.handle_datagram(&data, source).await.is_ok());
    }

    #[tokio::test]
    async fn test_bootreply_op_ignored() {
        let server = create_test_server().await;
        let source: SocketAddr = "0.0.0.0:68".parse().unwrap();

        let mut data = create_dhcp_packet(MessageType::Discover, [0; 6], 0x3333);
        data[0] = 2;

        assert!(server.handle_datagram(&data, source).await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_datagram_is_error() {
        let server = create_test_server().await;
        let source: SocketAddr = "0.0.0.0:68".parse().unwrap();

        let result = server.handle_datagram(&[0u8; 10], source).await;
        assert!(matches!(result, Err(Error::InvalidPacket(_))));

        let mut bad_cookie = create_dhcp_packet(MessageType::Discover, [0; 6], 0x4444);
        bad_cookie[236..240].copy_from_slice(&[1, 2, 3, 4]);
        let result = server.handle_datagram(&bad_cookie, source).await;
        assert!(matches!(result, Err(Error::InvalidPacket(_))));
    }

    #[test]
    fn test_replies_are_idempotent() {
        let config = ServerConfig::default();
        let mac = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];
        let data = create_dhcp_packet(MessageType::Request, mac, 0xFEEDFACE);
        let request = DhcpPacket::parse(&data).unwrap();

        let first = DhcpPacket::create_reply(&request, MessageType::Ack, &config).encode();
        let second = DhcpPacket::create_reply(&request, MessageType::Ack, &config).encode();

        assert_eq!(first, second);
    }

    #[test]
    fn test_offer_and_ack_share_network_options() {
        let config = ServerConfig::default();
        let mac = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];
        let data = create_dhcp_packet(MessageType::Discover, mac, 0x5555);
        let request = DhcpPacket::parse(&data).unwrap();

        let offer = DhcpPacket::create_reply(&request, MessageType::Offer, &config);
        let ack = DhcpPacket::create_reply(&request, MessageType::Ack, &config);

        let network_options = |packet: &DhcpPacket| -> Vec<DhcpOption> {
            packet
                .options
                .iter()
                .filter(|opt| opt.option_code() != OptionCode::MessageType as u8)
                .cloned()
                .collect()
        };

        assert_eq!(network_options(&offer), network_options(&ack));
    }
}
