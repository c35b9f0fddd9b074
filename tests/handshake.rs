//! End-to-end handshake scenarios: DISCOVER -> OFFER and REQUEST -> ACK
//! with the lease configuration checked down to the wire bytes.

use std::net::Ipv4Addr;

use onelease::{DhcpOption, DhcpPacket, MessageType, ServerConfig};

const DHCP_MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];

fn gateway_config() -> ServerConfig {
    ServerConfig {
        server_ip: Ipv4Addr::new(192, 168, 50, 1),
        client_ip: Ipv4Addr::new(192, 168, 50, 2),
        subnet_mask: Ipv4Addr::new(255, 255, 255, 0),
        router: Ipv4Addr::new(192, 168, 50, 1),
        dns_server: Ipv4Addr::new(8, 8, 8, 8),
        lease_time_seconds: 86400,
    }
}

fn client_packet(message_type: MessageType, mac: [u8; 6], xid: u32) -> Vec<u8> {
    let mut packet = vec![0u8; 300];

    packet[0] = 1;
    packet[1] = 1;
    packet[2] = 6;
    packet[4..8].copy_from_slice(&xid.to_be_bytes());
    packet[10..12].copy_from_slice(&0x8000u16.to_be_bytes());
    packet[28..34].copy_from_slice(&mac);
    packet[236..240].copy_from_slice(&DHCP_MAGIC_COOKIE);

    packet[240] = 53;
    packet[241] = 1;
    packet[242] = message_type as u8;
    packet[243] = 255;
    packet
}

/// The canonical options region for a reply with the given message type:
/// (53) message type, (1) subnet mask, (3) router, (6) DNS, (51) lease
/// time, (54) server identifier, end marker.
fn expected_options(message_type: u8) -> Vec<u8> {
    vec![
        53, 1, message_type, // message type
        1, 4, 255, 255, 255, 0, // subnet mask
        3, 4, 192, 168, 50, 1, // router
        6, 4, 8, 8, 8, 8, // DNS server
        51, 4, 0, 1, 0x51, 0x80, // lease time: 86400 seconds
        54, 4, 192, 168, 50, 1, // server identifier
        255, // end
    ]
}

#[test]
fn discover_produces_expected_offer_bytes() {
    let config = gateway_config();
    let mac = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];

    let discover = DhcpPacket::parse(&client_packet(MessageType::Discover, mac, 0x12345678))
        .unwrap();
    let offer = DhcpPacket::create_reply(&discover, MessageType::Offer, &config).encode();

    assert_eq!(offer[0], 2);
    assert_eq!(&offer[4..8], &0x12345678u32.to_be_bytes());
    assert_eq!(&offer[16..20], &[192, 168, 50, 2]);
    assert_eq!(&offer[20..24], &[192, 168, 50, 1]);
    assert_eq!(&offer[28..34], &mac);
    assert_eq!(&offer[34..44], &[0u8; 10]);
    assert_eq!(&offer[236..240], &DHCP_MAGIC_COOKIE);

    let options = expected_options(2);
    assert_eq!(&offer[240..240 + options.len()], &options[..]);
}

#[test]
fn request_produces_expected_ack_bytes() {
    let config = gateway_config();
    let mac = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];

    let request =
        DhcpPacket::parse(&client_packet(MessageType::Request, mac, 0xABCD0123)).unwrap();
    let ack = DhcpPacket::create_reply(&request, MessageType::Ack, &config).encode();

    assert_eq!(ack[0], 2);
    assert_eq!(&ack[4..8], &0xABCD0123u32.to_be_bytes());
    assert_eq!(&ack[16..20], &[192, 168, 50, 2]);
    assert_eq!(&ack[20..24], &[192, 168, 50, 1]);

    let options = expected_options(5);
    assert_eq!(&ack[240..240 + options.len()], &options[..]);
}

#[test]
fn offer_and_ack_carry_identical_lease_parameters() {
    let config = gateway_config();
    let mac = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];

    let discover =
        DhcpPacket::parse(&client_packet(MessageType::Discover, mac, 0x1000)).unwrap();
    let request = DhcpPacket::parse(&client_packet(MessageType::Request, mac, 0x1000)).unwrap();

    let offer = DhcpPacket::create_reply(&discover, MessageType::Offer, &config).encode();
    let ack = DhcpPacket::create_reply(&request, MessageType::Ack, &config).encode();

    // Everything except the message-type payload is identical.
    assert_eq!(&offer[..242], &ack[..242]);
    assert_eq!(offer[242], 2);
    assert_eq!(ack[242], 5);
    assert_eq!(&offer[243..], &ack[243..]);
}

#[test]
fn replayed_request_produces_byte_identical_acks() {
    let config = gateway_config();
    let data = client_packet(MessageType::Request, [0xde, 0xad, 0xbe, 0xef, 0x00, 0x01], 0x42);

    let first_request = DhcpPacket::parse(&data).unwrap();
    let second_request = DhcpPacket::parse(&data).unwrap();

    let first_ack = DhcpPacket::create_reply(&first_request, MessageType::Ack, &config).encode();
    let second_ack =
        DhcpPacket::create_reply(&second_request, MessageType::Ack, &config).encode();

    assert_eq!(first_ack, second_ack);
}

#[test]
fn offer_survives_decode_with_lease_options_intact() {
    let config = gateway_config();
    let discover = DhcpPacket::parse(&client_packet(
        MessageType::Discover,
        [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff],
        0x77777777,
    ))
    .unwrap();

    let encoded = DhcpPacket::create_reply(&discover, MessageType::Offer, &config).encode();
    let decoded = DhcpPacket::parse(&encoded).unwrap();

    assert_eq!(decoded.message_type(), Some(MessageType::Offer));
    assert_eq!(decoded.xid, 0x77777777);
    assert_eq!(decoded.yiaddr, config.client_ip);
    assert_eq!(decoded.siaddr, config.server_ip);
    assert!(decoded
        .options
        .contains(&DhcpOption::SubnetMask(config.subnet_mask)));
    assert!(decoded.options.contains(&DhcpOption::Router(config.router)));
    assert!(decoded
        .options
        .contains(&DhcpOption::DnsServer(config.dns_server)));
    assert!(decoded
        .options
        .contains(&DhcpOption::LeaseTime(config.lease_time_seconds)));
    assert!(decoded
        .options
        .contains(&DhcpOption::ServerIdentifier(config.server_ip)));
}
