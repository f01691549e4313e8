// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation
)]

//! Builders for well-formed (and deliberately broken) test frames.
//!
//! Frames are assembled with `etherparse` so checksums and length fields
//! are right by construction; the TLS `ClientHello` is assembled by hand
//! since `etherparse` stops at the transport layer.

use crate::tcp::TcpFlags;
use etherparse::{Ethernet2Header, IpNumber, Ipv4Header, TcpHeader, UdpHeader};
use std::net::Ipv4Addr;

const SRC_MAC: [u8; 6] = [0x02, 0, 0, 0, 0, 0x01];
const DST_MAC: [u8; 6] = [0x02, 0, 0, 0, 0, 0x02];

fn eth_header() -> Ethernet2Header {
    Ethernet2Header {
        source: SRC_MAC,
        destination: DST_MAC,
        ether_type: etherparse::EtherType::IPV4,
    }
}

fn ipv4_header(
    source: Ipv4Addr,
    destination: Ipv4Addr,
    protocol: IpNumber,
    payload_len: usize,
) -> Ipv4Header {
    let mut header = Ipv4Header::new(
        payload_len as u16,
        64,
        protocol,
        source.octets(),
        destination.octets(),
    )
    .unwrap();
    header.header_checksum = header.calc_header_checksum();
    header
}

/// Build an Ethernet/IPv4/TCP frame carrying `payload`.
#[must_use]
pub fn tcp_frame(
    source: Ipv4Addr,
    source_port: u16,
    destination: Ipv4Addr,
    destination_port: u16,
    flags: TcpFlags,
    payload: &[u8],
) -> Vec<u8> {
    let mut tcp = TcpHeader::new(source_port, destination_port, 1, 0xffff);
    tcp.fin = flags.contains(TcpFlags::FIN);
    tcp.syn = flags.contains(TcpFlags::SYN);
    tcp.rst = flags.contains(TcpFlags::RST);
    tcp.psh = flags.contains(TcpFlags::PSH);
    tcp.ack = flags.contains(TcpFlags::ACK);
    tcp.urg = flags.contains(TcpFlags::URG);
    tcp.ece = flags.contains(TcpFlags::ECE);
    tcp.cwr = flags.contains(TcpFlags::CWR);

    let ip = ipv4_header(
        source,
        destination,
        IpNumber::TCP,
        tcp.header_len() + payload.len(),
    );
    tcp.checksum = tcp.calc_checksum_ipv4(&ip, payload).unwrap();

    let mut frame = Vec::new();
    eth_header().write(&mut frame).unwrap();
    ip.write(&mut frame).unwrap();
    tcp.write(&mut frame).unwrap();
    frame.extend_from_slice(payload);
    frame
}

/// Build an Ethernet/IPv4/UDP frame carrying `payload`.
#[must_use]
pub fn udp_frame(
    source: Ipv4Addr,
    source_port: u16,
    destination: Ipv4Addr,
    destination_port: u16,
    payload: &[u8],
) -> Vec<u8> {
    let ip = ipv4_header(
        source,
        destination,
        IpNumber::UDP,
        UdpHeader::LEN + payload.len(),
    );
    let udp =
        UdpHeader::with_ipv4_checksum(source_port, destination_port, &ip, payload).unwrap();

    let mut frame = Vec::new();
    eth_header().write(&mut frame).unwrap();
    ip.write(&mut frame).unwrap();
    udp.write(&mut frame).unwrap();
    frame.extend_from_slice(payload);
    frame
}

/// Build a single-tagged 802.1Q variant of [`tcp_frame`].
#[must_use]
pub fn vlan_tcp_frame(
    vid: u16,
    source: Ipv4Addr,
    source_port: u16,
    destination: Ipv4Addr,
    destination_port: u16,
    payload: &[u8],
) -> Vec<u8> {
    let untagged = tcp_frame(
        source,
        source_port,
        destination,
        destination_port,
        TcpFlags::PSH | TcpFlags::ACK,
        payload,
    );
    let mut frame = untagged[..12].to_vec();
    frame.extend_from_slice(&0x8100u16.to_be_bytes());
    frame.extend_from_slice(&(vid & 0x0fff).to_be_bytes());
    frame.extend_from_slice(&untagged[12..]);
    frame
}

fn client_hello_body(extensions: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&[0x03, 0x03]); // legacy version
    body.extend_from_slice(&[0u8; 32]); // random
    body.push(0); // session id length
    body.extend_from_slice(&[0x00, 0x02, 0x13, 0x01]); // one cipher suite
    body.extend_from_slice(&[0x01, 0x00]); // null compression
    body.extend_from_slice(&(extensions.len() as u16).to_be_bytes());
    body.extend_from_slice(extensions);
    body
}

fn wrap_client_hello(body: &[u8]) -> Vec<u8> {
    let mut record = Vec::new();
    record.push(0x16); // handshake
    record.extend_from_slice(&[0x03, 0x01]);
    record.extend_from_slice(&((body.len() + 4) as u16).to_be_bytes());
    record.push(0x01); // client hello
    record.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]); // u24
    record.extend_from_slice(body);
    record
}

/// Build a TLS `ClientHello` record carrying `server_name` in an SNI
/// extension.
#[must_use]
pub fn client_hello(server_name: &str) -> Vec<u8> {
    let name = server_name.as_bytes();
    let mut extension = Vec::new();
    extension.extend_from_slice(&[0x00, 0x00]); // server_name
    extension.extend_from_slice(&((name.len() + 5) as u16).to_be_bytes());
    extension.extend_from_slice(&((name.len() + 3) as u16).to_be_bytes()); // list
    extension.push(0x00); // host_name
    extension.extend_from_slice(&(name.len() as u16).to_be_bytes());
    extension.extend_from_slice(name);
    wrap_client_hello(&client_hello_body(&extension))
}

/// Build a TLS `ClientHello` record with extensions but no SNI.
#[must_use]
pub fn client_hello_without_sni() -> Vec<u8> {
    // a lone ec_point_formats extension
    let extension = [0x00, 0x0b, 0x00, 0x02, 0x01, 0x00];
    wrap_client_hello(&client_hello_body(&extension))
}

/// Build a `ClientHello` whose SNI extension length overruns the record, for
/// malformed-input tests.
#[must_use]
pub fn client_hello_with_overrunning_sni() -> Vec<u8> {
    let mut extension = Vec::new();
    extension.extend_from_slice(&[0x00, 0x00]);
    extension.extend_from_slice(&0x4000u16.to_be_bytes()); // lies about its length
    extension.extend_from_slice(&[0x00, 0x05, 0x00]);
    wrap_client_hello(&client_hello_body(&extension))
}
