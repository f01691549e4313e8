// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Frame dissection: Ethernet, optional 802.1Q tag, IPv4, TCP or UDP.

use crate::eth::Eth;
use crate::eth::ethertype::EthType;
use crate::ipv4::{Ipv4, Ipv4Error, PROTO_TCP, PROTO_UDP};
use crate::parse::{Cursor, TruncatedError};
use crate::tcp::{Tcp, TcpError, TcpFlags};
use crate::udp::{Udp, UdpError};
use crate::vlan::Vlan;
use std::net::Ipv4Addr;
use tracing::trace;

/// The transport protocol of a dissected packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IpProto {
    /// Transmission control protocol (6).
    Tcp,
    /// User datagram protocol (17).
    Udp,
}

impl IpProto {
    /// The IP protocol number.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            IpProto::Tcp => PROTO_TCP,
            IpProto::Udp => PROTO_UDP,
        }
    }
}

impl core::fmt::Display for IpProto {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            IpProto::Tcp => write!(f, "tcp"),
            IpProto::Udp => write!(f, "udp"),
        }
    }
}

/// An error which may occur when dissecting a frame.
///
/// All of these are soft errors at the pipeline level: the frame bypasses
/// flow tracking and is forwarded as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DissectError {
    /// The frame ended inside a header.
    #[error(transparent)]
    Truncated(TruncatedError),
    /// The outermost (or single-tag inner) ethertype is not one we know.
    #[error("unsupported ether type {0}")]
    UnsupportedEtherType(EthType),
    /// A known network protocol the engine does not track (IPv6, ARP).
    #[error("unsupported network protocol {0}")]
    UnsupportedL3(EthType),
    /// An IP protocol other than TCP or UDP.
    #[error("unsupported transport protocol {0}")]
    UnsupportedL4(u8),
    /// The IPv4 header failed validation.
    #[error("malformed ipv4 header: {0}")]
    MalformedIpv4(Ipv4Error),
    /// The TCP header failed validation.
    #[error("malformed tcp header: {0}")]
    MalformedTcp(TcpError),
    /// The UDP header failed validation.
    #[error("malformed udp header: {0}")]
    MalformedUdp(UdpError),
    /// The IPv4 datagram is a fragment.
    #[error("fragmented ipv4 datagram")]
    FragmentedUnsupported,
}

impl From<TruncatedError> for DissectError {
    fn from(error: TruncatedError) -> DissectError {
        DissectError::Truncated(error)
    }
}

impl From<Ipv4Error> for DissectError {
    fn from(error: Ipv4Error) -> DissectError {
        match error {
            Ipv4Error::Truncated(inner) => DissectError::Truncated(inner),
            Ipv4Error::Fragmented => DissectError::FragmentedUnsupported,
            other => DissectError::MalformedIpv4(other),
        }
    }
}

impl From<TcpError> for DissectError {
    fn from(error: TcpError) -> DissectError {
        match error {
            TcpError::Truncated(inner) => DissectError::Truncated(inner),
            other => DissectError::MalformedTcp(other),
        }
    }
}

impl From<UdpError> for DissectError {
    fn from(error: UdpError) -> DissectError {
        match error {
            UdpError::Truncated(inner) => DissectError::Truncated(inner),
            other => DissectError::MalformedUdp(other),
        }
    }
}

/// The stable per-kind bucket of a [`DissectError`], used for counters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter,
)]
#[repr(usize)]
pub enum DissectErrorKind {
    /// A header ran past the end of the frame.
    Truncated,
    /// Unknown ethertype.
    UnsupportedEtherType,
    /// Known but untracked network protocol.
    UnsupportedL3,
    /// IP protocol other than TCP/UDP.
    UnsupportedL4,
    /// A header failed a validity check.
    MalformedHeader,
    /// IPv4 fragment.
    FragmentedUnsupported,
}

impl DissectErrorKind {
    /// The number of kinds (array-counter width).
    pub const COUNT: usize = 6;

    /// Dense index of this kind.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl DissectError {
    /// The counter bucket this error belongs to.
    #[must_use]
    pub const fn kind(&self) -> DissectErrorKind {
        match self {
            DissectError::Truncated(_) => DissectErrorKind::Truncated,
            DissectError::UnsupportedEtherType(_) => DissectErrorKind::UnsupportedEtherType,
            DissectError::UnsupportedL3(_) => DissectErrorKind::UnsupportedL3,
            DissectError::UnsupportedL4(_) => DissectErrorKind::UnsupportedL4,
            DissectError::MalformedIpv4(_)
            | DissectError::MalformedTcp(_)
            | DissectError::MalformedUdp(_) => DissectErrorKind::MalformedHeader,
            DissectError::FragmentedUnsupported => DissectErrorKind::FragmentedUnsupported,
        }
    }
}

/// A lifetime-free view over a dissected frame.
///
/// Holds the scalar header fields the engine consumes plus the span of the
/// L7 payload within the original frame. Dissection never copies payload
/// bytes; [`ParsedPacket::payload`] re-borrows them from the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedPacket {
    vlan: Option<u16>,
    source: Ipv4Addr,
    destination: Ipv4Addr,
    proto: IpProto,
    source_port: u16,
    destination_port: u16,
    tcp_flags: Option<TcpFlags>,
    payload_offset: usize,
    payload_len: usize,
}

impl ParsedPacket {
    /// The VLAN identifier, if the frame was tagged.
    #[must_use]
    pub const fn vlan(&self) -> Option<u16> {
        self.vlan
    }

    /// Source IPv4 address.
    #[must_use]
    pub const fn source(&self) -> Ipv4Addr {
        self.source
    }

    /// Destination IPv4 address.
    #[must_use]
    pub const fn destination(&self) -> Ipv4Addr {
        self.destination
    }

    /// Transport protocol.
    #[must_use]
    pub const fn proto(&self) -> IpProto {
        self.proto
    }

    /// Source port (host byte order).
    #[must_use]
    pub const fn source_port(&self) -> u16 {
        self.source_port
    }

    /// Destination port (host byte order).
    #[must_use]
    pub const fn destination_port(&self) -> u16 {
        self.destination_port
    }

    /// TCP flags, if this is a TCP packet.
    #[must_use]
    pub const fn tcp_flags(&self) -> Option<TcpFlags> {
        self.tcp_flags
    }

    /// Whether the packet carries any L7 payload.
    #[must_use]
    pub const fn has_payload(&self) -> bool {
        self.payload_len > 0
    }

    /// Length of the L7 payload in bytes.
    #[must_use]
    pub const fn payload_len(&self) -> usize {
        self.payload_len
    }

    /// Re-borrow the L7 payload from the frame this view was dissected from.
    ///
    /// Returns an empty slice if `frame` is not the original frame (shorter
    /// than the recorded span).
    #[must_use]
    pub fn payload<'frame>(&self, frame: &'frame [u8]) -> &'frame [u8] {
        frame
            .get(self.payload_offset..self.payload_offset + self.payload_len)
            .unwrap_or(&[])
    }
}

/// Dissect a single link-layer frame.
///
/// Accepts Ethernet II, unwraps at most one 802.1Q tag (a second tag is
/// rejected), requires IPv4 carrying TCP or UDP, and rejects fragments.
/// The L7 payload span is clamped to the IPv4 total length so Ethernet
/// trailer padding never leaks into payload.
///
/// # Errors
///
/// Returns a [`DissectError`] describing why the frame cannot be tracked.
pub fn dissect(frame: &[u8]) -> Result<ParsedPacket, DissectError> {
    let mut cursor = Cursor::new(frame);
    let eth = Eth::parse(&mut cursor)?;

    let mut ether_type = eth.ether_type();
    let mut vlan = None;
    if ether_type == EthType::VLAN {
        let tag = Vlan::parse(&mut cursor)?;
        if tag.ether_type() == EthType::VLAN {
            // double-tagged (QinQ) frames are not unwrapped further
            return Err(DissectError::UnsupportedEtherType(EthType::VLAN));
        }
        vlan = Some(tag.vid());
        ether_type = tag.ether_type();
    }
    match ether_type {
        EthType::IPV4 => {}
        EthType::IPV6 | EthType::ARP => return Err(DissectError::UnsupportedL3(ether_type)),
        other => return Err(DissectError::UnsupportedEtherType(other)),
    }

    let ip_start = cursor.position();
    let ip = Ipv4::parse(&mut cursor)?;
    let l4_start = ip_start + ip.header_len();
    // bound the transport parse to the datagram so trailer bytes are inert
    let mut l4 = cursor.subcursor(usize::from(ip.total_len()) - ip.header_len())?;

    let parsed = match ip.protocol() {
        PROTO_TCP => {
            let tcp = Tcp::parse(&mut l4)?;
            ParsedPacket {
                vlan,
                source: ip.source(),
                destination: ip.destination(),
                proto: IpProto::Tcp,
                source_port: tcp.source(),
                destination_port: tcp.destination(),
                tcp_flags: Some(tcp.flags()),
                payload_offset: l4_start + tcp.header_len(),
                payload_len: l4.remaining(),
            }
        }
        PROTO_UDP => {
            let udp = Udp::parse(&mut l4)?;
            let declared = usize::from(udp.length()) - Udp::HEADER_LEN;
            ParsedPacket {
                vlan,
                source: ip.source(),
                destination: ip.destination(),
                proto: IpProto::Udp,
                source_port: udp.source(),
                destination_port: udp.destination(),
                tcp_flags: None,
                payload_offset: l4_start + Udp::HEADER_LEN,
                payload_len: declared.min(l4.remaining()),
            }
        }
        other => {
            trace!("untracked ip protocol {other}");
            return Err(DissectError::UnsupportedL4(other));
        }
    };
    Ok(parsed)
}

#[allow(clippy::unwrap_used)] // valid in test code
#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::{tcp_frame, udp_frame, vlan_tcp_frame};

    #[test]
    fn dissect_tcp_frame() {
        let frame = tcp_frame(
            Ipv4Addr::new(192, 168, 0, 1),
            49152,
            Ipv4Addr::new(142, 250, 80, 46),
            443,
            TcpFlags::PSH | TcpFlags::ACK,
            b"hello",
        );
        let parsed = dissect(&frame).unwrap();
        assert_eq!(parsed.source(), Ipv4Addr::new(192, 168, 0, 1));
        assert_eq!(parsed.destination(), Ipv4Addr::new(142, 250, 80, 46));
        assert_eq!(parsed.proto(), IpProto::Tcp);
        assert_eq!(parsed.source_port(), 49152);
        assert_eq!(parsed.destination_port(), 443);
        assert_eq!(
            parsed.tcp_flags().unwrap(),
            TcpFlags::PSH | TcpFlags::ACK
        );
        assert_eq!(parsed.payload(&frame), b"hello");
    }

    #[test]
    fn dissect_udp_frame() {
        let frame = udp_frame(
            Ipv4Addr::new(10, 0, 0, 1),
            54321,
            Ipv4Addr::new(8, 8, 8, 8),
            53,
            b"\x12\x34",
        );
        let parsed = dissect(&frame).unwrap();
        assert_eq!(parsed.proto(), IpProto::Udp);
        assert_eq!(parsed.destination_port(), 53);
        assert_eq!(parsed.payload(&frame), b"\x12\x34");
        assert!(parsed.tcp_flags().is_none());
    }

    #[test]
    fn single_vlan_tag_is_unwrapped() {
        let frame = vlan_tcp_frame(
            42,
            Ipv4Addr::new(192, 168, 0, 1),
            1234,
            Ipv4Addr::new(192, 168, 0, 2),
            80,
            b"GET / HTTP/1.1\r\n",
        );
        let parsed = dissect(&frame).unwrap();
        assert_eq!(parsed.vlan(), Some(42));
        assert_eq!(parsed.destination_port(), 80);
    }

    #[test]
    fn double_vlan_tag_is_rejected() {
        let inner = vlan_tcp_frame(
            2,
            Ipv4Addr::new(192, 168, 0, 1),
            1234,
            Ipv4Addr::new(192, 168, 0, 2),
            80,
            b"",
        );
        // wrap the tagged frame in a second tag
        let mut frame = inner[..12].to_vec();
        frame.extend_from_slice(&[0x81, 0x00, 0x00, 0x01]);
        frame.extend_from_slice(&inner[12..]);
        assert_eq!(
            dissect(&frame),
            Err(DissectError::UnsupportedEtherType(EthType::VLAN))
        );
    }

    #[test]
    fn arp_is_unsupported_l3() {
        let mut frame = tcp_frame(
            Ipv4Addr::new(1, 1, 1, 1),
            1,
            Ipv4Addr::new(2, 2, 2, 2),
            2,
            TcpFlags::SYN,
            b"",
        );
        frame[12] = 0x08;
        frame[13] = 0x06;
        assert_eq!(dissect(&frame), Err(DissectError::UnsupportedL3(EthType::ARP)));
    }

    #[test]
    fn unknown_ethertype_is_rejected() {
        let mut frame = tcp_frame(
            Ipv4Addr::new(1, 1, 1, 1),
            1,
            Ipv4Addr::new(2, 2, 2, 2),
            2,
            TcpFlags::SYN,
            b"",
        );
        frame[12] = 0x88;
        frame[13] = 0xcc; // lldp
        assert_eq!(
            dissect(&frame),
            Err(DissectError::UnsupportedEtherType(EthType(0x88cc)))
        );
    }

    #[test]
    fn truncated_frame_is_soft_error() {
        let frame = tcp_frame(
            Ipv4Addr::new(1, 1, 1, 1),
            1,
            Ipv4Addr::new(2, 2, 2, 2),
            443,
            TcpFlags::SYN,
            b"",
        );
        for len in 0..frame.len() - 1 {
            let result = dissect(&frame[..len]);
            assert!(result.is_err(), "prefix of {len} bytes parsed");
        }
    }

    #[test]
    fn trailer_bytes_are_not_payload() {
        let mut frame = tcp_frame(
            Ipv4Addr::new(1, 1, 1, 1),
            1000,
            Ipv4Addr::new(2, 2, 2, 2),
            2000,
            TcpFlags::ACK,
            b"data",
        );
        // Ethernet padding after the ip datagram
        frame.extend_from_slice(&[0xaa; 16]);
        let parsed = dissect(&frame).unwrap();
        assert_eq!(parsed.payload(&frame), b"data");
    }

    #[test]
    fn arbitrary_frames_never_panic() {
        bolero::check!().with_type::<Vec<u8>>().for_each(|frame| {
            let _ = dissect(frame);
        });
    }

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(
            DissectError::FragmentedUnsupported.kind(),
            DissectErrorKind::FragmentedUnsupported
        );
        assert_eq!(
            DissectError::UnsupportedL4(1).kind().index(),
            DissectErrorKind::UnsupportedL4 as usize
        );
    }
}
