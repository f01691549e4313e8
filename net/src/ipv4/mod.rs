// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IPv4 header view.

use crate::parse::{Cursor, TruncatedError};
use std::net::Ipv4Addr;

/// IP protocol number for TCP.
pub const PROTO_TCP: u8 = 6;
/// IP protocol number for UDP.
pub const PROTO_UDP: u8 = 17;

/// An error which may occur when parsing an IPv4 header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Ipv4Error {
    /// The buffer ended inside the header.
    #[error(transparent)]
    Truncated(#[from] TruncatedError),
    /// The version nibble was not 4.
    #[error("bad ip version {0}")]
    BadVersion(u8),
    /// The IHL field was below the legal minimum of 5 words.
    #[error("bad ipv4 header length {0} (words)")]
    BadHeaderLength(u8),
    /// The total-length field disagrees with the header or the frame.
    #[error("bad ipv4 total length {total} (header {header} bytes, {available} available)")]
    BadTotalLength {
        /// Value of the total-length field.
        total: u16,
        /// Length of the header in bytes.
        header: usize,
        /// Bytes available in the frame from the start of the header.
        available: usize,
    },
    /// The datagram is a fragment (MF set or non-zero offset).
    #[error("fragmented ipv4 datagram")]
    Fragmented,
}

/// An IPv4 header.
///
/// Only the fields the engine consumes are retained; options are validated
/// for length and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4 {
    source: Ipv4Addr,
    destination: Ipv4Addr,
    protocol: u8,
    header_len: usize,
    total_len: u16,
}

impl Ipv4 {
    /// The minimum length of an IPv4 header (no options).
    pub const MIN_LEN: usize = 20;
    /// The maximum length of an IPv4 header (full options).
    pub const MAX_LEN: usize = 60;

    /// Parse an IPv4 header from the cursor, consuming exactly the header
    /// (including options).
    ///
    /// Fragments are rejected: the engine never reassembles, and letting a
    /// first fragment through classification while later fragments bypass it
    /// would make the verdict depend on fragment order.
    ///
    /// # Errors
    ///
    /// Returns an [`Ipv4Error`] describing the first check that failed.
    pub fn parse(cursor: &mut Cursor<'_>) -> Result<Ipv4, Ipv4Error> {
        let available = cursor.remaining();
        let first = cursor.read_u8()?;
        let version = first >> 4;
        if version != 4 {
            return Err(Ipv4Error::BadVersion(version));
        }
        let ihl = first & 0x0f;
        if ihl < 5 {
            return Err(Ipv4Error::BadHeaderLength(ihl));
        }
        let header_len = usize::from(ihl) * 4;
        cursor.skip(1)?; // dscp / ecn
        let total_len = cursor.read_u16_be()?;
        if usize::from(total_len) < header_len || usize::from(total_len) > available {
            return Err(Ipv4Error::BadTotalLength {
                total: total_len,
                header: header_len,
                available,
            });
        }
        cursor.skip(2)?; // identification
        let frag_word = cursor.read_u16_be()?;
        let more_fragments = frag_word & 0x2000 != 0;
        let frag_offset = frag_word & 0x1fff;
        if more_fragments || frag_offset != 0 {
            return Err(Ipv4Error::Fragmented);
        }
        cursor.skip(1)?; // ttl
        let protocol = cursor.read_u8()?;
        cursor.skip(2)?; // header checksum
        let source = Ipv4Addr::from(cursor.read_u32_be()?);
        let destination = Ipv4Addr::from(cursor.read_u32_be()?);
        cursor.skip(header_len - Ipv4::MIN_LEN)?;
        Ok(Ipv4 {
            source,
            destination,
            protocol,
            header_len,
            total_len,
        })
    }

    /// Get the source address of the header.
    #[must_use]
    pub const fn source(&self) -> Ipv4Addr {
        self.source
    }

    /// Get the destination address of the header.
    #[must_use]
    pub const fn destination(&self) -> Ipv4Addr {
        self.destination
    }

    /// Get the protocol number of the encapsulated payload.
    #[must_use]
    pub const fn protocol(&self) -> u8 {
        self.protocol
    }

    /// Length of the header (including options) in bytes.
    #[must_use]
    pub const fn header_len(&self) -> usize {
        self.header_len
    }

    /// Value of the total-length field (header plus payload).
    #[must_use]
    pub const fn total_len(&self) -> u16 {
        self.total_len
    }
}

#[allow(clippy::unwrap_used)] // valid in test code
#[cfg(test)]
mod test {
    use super::*;

    fn minimal_header() -> Vec<u8> {
        let mut buf = vec![
            0x45, 0x00, // version + ihl, tos
            0x00, 0x1c, // total length: 28
            0x00, 0x00, // identification
            0x00, 0x00, // flags + fragment offset
            0x40, PROTO_UDP, // ttl, protocol
            0x00, 0x00, // checksum
            10, 0, 0, 1, // source
            10, 0, 0, 2, // destination
        ];
        buf.extend_from_slice(&[0u8; 8]); // udp header worth of payload
        buf
    }

    #[test]
    fn parse_minimal_header() {
        let buf = minimal_header();
        let mut cursor = Cursor::new(&buf);
        let ip = Ipv4::parse(&mut cursor).unwrap();
        assert_eq!(ip.source(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(ip.destination(), Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(ip.protocol(), PROTO_UDP);
        assert_eq!(ip.header_len(), Ipv4::MIN_LEN);
        assert_eq!(ip.total_len(), 28);
        assert_eq!(cursor.position(), Ipv4::MIN_LEN);
    }

    #[test]
    fn options_are_skipped() {
        let mut buf = minimal_header();
        buf[0] = 0x46; // ihl 6
        buf[3] = 0x20; // total length 32
        buf.extend_from_slice(&[0u8; 4]);
        let mut cursor = Cursor::new(&buf);
        let ip = Ipv4::parse(&mut cursor).unwrap();
        assert_eq!(ip.header_len(), 24);
        assert_eq!(cursor.position(), 24);
    }

    #[test]
    fn rejects_bad_version() {
        let mut buf = minimal_header();
        buf[0] = 0x65;
        assert_eq!(
            Ipv4::parse(&mut Cursor::new(&buf)),
            Err(Ipv4Error::BadVersion(6))
        );
    }

    #[test]
    fn rejects_short_ihl() {
        let mut buf = minimal_header();
        buf[0] = 0x44;
        assert_eq!(
            Ipv4::parse(&mut Cursor::new(&buf)),
            Err(Ipv4Error::BadHeaderLength(4))
        );
    }

    #[test]
    fn rejects_total_length_past_frame() {
        let mut buf = minimal_header();
        buf[2] = 0x40; // total length 0x401c, way past the buffer
        assert!(matches!(
            Ipv4::parse(&mut Cursor::new(&buf)),
            Err(Ipv4Error::BadTotalLength { .. })
        ));
    }

    #[test]
    fn rejects_fragments() {
        let mut buf = minimal_header();
        buf[6] = 0x20; // more-fragments flag
        assert_eq!(Ipv4::parse(&mut Cursor::new(&buf)), Err(Ipv4Error::Fragmented));

        let mut buf = minimal_header();
        buf[7] = 0x08; // fragment offset 8
        assert_eq!(Ipv4::parse(&mut Cursor::new(&buf)), Err(Ipv4Error::Fragmented));
    }

    #[test]
    fn arbitrary_bytes_never_panic() {
        bolero::check!().with_type::<Vec<u8>>().for_each(|buf| {
            let _ = Ipv4::parse(&mut Cursor::new(buf));
        });
    }
}
