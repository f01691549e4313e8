// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! UDP header view.

use crate::parse::{Cursor, TruncatedError};

/// An error which may occur when parsing a UDP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UdpError {
    /// The buffer ended inside the header.
    #[error(transparent)]
    Truncated(#[from] TruncatedError),
    /// The length field was below the 8-byte header minimum.
    #[error("bad udp length {0}")]
    BadLength(u16),
}

/// A UDP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Udp {
    source: u16,
    destination: u16,
    length: u16,
}

impl Udp {
    /// The length of a UDP header (fixed).
    pub const HEADER_LEN: usize = 8;

    /// Parse a UDP header from the cursor.
    ///
    /// # Errors
    ///
    /// Returns a [`UdpError`] on truncation or an impossible length field.
    pub fn parse(cursor: &mut Cursor<'_>) -> Result<Udp, UdpError> {
        let source = cursor.read_u16_be()?;
        let destination = cursor.read_u16_be()?;
        let length = cursor.read_u16_be()?;
        if usize::from(length) < Udp::HEADER_LEN {
            return Err(UdpError::BadLength(length));
        }
        cursor.skip(2)?; // checksum
        Ok(Udp {
            source,
            destination,
            length,
        })
    }

    /// Get the source port (host byte order).
    #[must_use]
    pub const fn source(&self) -> u16 {
        self.source
    }

    /// Get the destination port (host byte order).
    #[must_use]
    pub const fn destination(&self) -> u16 {
        self.destination
    }

    /// Value of the length field (header plus payload).
    #[must_use]
    pub const fn length(&self) -> u16 {
        self.length
    }
}

#[allow(clippy::unwrap_used)] // valid in test code
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_header() {
        let buf = [
            0xd4, 0x31, // source 54321
            0x00, 0x35, // destination 53
            0x00, 0x15, // length 21
            0x00, 0x00, // checksum
        ];
        let mut cursor = Cursor::new(&buf);
        let udp = Udp::parse(&mut cursor).unwrap();
        assert_eq!(udp.source(), 54321);
        assert_eq!(udp.destination(), 53);
        assert_eq!(udp.length(), 21);
        assert_eq!(cursor.position(), Udp::HEADER_LEN);
    }

    #[test]
    fn rejects_impossible_length() {
        let buf = [0x00, 0x01, 0x00, 0x02, 0x00, 0x07, 0x00, 0x00];
        assert_eq!(
            Udp::parse(&mut Cursor::new(&buf)),
            Err(UdpError::BadLength(7))
        );
    }
}
