// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! TCP header view.

use crate::parse::{Cursor, TruncatedError};

bitflags::bitflags! {
    /// The flag byte of a TCP header (NS excluded).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TcpFlags: u8 {
        /// No more data from sender.
        const FIN = 0x01;
        /// Synchronize sequence numbers.
        const SYN = 0x02;
        /// Reset the connection.
        const RST = 0x04;
        /// Push function.
        const PSH = 0x08;
        /// Acknowledgment field is significant.
        const ACK = 0x10;
        /// Urgent pointer field is significant.
        const URG = 0x20;
        /// ECN echo.
        const ECE = 0x40;
        /// Congestion window reduced.
        const CWR = 0x80;
    }
}

/// An error which may occur when parsing a TCP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TcpError {
    /// The buffer ended inside the header.
    #[error(transparent)]
    Truncated(#[from] TruncatedError),
    /// The data-offset field was below the legal minimum of 5 words.
    #[error("bad tcp data offset {0} (words)")]
    BadDataOffset(u8),
}

/// A TCP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tcp {
    source: u16,
    destination: u16,
    flags: TcpFlags,
    header_len: usize,
}

impl Tcp {
    /// The minimum length of a TCP header (no options).
    pub const MIN_LEN: usize = 20;
    /// The maximum length of a TCP header (full options).
    pub const MAX_LEN: usize = 60;

    /// Parse a TCP header from the cursor, consuming exactly the header
    /// (including options).
    ///
    /// # Errors
    ///
    /// Returns a [`TcpError`] on truncation or an illegal data offset.
    pub fn parse(cursor: &mut Cursor<'_>) -> Result<Tcp, TcpError> {
        let source = cursor.read_u16_be()?;
        let destination = cursor.read_u16_be()?;
        cursor.skip(4)?; // sequence number
        cursor.skip(4)?; // acknowledgment number
        let offset_byte = cursor.read_u8()?;
        let data_offset = offset_byte >> 4;
        if data_offset < 5 {
            return Err(TcpError::BadDataOffset(data_offset));
        }
        let header_len = usize::from(data_offset) * 4;
        let flags = TcpFlags::from_bits_truncate(cursor.read_u8()?);
        cursor.skip(2)?; // window
        cursor.skip(2)?; // checksum
        cursor.skip(2)?; // urgent pointer
        cursor.skip(header_len - Tcp::MIN_LEN)?;
        Ok(Tcp {
            source,
            destination,
            flags,
            header_len,
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

    /// Get the flag set of this header.
    #[must_use]
    pub const fn flags(&self) -> TcpFlags {
        self.flags
    }

    /// Length of the header (including options) in bytes.
    #[must_use]
    pub const fn header_len(&self) -> usize {
        self.header_len
    }
}
