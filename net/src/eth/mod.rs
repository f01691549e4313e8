// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Ethernet II header view.

pub mod ethertype;

use crate::eth::ethertype::EthType;
use crate::parse::{Cursor, TruncatedError};

/// A MAC address.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mac(pub [u8; 6]);

impl Mac {
    /// The broadcast MAC address.
    pub const BROADCAST: Mac = Mac([0xff; 6]);
}

impl core::fmt::Display for Mac {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// An [ethernet header].
///
/// [ethernet header]: https://en.wikipedia.org/wiki/Ethernet_frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eth {
    destination: Mac,
    source: Mac,
    ether_type: EthType,
}

impl Eth {
    /// The length (in bytes) of an [`Eth`] header.
    pub const HEADER_LEN: usize = 14;

    /// Parse an ethernet header from the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`TruncatedError`] if fewer than [`Eth::HEADER_LEN`] bytes
    /// remain.
    pub fn parse(cursor: &mut Cursor<'_>) -> Result<Eth, TruncatedError> {
        let mut destination = [0u8; 6];
        destination.copy_from_slice(cursor.take(6)?);
        let mut source = [0u8; 6];
        source.copy_from_slice(cursor.take(6)?);
        let ether_type = EthType(cursor.read_u16_be()?);
        Ok(Eth {
            destination: Mac(destination),
            source: Mac(source),
            ether_type,
        })
    }

    /// Get the destination [`Mac`] of the header.
    #[must_use]
    pub const fn destination(&self) -> Mac {
        self.destination
    }

    /// Get the source [`Mac`] of the header.
    #[must_use]
    pub const fn source(&self) -> Mac {
        self.source
    }

    /// Get the [`EthType`] of the header.
    #[must_use]
    pub const fn ether_type(&self) -> EthType {
        self.ether_type
    }
}
