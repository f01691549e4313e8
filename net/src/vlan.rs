// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! 802.1Q VLAN tag view.

use crate::eth::ethertype::EthType;
use crate::parse::{Cursor, TruncatedError};

/// A single 802.1Q tag: priority/DEI/VID word followed by the inner
/// ethertype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vlan {
    vid: u16,
    ether_type: EthType,
}

impl Vlan {
    /// The length (in bytes) of a single VLAN tag.
    pub const HEADER_LEN: usize = 4;

    /// Parse a VLAN tag from the cursor (positioned just after the outer
    /// ethertype).
    ///
    /// # Errors
    ///
    /// Returns [`TruncatedError`] if fewer than [`Vlan::HEADER_LEN`] bytes
    /// remain.
    pub fn parse(cursor: &mut Cursor<'_>) -> Result<Vlan, TruncatedError> {
        let tci = cursor.read_u16_be()?;
        let ether_type = EthType(cursor.read_u16_be()?);
        Ok(Vlan {
            vid: tci & 0x0fff,
            ether_type,
        })
    }

    /// The 12-bit VLAN identifier (0 on priority-tagged frames).
    #[must_use]
    pub const fn vid(&self) -> u16 {
        self.vid
    }

    /// The ethertype of the encapsulated payload.
    #[must_use]
    pub const fn ether_type(&self) -> EthType {
        self.ether_type
    }
}
