// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![forbid(unsafe_code)] // Validation logic should always be strictly safe
#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Strict, bounds-checked dissection of untrusted capture bytes.
//!
//! Every read over raw input funnels through [`parse::Cursor`]; header views
//! ([`eth::Eth`], [`ipv4::Ipv4`], [`tcp::Tcp`], [`udp::Udp`]) are built on top
//! of it and never index into buffers directly. [`packet::dissect`] walks the
//! supported chain (Ethernet, optional 802.1Q tag, IPv4, TCP or UDP) and
//! yields a lifetime-free [`packet::ParsedPacket`] view. The [`tls`] and
//! [`http`] modules extract the server name from a `ClientHello` and the `Host`
//! header from an HTTP request, respectively.

pub mod eth;
pub mod http;
pub mod ipv4;
pub mod packet;
pub mod parse;
pub mod tcp;
pub mod tls;
pub mod udp;
pub mod vlan;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
