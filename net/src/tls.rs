// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Server Name Indication extraction from a TLS `ClientHello`.
//!
//! The walk consumes every length-prefixed container through a bounded
//! [`Cursor`](crate::parse::Cursor) child, so a length that exceeds its
//! container fails instead of reading a neighbour's bytes. Reassembly is
//! out of scope: a `ClientHello` split across TCP segments is malformed from
//! this extractor's point of view.

use crate::parse::{Cursor, TruncatedError};

const CONTENT_TYPE_HANDSHAKE: u8 = 0x16;
const HANDSHAKE_CLIENT_HELLO: u8 = 0x01;
const EXTENSION_SERVER_NAME: u16 = 0x0000;
const NAME_TYPE_HOST: u8 = 0x00;

/// An error which may occur while walking a would-be `ClientHello`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TlsError {
    /// A length-prefixed field ran past its container.
    #[error(transparent)]
    Truncated(#[from] TruncatedError),
    /// The record is not a handshake record.
    #[error("tls record content type {0:#04x} is not handshake")]
    NotHandshake(u8),
    /// The record-layer version major is not 3.
    #[error("tls record version major {0} is not 3")]
    BadRecordVersion(u8),
    /// The handshake message is not a `ClientHello`.
    #[error("handshake message type {0:#04x} is not client hello")]
    NotClientHello(u8),
    /// The host name contains bytes that cannot appear in a DNS name.
    #[error("server name is not printable ascii")]
    BadHostName,
}

/// Extract the SNI host name from a TLS `ClientHello`, if present.
///
/// Returns `Ok(None)` for a well-formed `ClientHello` that carries no
/// `server_name` extension (or no `host_name` entry in it). The returned
/// name is ASCII-lowercased.
///
/// # Errors
///
/// Returns a [`TlsError`] if the payload is not a `ClientHello` or any
/// length field overruns its container.
pub fn client_hello_sni(payload: &[u8]) -> Result<Option<String>, TlsError> {
    let mut cursor = Cursor::new(payload);

    let content_type = cursor.read_u8()?;
    if content_type != CONTENT_TYPE_HANDSHAKE {
        return Err(TlsError::NotHandshake(content_type));
    }
    let version_major = cursor.read_u8()?;
    if version_major != 3 {
        return Err(TlsError::BadRecordVersion(version_major));
    }
    cursor.skip(1)?; // record version minor
    let record_len = cursor.read_u16_be()?;
    let mut record = cursor.subcursor(usize::from(record_len))?;

    let msg_type = record.read_u8()?;
    if msg_type != HANDSHAKE_CLIENT_HELLO {
        return Err(TlsError::NotClientHello(msg_type));
    }
    let hello_len = record.read_u24_be()?;
    let mut hello = record.subcursor(hello_len as usize)?;

    hello.skip(2)?; // legacy version
    hello.skip(32)?; // random
    let session_id_len = hello.read_u8()?;
    hello.skip(usize::from(session_id_len))?;
    let cipher_suites_len = hello.read_u16_be()?;
    hello.skip(usize::from(cipher_suites_len))?;
    let compression_len = hello.read_u8()?;
    hello.skip(usize::from(compression_len))?;

    if hello.remaining() == 0 {
        // legal pre-extension ClientHello
        return Ok(None);
    }
    let extensions_len = hello.read_u16_be()?;
    let mut extensions = hello.subcursor(usize::from(extensions_len))?;
    while extensions.remaining() > 0 {
        let ext_type = extensions.read_u16_be()?;
        let ext_len = extensions.read_u16_be()?;
        let mut extension = extensions.subcursor(usize::from(ext_len))?;
        if ext_type != EXTENSION_SERVER_NAME {
            continue;
        }
        let list_len = extension.read_u16_be()?;
        let mut list = extension.subcursor(usize::from(list_len))?;
        while list.remaining() > 0 {
            let name_type = list.read_u8()?;
            let name_len = list.read_u16_be()?;
            let name = list.take(usize::from(name_len))?;
            if name_type == NAME_TYPE_HOST {
                return decode_host_name(name).map(Some);
            }
        }
        return Ok(None);
    }
    Ok(None)
}

fn decode_host_name(name: &[u8]) -> Result<String, TlsError> {
    if name.is_empty() || !name.iter().all(u8::is_ascii_graphic) {
        return Err(TlsError::BadHostName);
    }
    Ok(name.to_ascii_lowercase().into_iter().map(char::from).collect())
}
