// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `Host` header extraction from a plaintext HTTP request.

use memchr::memchr;

/// How far into the payload the header scan will look.
pub const SCAN_WINDOW: usize = 8 * 1024;

const METHODS: [&[u8]; 6] = [b"GET ", b"POST ", b"HEAD ", b"PUT ", b"DELETE ", b"OPTIONS "];

/// An error which may occur while scanning request headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    /// More than one `Host` header in one request.
    #[error("duplicate host header")]
    DuplicateHost,
    /// A `Host` header with nothing in it.
    #[error("empty host header")]
    EmptyHost,
    /// A `Host` value with bytes that cannot appear in a host name.
    #[error("host header value is not printable ascii")]
    BadHostValue,
}

/// Whether the payload starts with a known HTTP request method token.
///
/// Only payloads passing this gate are worth scanning; anything else on
/// port 80 is a continuation segment or not HTTP at all.
#[must_use]
pub fn starts_with_method(payload: &[u8]) -> bool {
    METHODS.iter().any(|method| payload.starts_with(method))
}

/// Scan request headers for a `Host:` line (case-insensitive name) within
/// the first [`SCAN_WINDOW`] bytes.
///
/// Returns `Ok(None)` when the scan window holds no complete `Host` line.
/// The returned value is trimmed and ASCII-lowercased.
///
/// # Errors
///
/// Returns an [`HttpError`] on duplicate, empty, or unprintable values.
pub fn host_header(payload: &[u8]) -> Result<Option<String>, HttpError> {
    let window = &payload[..payload.len().min(SCAN_WINDOW)];
    let mut host = None;

    // skip the request line
    let Some(first_eol) = memchr(b'\n', window) else {
        return Ok(None);
    };
    let mut pos = first_eol + 1;

    while pos < window.len() {
        let Some(eol) = memchr(b'\n', &window[pos..]) else {
            break;
        };
        let mut line = &window[pos..pos + eol];
        pos += eol + 1;
        if let [head @ .., b'\r'] = line {
            line = head;
        }
        if line.is_empty() {
            break; // end of headers
        }
        let Some(colon) = memchr(b':', line) else {
            continue;
        };
        let name = line[..colon].trim_ascii();
        if !name.eq_ignore_ascii_case(b"host") {
            continue;
        }
        let value = line[colon + 1..].trim_ascii();
        if host.is_some() {
            return Err(HttpError::DuplicateHost);
        }
        if value.is_empty() {
            return Err(HttpError::EmptyHost);
        }
        if !value.iter().all(u8::is_ascii_graphic) {
            return Err(HttpError::BadHostValue);
        }
        host = Some(
            value
                .to_ascii_lowercase()
                .into_iter()
                .map(char::from)
                .collect(),
        );
    }
    Ok(host)
}
