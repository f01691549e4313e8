// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Capture reading.

use crate::{
    FALLBACK_SNAPLEN, LINKTYPE_ETHERNET, MAGIC, MAGIC_SWAPPED, PcapError, Record,
};
use std::io::{ErrorKind, Read};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endianness {
    Little,
    Big,
}

impl Endianness {
    fn u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            Endianness::Little => u16::from_le_bytes(bytes),
            Endianness::Big => u16::from_be_bytes(bytes),
        }
    }

    fn u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            Endianness::Little => u32::from_le_bytes(bytes),
            Endianness::Big => u32::from_be_bytes(bytes),
        }
    }
}

/// A classic-pcap record reader over any byte source.
#[derive(Debug)]
pub struct PcapReader<R> {
    inner: R,
    endianness: Endianness,
    snaplen: u32,
    link_type: u32,
}

impl<R: Read> PcapReader<R> {
    /// Read and validate the global header.
    ///
    /// # Errors
    ///
    /// Returns a [`PcapError`] if the header is truncated, carries an
    /// unknown magic, a version other than 2.x, or a non-Ethernet link
    /// type.
    pub fn new(mut inner: R) -> Result<PcapReader<R>, PcapError> {
        let mut header = [0u8; 24];
        read_fully(&mut inner, &mut header)?.ok_or(PcapError::TruncatedHeader)?;

        let raw_magic = u32::from_le_bytes(take4(&header, 0));
        let endianness = match raw_magic {
            MAGIC => Endianness::Little,
            MAGIC_SWAPPED => Endianness::Big,
            other => return Err(PcapError::BadMagic(other)),
        };
        let major = endianness.u16([header[4], header[5]]);
        let minor = endianness.u16([header[6], header[7]]);
        if major != 2 {
            return Err(PcapError::UnsupportedVersion { major, minor });
        }
        if minor != 4 {
            warn!("capture declares version {major}.{minor}, treating as 2.4");
        }
        let snaplen = endianness.u32(take4(&header, 16));
        let link_type = endianness.u32(take4(&header, 20));
        if link_type != LINKTYPE_ETHERNET {
            return Err(PcapError::BadLinkType(link_type));
        }
        Ok(PcapReader {
            inner,
            endianness,
            snaplen,
            link_type,
        })
    }

    /// The capture's snap length.
    #[must_use]
    pub const fn snaplen(&self) -> u32 {
        self.snaplen
    }

    /// The capture's link type (always Ethernet once constructed).
    #[must_use]
    pub const fn link_type(&self) -> u32 {
        self.link_type
    }

    /// Read the next record, or `None` at the end of the capture.
    ///
    /// A capture that ends mid-record (a damaged tail, common when the
    /// capturing process was killed) ends the stream with a warning rather
    /// than failing the run.
    ///
    /// # Errors
    ///
    /// Returns a [`PcapError`] on I/O failure or a record whose claimed
    /// length exceeds the snap-length bound.
    #[allow(clippy::cast_possible_truncation)] // incl_len is bounded by the snaplen check
    pub fn next_record(&mut self) -> Result<Option<Record>, PcapError> {
        let mut header = [0u8; 16];
        match read_fully(&mut self.inner, &mut header)? {
            Some(()) => {}
            None => return Ok(None),
        }
        let ts_sec = self.endianness.u32(take4(&header, 0));
        let ts_usec = self.endianness.u32(take4(&header, 4));
        let incl_len = self.endianness.u32(take4(&header, 8));
        let orig_len = self.endianness.u32(take4(&header, 12));

        let bound = if self.snaplen == 0 {
            FALLBACK_SNAPLEN
        } else {
            self.snaplen
        };
        if incl_len > bound {
            return Err(PcapError::OversizedRecord { incl_len, bound });
        }

        let mut data = vec![0u8; incl_len as usize];
        match read_fully(&mut self.inner, &mut data)? {
            Some(()) => Ok(Some(Record {
                ts_sec,
                ts_usec,
                orig_len,
                data,
            })),
            None => {
                warn!("capture ends inside a record body, dropping the tail");
                Ok(None)
            }
        }
    }
}

fn take4(buf: &[u8], at: usize) -> [u8; 4] {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[at..at + 4]);
    bytes
}

/// Fill `buf` completely. `Ok(None)` means clean EOF before the first
/// byte; a partial read also yields `Ok(None)` after a warning, since a
/// truncated tail should end the capture rather than kill the run.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<Option<()>, PcapError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(None);
                }
                warn!(
                    "capture ends after {filled} bytes of a {len} byte field",
                    len = buf.len()
                );
                return Ok(None);
            }
            Ok(n) => filled += n,
            Err(error) if error.kind() == ErrorKind::Interrupted => {}
            Err(error) => return Err(PcapError::Io(error)),
        }
    }
    Ok(Some(()))
}
