// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Capture writing.

use crate::{PcapError, Record};
use std::io::Write;

/// A classic-pcap record writer over any byte sink.
///
/// Headers are written in native endianness; timestamps and original
/// lengths are copied from the records untouched.
#[derive(Debug)]
pub struct PcapWriter<W> {
    inner: W,
}

impl<W: Write> PcapWriter<W> {
    /// Write the global header.
    ///
    /// `snaplen` and `link_type` are normally copied from the input
    /// capture.
    ///
    /// # Errors
    ///
    /// Returns a [`PcapError`] on I/O failure.
    pub fn new(mut inner: W, snaplen: u32, link_type: u32) -> Result<PcapWriter<W>, PcapError> {
        inner.write_all(&crate::MAGIC.to_ne_bytes())?;
        inner.write_all(&2u16.to_ne_bytes())?;
        inner.write_all(&4u16.to_ne_bytes())?;
        inner.write_all(&0u32.to_ne_bytes())?; // thiszone
        inner.write_all(&0u32.to_ne_bytes())?; // sigfigs
        inner.write_all(&snaplen.to_ne_bytes())?;
        inner.write_all(&link_type.to_ne_bytes())?;
        Ok(PcapWriter { inner })
    }

    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns a [`PcapError`] on I/O failure or a record longer than
    /// `u32::MAX` bytes.
    pub fn write_record(&mut self, record: &Record) -> Result<(), PcapError> {
        let incl_len = u32::try_from(record.data.len())
            .map_err(|_| PcapError::Io(std::io::Error::other("record exceeds u32 length")))?;
        self.inner.write_all(&record.ts_sec.to_ne_bytes())?;
        self.inner.write_all(&record.ts_usec.to_ne_bytes())?;
        self.inner.write_all(&incl_len.to_ne_bytes())?;
        self.inner.write_all(&record.orig_len.to_ne_bytes())?;
        self.inner.write_all(&record.data)?;
        Ok(())
    }

    /// Flush the underlying sink.
    ///
    /// # Errors
    ///
    /// Returns a [`PcapError`] on I/O failure.
    pub fn flush(&mut self) -> Result<(), PcapError> {
        self.inner.flush()?;
        Ok(())
    }
}
