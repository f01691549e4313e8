// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![forbid(unsafe_code)]
#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Classic pcap framing: a 24-byte global header followed by 16-byte
//! record headers. Both file endiannesses are read; output is written in
//! native endianness. Only the framing lives here; nothing in this crate
//! looks inside a frame.

mod reader;
mod writer;

pub use reader::PcapReader;
pub use writer::PcapWriter;

/// Magic number of a microsecond-timestamp capture, as written.
pub const MAGIC: u32 = 0xa1b2_c3d4;
/// [`MAGIC`] as it appears when the capture was written on a machine of
/// the opposite endianness.
pub const MAGIC_SWAPPED: u32 = 0xd4c3_b2a1;
/// The only link type the engine accepts (Ethernet).
pub const LINKTYPE_ETHERNET: u32 = 1;
/// Record size bound applied when the capture declares `snaplen` 0.
pub const FALLBACK_SNAPLEN: u32 = 256 * 1024;

/// An error raised by capture framing. All of these are fatal: either the
/// capture cannot be understood at all, or the output cannot be written.
#[derive(Debug, thiserror::Error)]
pub enum PcapError {
    /// The first four bytes are no known pcap magic.
    #[error("bad capture magic {0:#010x}")]
    BadMagic(u32),
    /// The file ended inside the global header.
    #[error("truncated capture header")]
    TruncatedHeader,
    /// A pcap version this reader does not understand.
    #[error("unsupported capture version {major}.{minor}")]
    UnsupportedVersion {
        /// Major version found in the header.
        major: u16,
        /// Minor version found in the header.
        minor: u16,
    },
    /// A link type other than Ethernet.
    #[error("unsupported link type {0}")]
    BadLinkType(u32),
    /// A record claiming more captured bytes than the snap length allows.
    #[error("record claims {incl_len} bytes, bound is {bound}")]
    OversizedRecord {
        /// The record's `incl_len` field.
        incl_len: u32,
        /// The applied sanity bound.
        bound: u32,
    },
    /// An underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One capture record: the original timestamp and length plus the captured
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Timestamp seconds.
    pub ts_sec: u32,
    /// Timestamp microseconds.
    pub ts_usec: u32,
    /// Length of the packet as it was on the wire.
    pub orig_len: u32,
    /// The captured bytes (`incl_len` of them).
    pub data: Vec<u8>,
}

#[allow(clippy::unwrap_used)] // valid in test code
#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn header_le(snaplen: u32, network: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC.to_le_bytes());
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&4u16.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // thiszone
        buf.extend_from_slice(&0u32.to_le_bytes()); // sigfigs
        buf.extend_from_slice(&snaplen.to_le_bytes());
        buf.extend_from_slice(&network.to_le_bytes());
        buf
    }

    fn record_le(ts_sec: u32, ts_usec: u32, data: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&ts_sec.to_le_bytes());
        buf.extend_from_slice(&ts_usec.to_le_bytes());
        buf.extend_from_slice(&u32::try_from(data.len()).unwrap().to_le_bytes());
        buf.extend_from_slice(&u32::try_from(data.len()).unwrap().to_le_bytes());
        buf.extend_from_slice(data);
        buf
    }

    #[test]
    fn reads_little_endian_capture() {
        let mut capture = header_le(65535, LINKTYPE_ETHERNET);
        capture.extend_from_slice(&record_le(100, 7, b"abcdef"));
        capture.extend_from_slice(&record_le(101, 8, b"xyz"));

        let mut reader = PcapReader::new(Cursor::new(capture)).unwrap();
        assert_eq!(reader.snaplen(), 65535);
        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.ts_sec, 100);
        assert_eq!(first.ts_usec, 7);
        assert_eq!(first.orig_len, 6);
        assert_eq!(first.data, b"abcdef");
        let second = reader.next_record().unwrap().unwrap();
        assert_eq!(second.data, b"xyz");
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn reads_opposite_endian_capture_identically() {
        // the same capture, once per endianness
        let mut big = Vec::new();
        big.extend_from_slice(&MAGIC.to_be_bytes());
        big.extend_from_slice(&2u16.to_be_bytes());
        big.extend_from_slice(&4u16.to_be_bytes());
        big.extend_from_slice(&0u32.to_be_bytes());
        big.extend_from_slice(&0u32.to_be_bytes());
        big.extend_from_slice(&4096u32.to_be_bytes());
        big.extend_from_slice(&LINKTYPE_ETHERNET.to_be_bytes());
        big.extend_from_slice(&33u32.to_be_bytes());
        big.extend_from_slice(&44u32.to_be_bytes());
        big.extend_from_slice(&5u32.to_be_bytes());
        big.extend_from_slice(&60u32.to_be_bytes());
        big.extend_from_slice(b"hello");

        let mut little = header_le(4096, LINKTYPE_ETHERNET);
        little.extend_from_slice(&33u32.to_le_bytes());
        little.extend_from_slice(&44u32.to_le_bytes());
        little.extend_from_slice(&5u32.to_le_bytes());
        little.extend_from_slice(&60u32.to_le_bytes());
        little.extend_from_slice(b"hello");

        let mut big_reader = PcapReader::new(Cursor::new(big)).unwrap();
        let mut little_reader = PcapReader::new(Cursor::new(little)).unwrap();
        assert_eq!(big_reader.snaplen(), little_reader.snaplen());
        assert_eq!(
            big_reader.next_record().unwrap().unwrap(),
            little_reader.next_record().unwrap().unwrap()
        );
    }

    #[test]
    fn bad_magic_is_fatal() {
        let capture = vec![0u8; 24];
        assert!(matches!(
            PcapReader::new(Cursor::new(capture)),
            Err(PcapError::BadMagic(0))
        ));
    }

    #[test]
    fn truncated_global_header_is_fatal() {
        let capture = header_le(65535, LINKTYPE_ETHERNET);
        assert!(matches!(
            PcapReader::new(Cursor::new(&capture[..20])),
            Err(PcapError::TruncatedHeader)
        ));
    }

    #[test]
    fn non_ethernet_link_type_is_fatal() {
        let capture = header_le(65535, 101); // raw ip
        assert!(matches!(
            PcapReader::new(Cursor::new(capture)),
            Err(PcapError::BadLinkType(101))
        ));
    }

    #[test]
    fn wrong_version_is_fatal() {
        let mut capture = header_le(65535, LINKTYPE_ETHERNET);
        capture[4] = 1;
        assert!(matches!(
            PcapReader::new(Cursor::new(capture)),
            Err(PcapError::UnsupportedVersion { major: 1, .. })
        ));
    }

    #[test]
    fn oversized_record_is_fatal() {
        let mut capture = header_le(1024, LINKTYPE_ETHERNET);
        capture.extend_from_slice(&0u32.to_le_bytes());
        capture.extend_from_slice(&0u32.to_le_bytes());
        capture.extend_from_slice(&2048u32.to_le_bytes()); // incl_len > snaplen
        capture.extend_from_slice(&2048u32.to_le_bytes());
        let mut reader = PcapReader::new(Cursor::new(capture)).unwrap();
        assert!(matches!(
            reader.next_record(),
            Err(PcapError::OversizedRecord {
                incl_len: 2048,
                bound: 1024,
            })
        ));
    }

    #[test]
    fn damaged_tail_ends_the_capture() {
        let mut capture = header_le(65535, LINKTYPE_ETHERNET);
        capture.extend_from_slice(&record_le(1, 0, b"full record"));
        capture.extend_from_slice(&[0u8; 7]); // half a record header
        let mut reader = PcapReader::new(Cursor::new(capture)).unwrap();
        assert!(reader.next_record().unwrap().is_some());
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn write_then_read_round_trips() {
        let records = [
            Record {
                ts_sec: 9,
                ts_usec: 100,
                orig_len: 120,
                data: vec![1, 2, 3],
            },
            Record {
                ts_sec: 10,
                ts_usec: 0,
                orig_len: 4,
                data: vec![4, 5, 6, 7],
            },
        ];
        let mut out = Vec::new();
        {
            let mut writer = PcapWriter::new(&mut out, 65535, LINKTYPE_ETHERNET).unwrap();
            for record in &records {
                writer.write_record(record).unwrap();
            }
            writer.flush().unwrap();
        }
        let mut reader = PcapReader::new(Cursor::new(out)).unwrap();
        assert_eq!(reader.snaplen(), 65535);
        assert_eq!(reader.next_record().unwrap().unwrap(), records[0]);
        assert_eq!(reader.next_record().unwrap().unwrap(), records[1]);
        assert!(reader.next_record().unwrap().is_none());
    }
}
