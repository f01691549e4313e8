// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The items that travel between stages.

use classify::AppLabel;
use flow::time::CaptureTime;
use net::packet::{DissectErrorKind, ParsedPacket};
use stats::StageStats;

/// A captured frame with the reader-assigned sequence number.
///
/// The sequence number increases monotonically in capture order and is
/// used only for deterministic reordering in the writer.
#[derive(Debug, Clone)]
pub struct RawPacket {
    /// Position of this packet in the capture, starting at 0.
    pub seq: u64,
    /// The capture record (timestamp, original length, frame bytes).
    pub record: pcap::Record,
}

impl RawPacket {
    /// The frame bytes.
    #[must_use]
    pub fn frame(&self) -> &[u8] {
        &self.record.data
    }

    /// The capture timestamp of this packet.
    #[must_use]
    pub const fn time(&self) -> CaptureTime {
        CaptureTime::from_parts(self.record.ts_sec, self.record.ts_usec)
    }
}

/// What the pipeline decided about one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Write the frame to the output capture.
    Forward {
        /// Application the packet's flow is attributed to.
        app: AppLabel,
    },
    /// Suppress the frame.
    Drop {
        /// Application the packet's flow is attributed to.
        app: AppLabel,
    },
    /// Write the frame without flow tracking.
    PassThrough {
        /// The dissection error that made the packet untrackable, if any.
        error: Option<DissectErrorKind>,
    },
}

/// A packet on its way from a balancer to a worker.
#[derive(Debug, Clone)]
pub(crate) struct Dispatch {
    pub packet: RawPacket,
    pub parsed: ParsedPacket,
}

/// A message on its way to the writer.
#[derive(Debug, Clone)]
pub(crate) enum WriterMsg {
    /// A decided packet.
    Packet {
        packet: RawPacket,
        disposition: Disposition,
    },
    /// A stage's final counters, sent just before its senders drop.
    Flush(StageStats),
}
