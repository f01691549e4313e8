// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The writer stage: survivors to the output capture, counters to the
//! report.

use crate::packet::{Disposition, RawPacket, WriterMsg};
use crate::queue::Rx;
use pcap::{PcapError, PcapWriter};
use stats::{Report, StageStats};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io::Write;
use tracing::{debug, warn};

/// Drain the writer queue until every producer is gone, then finalize.
///
/// In ordered mode records are held in a sequence-keyed buffer and
/// released in strict capture order. Every packet record reaches the
/// writer (dropped packets included, they just are not written), so the
/// sequence numbers have no gaps and the buffer never holds more than the
/// pipeline's total in-flight capacity.
pub(crate) fn writer_loop<W: Write>(
    mut capture: PcapWriter<W>,
    input: &Rx<WriterMsg>,
    ordered: bool,
) -> Result<Report, PcapError> {
    let mut stats = StageStats::default();
    let mut reorder = ReorderBuffer::new();

    while let Ok(message) = input.recv() {
        match message {
            WriterMsg::Flush(flushed) => {
                debug!("absorbing a stage's counters");
                stats.absorb(&flushed);
            }
            WriterMsg::Packet {
                packet,
                disposition,
            } => {
                if ordered {
                    reorder.push(packet, disposition);
                    while let Some((packet, disposition)) = reorder.pop_ready() {
                        emit(&mut capture, &mut stats, &packet, disposition)?;
                    }
                } else {
                    emit(&mut capture, &mut stats, &packet, disposition)?;
                }
            }
        }
    }
    // under a forced shutdown a sequence number may never arrive; emit
    // whatever is buffered, still in order
    let leftovers = reorder.drain();
    if !leftovers.is_empty() {
        warn!(count = leftovers.len(), "emitting reorder leftovers");
    }
    for (packet, disposition) in leftovers {
        emit(&mut capture, &mut stats, &packet, disposition)?;
    }
    capture.flush()?;
    Ok(Report::new(stats))
}

fn emit<W: Write>(
    capture: &mut PcapWriter<W>,
    stats: &mut StageStats,
    packet: &RawPacket,
    disposition: Disposition,
) -> Result<(), PcapError> {
    match disposition {
        Disposition::Forward { app } => {
            capture.write_record(&packet.record)?;
            stats.record_forwarded(app);
        }
        Disposition::Drop { app } => {
            stats.record_dropped(app);
        }
        Disposition::PassThrough { error } => {
            capture.write_record(&packet.record)?;
            stats.record_pass_through(error);
        }
    }
    Ok(())
}

struct Pending {
    packet: RawPacket,
    disposition: Disposition,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.packet.seq == other.packet.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: the smallest sequence number surfaces first
        other.packet.seq.cmp(&self.packet.seq)
    }
}

/// A sequence-keyed release buffer.
struct ReorderBuffer {
    heap: BinaryHeap<Pending>,
    next_seq: u64,
}

impl ReorderBuffer {
    fn new() -> ReorderBuffer {
        ReorderBuffer {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    fn push(&mut self, packet: RawPacket, disposition: Disposition) {
        self.heap.push(Pending {
            packet,
            disposition,
        });
    }

    /// The next packet in sequence, if it has arrived.
    fn pop_ready(&mut self) -> Option<(RawPacket, Disposition)> {
        if self.heap.peek()?.packet.seq != self.next_seq {
            return None;
        }
        self.next_seq += 1;
        self.heap
            .pop()
            .map(|pending| (pending.packet, pending.disposition))
    }

    /// Everything still buffered, in sequence order.
    fn drain(&mut self) -> Vec<(RawPacket, Disposition)> {
        let mut rest = Vec::with_capacity(self.heap.len());
        while let Some(pending) = self.heap.pop() {
            rest.push((pending.packet, pending.disposition));
        }
        rest
    }
}
