// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The reader stage: capture records in, sequenced packets out.

use crate::packet::RawPacket;
use crate::queue::Tx;
use pcap::{PcapError, PcapReader};
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Pull records until EOF or stop, stamping each with its sequence
/// number. Dropping `output` on return is what begins pipeline shutdown.
///
/// Returns the number of packets read.
pub(crate) fn reader_loop<R: Read>(
    mut capture: PcapReader<R>,
    output: &Tx<RawPacket>,
    stop: &Arc<AtomicBool>,
) -> Result<u64, PcapError> {
    let mut seq: u64 = 0;
    loop {
        if stop.load(Ordering::Relaxed) {
            info!("stop requested, closing reader after {seq} packets");
            break;
        }
        let Some(record) = capture.next_record()? else {
            debug!("end of capture after {seq} packets");
            break;
        };
        if output.send(RawPacket { seq, record }).is_err() {
            // downstream died; nothing left to feed
            break;
        }
        seq += 1;
    }
    Ok(seq)
}
