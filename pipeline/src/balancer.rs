// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The load balancer stage: dissect just enough to pick a worker shard.

use crate::packet::{Disposition, Dispatch, RawPacket, WriterMsg};
use crate::queue::{Rx, Tx};
use flow::key::FlowKey;
use net::packet::dissect;
use std::hash::BuildHasher;
use tracing::debug;

/// Dissect each packet and push it to the worker its flow hashes to.
/// Packets that cannot be dissected bypass the workers and go straight to
/// the writer as pass-through.
///
/// Worker affinity depends only on the canonical flow key and the shared
/// hasher seed, never on which balancer thread handled the packet.
pub(crate) fn balancer_loop(
    input: &Rx<RawPacket>,
    workers: &[Tx<Dispatch>],
    writer: &Tx<WriterMsg>,
    shard_hasher: &ahash::RandomState,
) {
    while let Ok(packet) = input.recv() {
        match dissect(packet.frame()) {
            Ok(parsed) => {
                let (key, _) = FlowKey::from_packet(&parsed);
                #[allow(clippy::cast_possible_truncation)] // modulo of worker count
                let shard = (shard_hasher.hash_one(key) % workers.len() as u64) as usize;
                if workers[shard].send(Dispatch { packet, parsed }).is_err() {
                    return;
                }
            }
            Err(error) => {
                debug!(seq = packet.seq, %error, "pass-through packet");
                let message = WriterMsg::Packet {
                    disposition: Disposition::PassThrough {
                        error: Some(error.kind()),
                    },
                    packet,
                };
                if writer.send(message).is_err() {
                    return;
                }
            }
        }
    }
}

#[allow(clippy::unwrap_used, clippy::panic)] // valid in test code
#[cfg(test)]
mod test {
    use super::*;
    use crate::queue;
    use net::packet::DissectErrorKind;
    use net::tcp::TcpFlags;
    use net::test_utils::tcp_frame;
    use std::net::Ipv4Addr;

    fn raw(seq: u64, data: Vec<u8>) -> RawPacket {
        RawPacket {
            seq,
            record: pcap::Record {
                ts_sec: 0,
                ts_usec: 0,
                orig_len: u32::try_from(data.len()).unwrap(),
                data,
            },
        }
    }

    #[test]
    fn both_directions_reach_the_same_worker() {
        let hasher = ahash::RandomState::new();
        let (input_tx, input_rx) = queue::bounded(16);
        let (writer_tx, _writer_rx) = queue::bounded(16);
        let mut to_workers = Vec::new();
        let mut worker_inputs = Vec::new();
        for _ in 0..4 {
            let (tx, rx) = queue::bounded::<Dispatch>(16);
            to_workers.push(tx);
            worker_inputs.push(rx);
        }

        let client = Ipv4Addr::new(192, 168, 0, 7);
        let server = Ipv4Addr::new(142, 250, 80, 46);
        input_tx
            .send(raw(
                0,
                tcp_frame(client, 49152, server, 443, TcpFlags::SYN, b""),
            ))
            .unwrap();
        input_tx
            .send(raw(
                1,
                tcp_frame(server, 443, client, 49152, TcpFlags::SYN | TcpFlags::ACK, b""),
            ))
            .unwrap();
        drop(input_tx);

        balancer_loop(&input_rx, &to_workers, &writer_tx, &hasher);
        drop(to_workers);

        let loaded: Vec<Vec<u64>> = worker_inputs
            .iter()
            .map(|rx| {
                let mut seqs = Vec::new();
                while let Ok(dispatch) = rx.recv() {
                    seqs.push(dispatch.packet.seq);
                }
                seqs
            })
            .collect();
        let nonempty: Vec<&Vec<u64>> = loaded.iter().filter(|seqs| !seqs.is_empty()).collect();
        assert_eq!(nonempty.len(), 1, "one worker owns the whole flow");
        assert_eq!(nonempty[0].as_slice(), &[0, 1]);
    }

    #[test]
    fn unparseable_packet_passes_through() {
        let hasher = ahash::RandomState::new();
        let (input_tx, input_rx) = queue::bounded(16);
        let (writer_tx, writer_rx) = queue::bounded(16);
        let (worker_tx, worker_rx) = queue::bounded::<Dispatch>(16);

        input_tx.send(raw(0, vec![0xde, 0xad])).unwrap();
        drop(input_tx);
        balancer_loop(&input_rx, &[worker_tx], &writer_tx, &hasher);
        drop(writer_tx);

        assert!(worker_rx.recv().is_err(), "no dispatch for junk");
        match writer_rx.recv().unwrap() {
            WriterMsg::Packet {
                packet,
                disposition: Disposition::PassThrough { error },
            } => {
                assert_eq!(packet.seq, 0);
                assert_eq!(error, Some(DissectErrorKind::Truncated));
            }
            other => panic!("unexpected writer message: {other:?}"),
        }
    }
}
