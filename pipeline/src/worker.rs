// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The fast-path worker stage: flow tracking, classification, policy.

use crate::packet::{Disposition, Dispatch, WriterMsg};
use crate::queue::{Rx, Tx};
use flow::key::FlowKey;
use flow::state::{ClassifyState, FlowState, Verdict};
use flow::table::FlowTable;
use net::packet::{IpProto, ParsedPacket};
use net::{http, tls};
use policy::RuleSet;
use stats::StageStats;
use tracing::{debug, trace};

const TLS_PORT: u16 = 443;
const HTTP_PORT: u16 = 80;

/// Process dispatched packets until the input closes, then flush this
/// shard's counters to the writer.
///
/// The worker owns its [`FlowTable`] outright; nothing here takes a lock.
pub(crate) fn worker_loop(
    id: usize,
    input: &Rx<Dispatch>,
    writer: &Tx<WriterMsg>,
    rules: &RuleSet,
    max_flows: usize,
    idle_horizon_secs: u64,
) {
    let mut table = FlowTable::new(max_flows, idle_horizon_secs);
    let mut stats = StageStats::default();

    while let Ok(Dispatch { packet, parsed }) = input.recv() {
        trace!(worker = id, seq = packet.seq, "processing packet");
        let now = packet.time();
        let (key, direction) = FlowKey::from_packet(&parsed);
        let (flow, created) = table.get_or_insert(key, now);
        if created {
            stats.flows_created += 1;
        }
        flow.record(direction, packet.frame().len(), now);

        // the verdict applied to this packet is the one the flow carried
        // when the packet arrived; a verdict settled below takes effect
        // from the next packet on (no retro-drop)
        let drop_now = flow.verdict() == Verdict::Block;

        if flow.classify_state() == ClassifyState::NeedsL7 {
            inspect(flow, &parsed, packet.frame(), &mut stats);
        }
        if flow.verdict() == Verdict::Pending {
            match rules.decide(flow) {
                Some(verdict) => {
                    debug!(worker = id, flow = %flow.key(), ?verdict, "policy settled flow");
                    flow.settle(verdict);
                }
                None => {
                    if flow.classify_state() == ClassifyState::Classified {
                        flow.settle(Verdict::Forward);
                    }
                }
            }
        }

        let app = flow.app();
        let disposition = if drop_now {
            Disposition::Drop { app }
        } else {
            Disposition::Forward { app }
        };
        if writer
            .send(WriterMsg::Packet {
                packet,
                disposition,
            })
            .is_err()
        {
            return;
        }
    }

    stats.flows_evicted_cap = table.evicted_cap();
    stats.flows_evicted_idle = table.evicted_idle();
    debug!(
        worker = id,
        flows = table.len(),
        created = stats.flows_created,
        "worker draining"
    );
    let _ = writer.send(WriterMsg::Flush(stats));
}

/// Run the classification state machine for one packet of an unclassified
/// flow.
///
/// UDP flows and TCP flows with no extractor port classify immediately
/// from the port heuristic. TCP flows touching :443 or :80 wait for the
/// first client→server payload and spend their single extraction attempt
/// on it; a malformed payload consumes the attempt and leaves the flow
/// unlabelled.
fn inspect(flow: &mut FlowState, parsed: &ParsedPacket, frame: &[u8], stats: &mut StageStats) {
    let ports = flow.key().ports();
    let is_tls_flow = parsed.proto() == IpProto::Tcp && (ports.0 == TLS_PORT || ports.1 == TLS_PORT);
    let is_http_flow =
        parsed.proto() == IpProto::Tcp && (ports.0 == HTTP_PORT || ports.1 == HTTP_PORT);

    if is_tls_flow {
        // client→server is the direction addressing the service port
        if parsed.destination_port() != TLS_PORT || !parsed.has_payload() {
            return;
        }
        match tls::client_hello_sni(parsed.payload(frame)) {
            Ok(Some(name)) => {
                debug!(flow = %flow.key(), sni = %name, "extracted server name");
                flow.set_sni(name);
            }
            Ok(None) => trace!(flow = %flow.key(), "client hello without server name"),
            Err(error) => {
                debug!(flow = %flow.key(), %error, "malformed client hello");
                stats.malformed_tls += 1;
                // the first attempt is authoritative; no retries
                flow.mark_classified();
                return;
            }
        }
    } else if is_http_flow {
        if parsed.destination_port() != HTTP_PORT || !parsed.has_payload() {
            return;
        }
        let payload = parsed.payload(frame);
        if http::starts_with_method(payload) {
            match http::host_header(payload) {
                Ok(Some(host)) => {
                    debug!(flow = %flow.key(), host = %host, "extracted http host");
                    flow.set_http_host(host);
                }
                Ok(None) => trace!(flow = %flow.key(), "request without host header"),
                Err(error) => {
                    debug!(flow = %flow.key(), %error, "malformed http request");
                    stats.malformed_http += 1;
                    flow.mark_classified();
                    return;
                }
            }
        }
        // a non-request payload still spends the attempt: this is data
        // mid-stream, and a later request start would be a different
        // transaction anyway
    }

    let app = classify::classify(flow.sni(), flow.http_host(), parsed.proto(), ports);
    flow.set_app(app);
    flow.mark_classified();
}
