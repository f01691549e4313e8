// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![forbid(unsafe_code)]
#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Pipeline counters and the final report.
//!
//! Every stage owns a private [`StageStats`] (no atomics: single owner per
//! counter while the pipeline runs) and flushes it downstream on shutdown;
//! the writer absorbs all of them into one struct, which [`Report`]
//! renders.

mod report;

pub use report::Report;

use classify::AppLabel;
use net::packet::DissectErrorKind;

/// Counters carried by one pipeline stage.
///
/// A stage touches only the fields it is responsible for; `absorb`
/// composes them because every field is a sum.
#[derive(Debug, Clone, Default)]
pub struct StageStats {
    /// Packets written to the output capture.
    pub forwarded: u64,
    /// Packets suppressed by a block verdict.
    pub dropped: u64,
    /// Packets forwarded without flow tracking.
    pub pass_through: u64,
    /// Dissection soft errors by kind.
    pub dissect_errors: [u64; DissectErrorKind::COUNT],
    /// TLS payloads on :443 that were not a parseable `ClientHello`.
    pub malformed_tls: u64,
    /// HTTP requests on :80 with a broken `Host` header.
    pub malformed_http: u64,
    /// Flows created across all shards.
    pub flows_created: u64,
    /// Flows evicted because a shard hit its cap.
    pub flows_evicted_cap: u64,
    /// Flows evicted after idling past the horizon.
    pub flows_evicted_idle: u64,
    /// Per-application forwarded packets.
    pub app_forwarded: [u64; AppLabel::COUNT],
    /// Per-application dropped packets.
    pub app_dropped: [u64; AppLabel::COUNT],
}

impl StageStats {
    /// Count a packet forwarded on behalf of `app`.
    pub fn record_forwarded(&mut self, app: AppLabel) {
        self.forwarded += 1;
        self.app_forwarded[app.index()] += 1;
    }

    /// Count a packet dropped on behalf of `app`.
    pub fn record_dropped(&mut self, app: AppLabel) {
        self.dropped += 1;
        self.app_dropped[app.index()] += 1;
    }

    /// Count a pass-through packet, with the dissection error that caused
    /// it when there was one.
    pub fn record_pass_through(&mut self, kind: Option<DissectErrorKind>) {
        self.pass_through += 1;
        if let Some(kind) = kind {
            self.dissect_errors[kind.index()] += 1;
        }
    }

    /// Every packet the pipeline handled.
    #[must_use]
    pub const fn total_packets(&self) -> u64 {
        self.forwarded + self.dropped + self.pass_through
    }

    /// Packets attributed to `app`, forwarded or dropped.
    #[must_use]
    pub const fn app_total(&self, app: AppLabel) -> u64 {
        self.app_forwarded[app.index()] + self.app_dropped[app.index()]
    }

    /// Dropped packets attributed to `app`.
    #[must_use]
    pub const fn app_dropped(&self, app: AppLabel) -> u64 {
        self.app_dropped[app.index()]
    }

    /// Dissection soft errors of the given kind.
    #[must_use]
    pub const fn dissect_errors(&self, kind: DissectErrorKind) -> u64 {
        self.dissect_errors[kind.index()]
    }

    /// Fold another stage's counters into this one.
    pub fn absorb(&mut self, other: &StageStats) {
        self.forwarded += other.forwarded;
        self.dropped += other.dropped;
        self.pass_through += other.pass_through;
        for (mine, theirs) in self
            .dissect_errors
            .iter_mut()
            .zip(other.dissect_errors.iter())
        {
            *mine += *theirs;
        }
        self.malformed_tls += other.malformed_tls;
        self.malformed_http += other.malformed_http;
        self.flows_created += other.flows_created;
        self.flows_evicted_cap += other.flows_evicted_cap;
        self.flows_evicted_idle += other.flows_evicted_idle;
        for (mine, theirs) in self.app_forwarded.iter_mut().zip(other.app_forwarded.iter()) {
            *mine += *theirs;
        }
        for (mine, theirs) in self.app_dropped.iter_mut().zip(other.app_dropped.iter()) {
            *mine += *theirs;
        }
    }
}
