// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Per-flow state.

use crate::key::{Direction, FlowKey};
use crate::time::CaptureTime;
use classify::AppLabel;

/// The block/forward decision attached to a flow.
///
/// Transitions are monotonic: `Pending` settles into `Forward` or `Block`
/// exactly once and never reverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    /// No decision yet; packets pass.
    #[default]
    Pending,
    /// The flow is allowed.
    Forward,
    /// The flow is blocked; packets drop without re-evaluation.
    Block,
}

/// Where a flow stands in the classification state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassifyState {
    /// Waiting for an L7 payload worth inspecting.
    #[default]
    NeedsL7,
    /// Classification ran; `app` and the L7 fields are final.
    Classified,
}

/// Everything one worker knows about one flow.
///
/// Owned by exactly one shard for its lifetime; nothing here is shared, so
/// plain fields suffice.
#[derive(Debug, Clone)]
pub struct FlowState {
    key: FlowKey,
    first_seen: CaptureTime,
    last_seen: CaptureTime,
    packets_ab: u64,
    packets_ba: u64,
    bytes_ab: u64,
    bytes_ba: u64,
    sni: Option<String>,
    http_host: Option<String>,
    app: AppLabel,
    verdict: Verdict,
    classify_state: ClassifyState,
}

impl FlowState {
    /// Create the state for a flow first seen at `now`.
    #[must_use]
    pub fn new(key: FlowKey, now: CaptureTime) -> FlowState {
        FlowState {
            key,
            first_seen: now,
            last_seen: now,
            packets_ab: 0,
            packets_ba: 0,
            bytes_ab: 0,
            bytes_ba: 0,
            sni: None,
            http_host: None,
            app: AppLabel::Unknown,
            verdict: Verdict::Pending,
            classify_state: ClassifyState::NeedsL7,
        }
    }

    /// The canonical key of this flow.
    #[must_use]
    pub const fn key(&self) -> FlowKey {
        self.key
    }

    /// When the first packet of this flow was captured.
    #[must_use]
    pub const fn first_seen(&self) -> CaptureTime {
        self.first_seen
    }

    /// When the most recent packet of this flow was captured.
    #[must_use]
    pub const fn last_seen(&self) -> CaptureTime {
        self.last_seen
    }

    /// Account one packet of `bytes` bytes travelling `direction`.
    pub fn record(&mut self, direction: Direction, bytes: usize, now: CaptureTime) {
        match direction {
            Direction::AtoB => {
                self.packets_ab += 1;
                self.bytes_ab += bytes as u64;
            }
            Direction::BtoA => {
                self.packets_ba += 1;
                self.bytes_ba += bytes as u64;
            }
        }
        if now > self.last_seen {
            self.last_seen = now;
        }
    }

    /// Packets seen from the A side.
    #[must_use]
    pub const fn packets_ab(&self) -> u64 {
        self.packets_ab
    }

    /// Packets seen from the B side.
    #[must_use]
    pub const fn packets_ba(&self) -> u64 {
        self.packets_ba
    }

    /// Bytes seen from the A side.
    #[must_use]
    pub const fn bytes_ab(&self) -> u64 {
        self.bytes_ab
    }

    /// Bytes seen from the B side.
    #[must_use]
    pub const fn bytes_ba(&self) -> u64 {
        self.bytes_ba
    }

    /// The server name, if one was extracted.
    #[must_use]
    pub fn sni(&self) -> Option<&str> {
        self.sni.as_deref()
    }

    /// The `Host` header value, if one was extracted.
    #[must_use]
    pub fn http_host(&self) -> Option<&str> {
        self.http_host.as_deref()
    }

    /// Set the server name. Write-once: a second assignment is ignored.
    pub fn set_sni(&mut self, name: String) {
        if self.sni.is_none() {
            self.sni = Some(name);
        }
    }

    /// Set the `Host` value. Write-once: a second assignment is ignored.
    pub fn set_http_host(&mut self, host: String) {
        if self.http_host.is_none() {
            self.http_host = Some(host);
        }
    }

    /// The application label of this flow.
    #[must_use]
    pub const fn app(&self) -> AppLabel {
        self.app
    }

    /// Assign the application label. Write-once: once the label is
    /// anything but [`AppLabel::Unknown`] further assignments are ignored.
    pub fn set_app(&mut self, app: AppLabel) {
        if self.app == AppLabel::Unknown {
            self.app = app;
        }
    }

    /// The classification state of this flow.
    #[must_use]
    pub const fn classify_state(&self) -> ClassifyState {
        self.classify_state
    }

    /// Mark classification as final for this flow.
    pub fn mark_classified(&mut self) {
        self.classify_state = ClassifyState::Classified;
    }

    /// The current verdict.
    #[must_use]
    pub const fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Settle the verdict. Only a `Pending` flow can settle, and only to a
    /// non-`Pending` verdict; anything else is a no-op.
    pub fn settle(&mut self, verdict: Verdict) {
        if self.verdict == Verdict::Pending && verdict != Verdict::Pending {
            self.verdict = verdict;
        }
    }
}
