// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The per-worker flow table.

use crate::key::FlowKey;
use crate::state::FlowState;
use crate::time::CaptureTime;
use ahash::RandomState;
use priority_queue::PriorityQueue;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Eviction priority: the least-recently-touched flow must surface first,
/// so the ordering on capture time is reversed.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Priority(CaptureTime);

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.0.cmp(&other.0) {
            Ordering::Equal => Ordering::Equal,
            Ordering::Less => Ordering::Greater,
            Ordering::Greater => Ordering::Less,
        }
    }
}

/// A worker shard's private `FlowKey → FlowState` map.
///
/// Keys are hashed with a process-random [`ahash::RandomState`], so an
/// adversary cannot aim collisions at the table. A last-touch priority
/// queue backs two eviction paths: a soft cap on live flows (evicting the
/// least-recently-touched) and an idle horizon on the capture clock.
#[derive(Debug)]
pub struct FlowTable {
    flows: HashMap<FlowKey, FlowState, RandomState>,
    touch: PriorityQueue<FlowKey, Priority, RandomState>,
    max_flows: usize,
    idle_horizon_micros: u64,
    evicted_cap: u64,
    evicted_idle: u64,
}

/// Default soft cap on flows per shard.
pub const DEFAULT_MAX_FLOWS: usize = 65_536;

/// Default idle horizon, in seconds of capture time.
pub const DEFAULT_IDLE_HORIZON_SECS: u64 = 300;

impl FlowTable {
    /// Create a table with the given soft cap and idle horizon.
    #[must_use]
    pub fn new(max_flows: usize, idle_horizon_secs: u64) -> FlowTable {
        FlowTable {
            flows: HashMap::with_hasher(RandomState::new()),
            touch: PriorityQueue::with_default_hasher(),
            max_flows: max_flows.max(1),
            idle_horizon_micros: idle_horizon_secs.saturating_mul(1_000_000),
            evicted_cap: 0,
            evicted_idle: 0,
        }
    }

    /// Look up the flow for `key`, creating it if absent, and touch it.
    ///
    /// Returns the state and whether it was just created. Reaps idle flows
    /// against `now` first; if the table sits at its cap, creating a new
    /// flow evicts exactly one least-recently-touched entry.
    pub fn get_or_insert(&mut self, key: FlowKey, now: CaptureTime) -> (&mut FlowState, bool) {
        self.reap_idle(now);
        let created = !self.flows.contains_key(&key);
        if created && self.flows.len() >= self.max_flows {
            self.evict_lru();
        }
        self.touch.push(key, Priority(now));
        let state = self
            .flows
            .entry(key)
            .or_insert_with(|| FlowState::new(key, now));
        (state, created)
    }

    /// Look up the flow for `key` without creating or touching it.
    #[must_use]
    pub fn get(&self, key: &FlowKey) -> Option<&FlowState> {
        self.flows.get(key)
    }

    /// Remove flows whose last touch lies more than the idle horizon
    /// before `now`.
    pub fn reap_idle(&mut self, now: CaptureTime) {
        while let Some((_, Priority(last))) = self.touch.peek() {
            if now.saturating_since(*last) <= self.idle_horizon_micros {
                break;
            }
            if let Some((key, _)) = self.touch.pop() {
                debug!(flow = %key, "evicting idle flow");
                self.flows.remove(&key);
                self.evicted_idle += 1;
            }
        }
    }

    fn evict_lru(&mut self) {
        if let Some((key, _)) = self.touch.pop() {
            debug!(flow = %key, "evicting least-recently-touched flow at cap");
            self.flows.remove(&key);
            self.evicted_cap += 1;
        }
    }

    /// Number of live flows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    /// Whether the table holds no flows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Flows evicted because the shard hit its cap.
    #[must_use]
    pub const fn evicted_cap(&self) -> u64 {
        self.evicted_cap
    }

    /// Flows evicted because they idled past the horizon.
    #[must_use]
    pub const fn evicted_idle(&self) -> u64 {
        self.evicted_idle
    }
}

#[allow(clippy::unwrap_used)] // valid in test code
#[cfg(test)]
mod test {
    use super::*;
    use crate::key::Endpoint;
    use net::packet::IpProto;
    use std::net::Ipv4Addr;

    fn key(index: u32) -> FlowKey {
        let octets = index.to_be_bytes();
        let (key, _) = FlowKey::canonicalize(
            IpProto::Tcp,
            Endpoint {
                ip: Ipv4Addr::new(10, octets[1], octets[2], octets[3]),
                port: 40_000,
            },
            Endpoint {
                ip: Ipv4Addr::new(192, 0, 2, 1),
                port: 443,
            },
        );
        key
    }

    fn at(sec: u32) -> CaptureTime {
        CaptureTime::from_parts(sec, 0)
    }

    #[test]
    fn create_then_find() {
        let mut table = FlowTable::new(16, 300);
        let (_, created) = table.get_or_insert(key(1), at(0));
        assert!(created);
        let (_, created) = table.get_or_insert(key(1), at(1));
        assert!(!created);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn cap_evicts_exactly_one_lru() {
        let mut table = FlowTable::new(4, u64::MAX / 2_000_000);
        for index in 0..4u32 {
            table.get_or_insert(key(index), at(index));
        }
        // touch flow 0 so flow 1 becomes the least recent
        table.get_or_insert(key(0), at(10));
        assert_eq!(table.len(), 4);

        let (_, created) = table.get_or_insert(key(99), at(11));
        assert!(created);
        assert_eq!(table.len(), 4);
        assert_eq!(table.evicted_cap(), 1);
        assert!(table.get(&key(1)).is_none(), "lru flow should be gone");
        assert!(table.get(&key(0)).is_some());
    }

    #[test]
    fn idle_flows_are_reaped() {
        let mut table = FlowTable::new(1024, 300);
        table.get_or_insert(key(1), at(0));
        table.get_or_insert(key(2), at(250));
        // at t=301 flow 1 has idled 301s, flow 2 only 51s
        table.reap_idle(at(301));
        assert!(table.get(&key(1)).is_none());
        assert!(table.get(&key(2)).is_some());
        assert_eq!(table.evicted_idle(), 1);
    }

    #[test]
    fn touched_flow_survives_idle_reaping() {
        let mut table = FlowTable::new(1024, 300);
        table.get_or_insert(key(1), at(0));
        table.get_or_insert(key(1), at(200));
        table.get_or_insert(key(1), at(400));
        table.reap_idle(at(500));
        assert!(table.get(&key(1)).is_some());
        assert_eq!(table.evicted_idle(), 0);
    }

    #[test]
    fn evicted_key_comes_back_as_new_flow() {
        let mut table = FlowTable::new(1024, 300);
        table.get_or_insert(key(7), at(0));
        table.reap_idle(at(1000));
        assert!(table.is_empty());
        let (state, created) = table.get_or_insert(key(7), at(1000));
        assert!(created);
        assert_eq!(state.first_seen(), at(1000));
    }
}
