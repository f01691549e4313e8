// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Pipeline sizing knobs.

use flow::table::{DEFAULT_IDLE_HORIZON_SECS, DEFAULT_MAX_FLOWS};
use std::thread;

/// Default capacity of the reader → balancer queue.
pub const DEFAULT_BALANCER_QUEUE: usize = 8192;
/// Default capacity of each balancer → worker queue.
pub const DEFAULT_WORKER_QUEUE: usize = 4096;
/// Default capacity of the shared writer queue.
pub const DEFAULT_WRITER_QUEUE: usize = 16_384;
/// Hard upper bound on balancer threads.
pub const MAX_BALANCERS: usize = 8;

/// Pipeline thread counts, queue capacities, and flow-table sizing.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Balancer thread count (1 to [`MAX_BALANCERS`]).
    pub balancers: usize,
    /// Fast-path worker count.
    pub workers: usize,
    /// Soft cap on flows per worker shard.
    pub max_flows: usize,
    /// Idle eviction horizon, in seconds of capture time.
    pub idle_horizon_secs: u64,
    /// Reorder output by the reader-assigned sequence number.
    pub ordered: bool,
    /// Capacity of the reader → balancer queue.
    pub balancer_queue_capacity: usize,
    /// Capacity of each balancer → worker queue.
    pub worker_queue_capacity: usize,
    /// Capacity of the shared writer queue.
    pub writer_queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> PipelineConfig {
        PipelineConfig {
            balancers: 1,
            workers: default_workers(),
            max_flows: DEFAULT_MAX_FLOWS,
            idle_horizon_secs: DEFAULT_IDLE_HORIZON_SECS,
            ordered: false,
            balancer_queue_capacity: DEFAULT_BALANCER_QUEUE,
            worker_queue_capacity: DEFAULT_WORKER_QUEUE,
            writer_queue_capacity: DEFAULT_WRITER_QUEUE,
        }
    }
}

impl PipelineConfig {
    /// Clamp every knob into its legal range.
    #[must_use]
    pub fn normalized(&self) -> PipelineConfig {
        PipelineConfig {
            balancers: self.balancers.clamp(1, MAX_BALANCERS),
            workers: self.workers.max(1),
            max_flows: self.max_flows.max(1),
            idle_horizon_secs: self.idle_horizon_secs,
            ordered: self.ordered,
            balancer_queue_capacity: self.balancer_queue_capacity.max(1),
            worker_queue_capacity: self.worker_queue_capacity.max(1),
            writer_queue_capacity: self.writer_queue_capacity.max(1),
        }
    }
}

/// Worker count when none is requested: hardware parallelism less the
/// reader and writer, but never less than one.
#[must_use]
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|cores| cores.get())
        .unwrap_or(4)
        .saturating_sub(2)
        .max(1)
}
