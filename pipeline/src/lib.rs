// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![forbid(unsafe_code)]
#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! The packet pipeline: reader, balancer(s), fast-path workers, writer.
//!
//! Stages are native threads joined by bounded queues; the only suspension
//! points are queue operations, and the only shared state is the immutable
//! rule set. Dispatch is flow-affine (a flow's packets always land on the
//! same worker), which is what lets every worker own its flow table
//! outright. Shutdown propagates forward by queue closure: each stage
//! drops its senders when its input closes, and the writer finalizes the
//! capture and the report once the last sender is gone.

mod balancer;
mod config;
mod packet;
pub mod queue;
mod reader;
mod worker;
mod writer;

pub use config::PipelineConfig;
pub use packet::{Disposition, RawPacket};

use crate::balancer::balancer_loop;
use crate::packet::Dispatch;
use crate::reader::reader_loop;
use crate::worker::worker_loop;
use crate::writer::writer_loop;
use pcap::{PcapError, PcapReader, PcapWriter};
use policy::RuleSet;
use stats::Report;
use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use tracing::{debug, info};

/// A fatal pipeline failure.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input capture could not be read.
    #[error("input capture: {0}")]
    Input(PcapError),
    /// The output capture could not be written.
    #[error("output capture: {0}")]
    Output(PcapError),
    /// A stage thread panicked or could not be spawned.
    #[error("pipeline stage '{0}' failed")]
    Stage(&'static str),
}

/// Run the pipeline to completion.
///
/// Consumes `input` until EOF (or until `stop` is raised), writes
/// forwarded frames to `output`, and returns the merged [`Report`].
///
/// # Errors
///
/// Returns a [`PipelineError`] on fatal capture I/O or a panicked stage.
pub fn run<R, W>(
    input: PcapReader<R>,
    output: PcapWriter<W>,
    rules: RuleSet,
    config: &PipelineConfig,
    stop: &Arc<AtomicBool>,
) -> Result<Report, PipelineError>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let config = config.normalized();
    info!(
        balancers = config.balancers,
        workers = config.workers,
        ordered = config.ordered,
        "starting pipeline"
    );

    let rules = Arc::new(rules);
    // one seed for every balancer, so shard choice is a pure function of
    // the flow key no matter which balancer thread picks the packet up
    let shard_hasher = ahash::RandomState::new();

    let (balancer_tx, balancer_rx) = queue::bounded(config.balancer_queue_capacity);
    let (writer_tx, writer_rx) = queue::bounded(config.writer_queue_capacity);

    let mut to_workers = Vec::with_capacity(config.workers);
    let mut worker_inputs = Vec::with_capacity(config.workers);
    for _ in 0..config.workers {
        let (tx, rx) = queue::bounded::<Dispatch>(config.worker_queue_capacity);
        to_workers.push(tx);
        worker_inputs.push(rx);
    }

    let writer_handle = spawn_named("dpi-writer".to_owned(), "writer", {
        let writer_rx = writer_rx;
        let ordered = config.ordered;
        move || writer_loop(output, &writer_rx, ordered)
    })?;

    let mut worker_handles = Vec::with_capacity(config.workers);
    for (id, worker_input) in worker_inputs.into_iter().enumerate() {
        let writer_tx = writer_tx.clone();
        let rules = rules.clone();
        let max_flows = config.max_flows;
        let idle = config.idle_horizon_secs;
        let handle = spawn_named(format!("dpi-worker-{id}"), "worker", move || {
            worker_loop(id, &worker_input, &writer_tx, &rules, max_flows, idle);
        })?;
        worker_handles.push(handle);
    }

    let mut balancer_handles = Vec::with_capacity(config.balancers);
    for id in 0..config.balancers {
        let balancer_rx = balancer_rx.clone();
        let to_workers = to_workers.clone();
        let writer_tx = writer_tx.clone();
        let shard_hasher = shard_hasher.clone();
        let handle = spawn_named(format!("dpi-balancer-{id}"), "balancer", move || {
            balancer_loop(&balancer_rx, &to_workers, &writer_tx, &shard_hasher);
        })?;
        balancer_handles.push(handle);
    }
    // the stages own every sender clone from here on; dropping ours arms
    // the forward closure chain
    drop(to_workers);
    drop(writer_tx);
    drop(balancer_rx);

    let reader_handle = spawn_named("dpi-reader".to_owned(), "reader", {
        let stop = stop.clone();
        move || reader_loop(input, &balancer_tx, &stop)
    })?;

    // join every stage before surfacing errors, so a fatal reader error
    // still lets downstream stages drain and release the output file
    let reader_result = reader_handle
        .join()
        .map_err(|_| PipelineError::Stage("reader"));
    for handle in balancer_handles {
        handle.join().map_err(|_| PipelineError::Stage("balancer"))?;
    }
    for handle in worker_handles {
        handle.join().map_err(|_| PipelineError::Stage("worker"))?;
    }
    let writer_result = writer_handle
        .join()
        .map_err(|_| PipelineError::Stage("writer"));

    let packets_read = reader_result?.map_err(PipelineError::Input)?;
    debug!(packets_read, "reader finished");
    let report = writer_result?.map_err(PipelineError::Output)?;

    info!(
        total = report.stats().total_packets(),
        forwarded = report.stats().forwarded,
        dropped = report.stats().dropped,
        "pipeline finished"
    );
    Ok(report)
}

fn spawn_named<F, T>(
    name: String,
    stage: &'static str,
    body: F,
) -> Result<thread::JoinHandle<T>, PipelineError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(name)
        .spawn(body)
        .map_err(|_| PipelineError::Stage(stage))
}
