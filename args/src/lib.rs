// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![forbid(unsafe_code)]
#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! The command line surface.

pub use clap::Parser;

use classify::AppLabel;
use flow::table::{DEFAULT_IDLE_HORIZON_SECS, DEFAULT_MAX_FLOWS};
use pipeline::PipelineConfig;
use policy::{Rule, RuleSet};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::str::FromStr;

/// Offline deep packet inspection: classify flows in a capture and write
/// the packets that survive policy to a new capture.
#[derive(Debug, Parser)]
#[command(name = "dpi_engine")]
#[command(version)]
#[command(about = "Classify and filter flows in a pcap capture", long_about = None)]
pub struct CmdArgs {
    /// Input capture (classic pcap, Ethernet link type).
    pub input: PathBuf,

    /// Output capture for forwarded packets.
    pub output: PathBuf,

    /// Block flows classified as this application (repeatable).
    #[arg(long = "block-app", value_name = "NAME", value_parser = AppLabel::from_str)]
    pub block_app: Vec<AppLabel>,

    /// Block flows whose server name or Host matches this domain suffix
    /// (repeatable, case-insensitive).
    #[arg(long = "block-domain", value_name = "SUFFIX")]
    pub block_domain: Vec<String>,

    /// Block flows with this IPv4 address on either end (repeatable).
    #[arg(long = "block-ip", value_name = "ADDR")]
    pub block_ip: Vec<Ipv4Addr>,

    /// Balancer thread count.
    #[arg(long = "lbs", value_name = "N", default_value_t = 1,
          value_parser = clap::value_parser!(u8).range(1..=8))]
    pub balancers: u8,

    /// Fast-path worker count (default: hardware parallelism minus two).
    #[arg(long = "fps", value_name = "N",
          value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: Option<u16>,

    /// Soft cap on tracked flows per worker shard.
    #[arg(long = "max-flows", value_name = "N", default_value_t = DEFAULT_MAX_FLOWS)]
    pub max_flows: usize,

    /// Idle eviction horizon, in seconds of capture time.
    #[arg(long = "idle", value_name = "SECONDS", default_value_t = DEFAULT_IDLE_HORIZON_SECS)]
    pub idle: u64,

    /// Write output in capture order (reorder by sequence number).
    #[arg(long)]
    pub ordered: bool,
}

impl CmdArgs {
    /// The policy assembled from the block/allow options, in the order
    /// given kinds are listed: apps, then domains, then addresses.
    #[must_use]
    pub fn rules(&self) -> RuleSet {
        let mut rules = Vec::new();
        rules.extend(self.block_app.iter().map(|app| Rule::BlockApp(*app)));
        rules.extend(
            self.block_domain
                .iter()
                .map(|suffix| Rule::BlockDomainSuffix(suffix.clone())),
        );
        rules.extend(self.block_ip.iter().map(|ip| Rule::BlockIp(*ip)));
        RuleSet::new(rules)
    }

    /// The pipeline sizing derived from the options.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            balancers: usize::from(self.balancers),
            workers: self.workers.map_or(defaults.workers, usize::from),
            max_flows: self.max_flows,
            idle_horizon_secs: self.idle,
            ordered: self.ordered,
            ..defaults
        }
    }
}
