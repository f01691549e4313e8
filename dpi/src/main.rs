// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(rustdoc::all)]
#![allow(rustdoc::missing_crate_level_docs)]

use args::{CmdArgs, Parser};
use pcap::{PcapReader, PcapWriter};
use pipeline::PipelineError;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_INPUT: u8 = 3;
const EXIT_OUTPUT: u8 = 4;
const EXIT_INTERNAL: u8 = 5;

/// How long a stop signal waits for the stages to drain before the
/// process is terminated outright.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

fn init_logging() {
    tracing_subscriber::fmt()
        .with_target(true)
        .with_thread_names(true)
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

fn install_stop_handler(stop: &Arc<AtomicBool>) {
    let stop = stop.clone();
    let result = ctrlc::set_handler(move || {
        if stop.swap(true, Ordering::Relaxed) {
            // second signal: the user is done waiting
            std::process::exit(i32::from(EXIT_INTERNAL));
        }
        info!("stop requested, draining pipeline");
        thread::spawn(|| {
            thread::sleep(SHUTDOWN_DEADLINE);
            error!("shutdown deadline expired, terminating");
            std::process::exit(i32::from(EXIT_INTERNAL));
        });
    });
    if let Err(error) = result {
        error!("failed to install signal handler: {error}");
    }
}

fn main() -> ExitCode {
    init_logging();
    let args = CmdArgs::parse();

    let stop = Arc::new(AtomicBool::new(false));
    install_stop_handler(&stop);

    let input_file = match File::open(&args.input) {
        Ok(file) => file,
        Err(error) => {
            error!("cannot open {}: {error}", args.input.display());
            return ExitCode::from(EXIT_INPUT);
        }
    };
    let input = match PcapReader::new(BufReader::new(input_file)) {
        Ok(reader) => reader,
        Err(error) => {
            error!("cannot read {}: {error}", args.input.display());
            return ExitCode::from(EXIT_INPUT);
        }
    };

    let output_file = match File::create(&args.output) {
        Ok(file) => file,
        Err(error) => {
            error!("cannot create {}: {error}", args.output.display());
            return ExitCode::from(EXIT_OUTPUT);
        }
    };
    let output = match PcapWriter::new(
        BufWriter::new(output_file),
        input.snaplen(),
        input.link_type(),
    ) {
        Ok(writer) => writer,
        Err(error) => {
            error!("cannot write {}: {error}", args.output.display());
            return ExitCode::from(EXIT_OUTPUT);
        }
    };

    let rules = args.rules();
    for rule in rules.rules() {
        info!("policy: {rule}");
    }

    match pipeline::run(input, output, rules, &args.pipeline_config(), &stop) {
        Ok(report) => {
            print!("{report}");
            ExitCode::SUCCESS
        }
        Err(error @ PipelineError::Input(_)) => {
            error!("{error}");
            ExitCode::from(EXIT_INPUT)
        }
        Err(error @ PipelineError::Output(_)) => {
            error!("{error}");
            ExitCode::from(EXIT_OUTPUT)
        }
        Err(error @ PipelineError::Stage(_)) => {
            error!("{error}");
            ExitCode::from(EXIT_INTERNAL)
        }
    }
}
