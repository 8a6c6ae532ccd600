// ResiConnect: ASA Optical Network Simulator written in Rust
// Copyright (C) 2022-2023 The ResiConnect Developers
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Run a full ASA fabric simulation and write the event trace, per-packet latency, and
//! throughput logs under the results directory. Prints the latency log filename on stdout for
//! the downstream analysis tooling.

use std::{collections::BTreeSet, fs, path::PathBuf};

use chrono::Local;
use clap::Parser;
use log::{error, info, LevelFilter};
use log4rs::{
    append::file::FileAppender,
    config::{Appender, Config as LogConfig, Logger, Root},
    encode::pattern::PatternEncoder,
};
use serde::Serialize;

use resiconnect::prelude::*;

/// Simulate an ASA optical fabric under Poisson traffic with injected link failures.
#[derive(Debug, Parser)]
struct Cli {
    /// Fabric scale n: n AWGRs per stage, n space switches, n^2 ToRs.
    #[clap(default_value = "11")]
    n: usize,
    /// Slowest probe interval in slots.
    #[clap(default_value = "3")]
    hello_interval: u64,
    /// Arrival rate in packets per nanosecond. Defaults to 0.003333333 * n^2 (5 Gbps per
    /// transmitter).
    #[clap(long)]
    rate: Option<f64>,
    /// Duration of traffic generation in nanoseconds.
    #[clap(long, default_value = "10000000")]
    runtime: u64,
    /// Slot duration in nanoseconds.
    #[clap(long, default_value = "1200")]
    slot: u64,
    /// Seed for traffic and controller randomness.
    #[clap(long, default_value = "0")]
    seed: u64,
    /// Redirection policy for traffic crossing failed links.
    #[clap(long, value_enum, default_value = "resi-connect")]
    reroute: ReroutePolicy,
    /// Inject a link failure, given as `time_ns,awgr_id,failed_port`. May be repeated.
    #[clap(long = "fail", value_parser = parse_failure)]
    failures: Vec<(u64, usize, usize)>,
    /// Directory for the log files.
    #[clap(long, default_value = "results")]
    results: PathBuf,
    /// Write the full debug-level event trace.
    #[clap(short, long)]
    verbose: bool,
}

fn parse_failure(s: &str) -> Result<(u64, usize, usize), String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("expected time_ns,awgr_id,failed_port, got `{s}`"));
    }
    let time = parts[0].trim().parse().map_err(|e| format!("bad time: {e}"))?;
    let awgr = parts[1].trim().parse().map_err(|e| format!("bad awgr id: {e}"))?;
    let port = parts[2].trim().parse().map_err(|e| format!("bad port: {e}"))?;
    Ok((time, awgr, port))
}

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    n: usize,
    hello_interval: u64,
    rate: f64,
    runtime: u64,
    slot_duration: u64,
    seed: u64,
    generated_pkts: u64,
    received_pkts: u64,
    overflow_drop: u64,
    link_drop: u64,
    queued_pkts: usize,
    hello_pkts: u64,
    failed_links: &'a BTreeSet<Link>,
    fault_found_at: Option<u64>,
}

fn init_logging(
    results: &PathBuf,
    prefix: &str,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let trace = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("[{l}] : {m}{n}")))
        .build(results.join(format!("{prefix}--ASA.log")))?;
    let latency = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("[{l}] : {m}{n}")))
        .build(results.join(format!("{prefix}--Latency.log")))?;
    let throughput = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{m}{n}")))
        .build(results.join(format!("{prefix}--Throughput.log")))?;

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let config = LogConfig::builder()
        .appender(Appender::builder().build("trace", Box::new(trace)))
        .appender(Appender::builder().build("latency", Box::new(latency)))
        .appender(Appender::builder().build("throughput", Box::new(throughput)))
        .logger(
            Logger::builder()
                .appender("latency")
                .additive(false)
                .build("latency", LevelFilter::Info),
        )
        .logger(
            Logger::builder()
                .appender("throughput")
                .additive(false)
                .build("throughput", LevelFilter::Info),
        )
        .build(Root::builder().appender("trace").build(level))?;
    log4rs::init_config(config)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();
    let rate = args.rate.unwrap_or(0.003333333333 * (args.n * args.n) as f64);

    fs::create_dir_all(&args.results)?;
    let prefix = Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string();
    init_logging(&args.results, &prefix, args.verbose)?;

    let mut net = Network::new(Config {
        n: args.n,
        slot_duration: args.slot,
        hello_interval: args.hello_interval,
        reroute: args.reroute,
        seed: args.seed,
    })?;
    let mut generator =
        PoissonEventGenerator::new(args.n, rate, args.runtime, args.slot, args.seed)?
            .with_link_failures(args.failures.clone());

    info!(
        "Intialized ASA Network with N = {}, Arrival Rate = {}, Slot Duration = {}, Runtime = {}",
        args.n, rate, args.slot, args.runtime
    );

    if let Err(e) = net.run(&mut generator) {
        error!("Simulation aborted: {e}");
        eprintln!("Simulation aborted: {e}");
        return Err(e.into());
    }

    info!("Generated Packets {}", net.generated_pkts());
    info!("Received Packets {}", net.received_pkts());
    info!("Overflow Drops {}", net.overflow_drop());
    info!("Link Drops {}", net.link_drop());

    let summary = RunSummary {
        n: args.n,
        hello_interval: args.hello_interval,
        rate,
        runtime: args.runtime,
        slot_duration: args.slot,
        seed: args.seed,
        generated_pkts: net.generated_pkts(),
        received_pkts: net.received_pkts(),
        overflow_drop: net.overflow_drop(),
        link_drop: net.link_drop(),
        queued_pkts: net.queued_pkts(),
        hello_pkts: net.controller().hello_count(),
        failed_links: net.controller().failed_links(),
        fault_found_at: net.controller().fault_found_at(),
    };
    let summary_path = args.results.join(format!("{prefix}--Summary.json"));
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;

    // the analysis tooling picks the latency log up from stdout
    println!("{prefix}--Latency.log");
    Ok(())
}
