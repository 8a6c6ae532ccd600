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

//! # Top-level Network module
//!
//! This module owns every component of the three-stage ASA fabric, wires them by port, and
//! drives the whole simulation from an event stream.

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    awgr::Awgr,
    controller::{Controller, ReroutePolicy, Schedule},
    event::{Event, EventSource},
    packet::Packet,
    receiver::{Delivery, Receiver},
    space_switch::SpaceSwitch,
    transmitter::Transmitter,
    types::{NetworkError, RxId, Stage},
};

/// Largest supported fabric scale. The per-slot crossbar matching searches over column subsets,
/// which is exact but exponential in `n`.
pub const MAX_SCALE: usize = 16;

/// Parameters of a simulated fabric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Fabric scale: `n` AWGRs per stage, `n` space switches, `n^2` ToRs.
    pub n: usize,
    /// Slot duration in nanoseconds.
    pub slot_duration: u64,
    /// Slowest probe interval (in slots); also the number of live frequency bands.
    pub hello_interval: u64,
    /// Redirection policy for traffic crossing failed links.
    pub reroute: ReroutePolicy,
    /// Seed for all controller-side randomness.
    pub seed: u64,
}

impl Config {
    /// Create a configuration with the default slot duration (1200 ns), ResiConnect rerouting,
    /// and seed 0.
    pub fn new(n: usize, hello_interval: u64) -> Self {
        Self {
            n,
            slot_duration: 1200,
            hello_interval,
            reroute: ReroutePolicy::default(),
            seed: 0,
        }
    }

    fn validate(&self) -> Result<(), NetworkError> {
        if self.n < 2 || self.n > MAX_SCALE {
            return Err(NetworkError::InvalidConfig(format!(
                "fabric scale must be in 2..={MAX_SCALE}, got {}",
                self.n
            )));
        }
        if self.hello_interval < 1 {
            return Err(NetworkError::InvalidConfig(
                "hello interval must be at least 1 slot".to_string(),
            ));
        }
        if self.slot_duration == 0 {
            return Err(NetworkError::InvalidConfig(
                "slot duration must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(11, 3)
    }
}

/// # Network struct
///
/// The network owns every component of the fabric by value — `n^2` transmitters and receivers,
/// `n` AWGRs per stage, `n` space switches, and the controller — and wires them by port index.
/// Components never hold references to each other; forwarding walks the stages hop by hop here,
/// and the controller borrows the component slices it needs per call.
///
/// ```rust
/// use resiconnect::prelude::*;
///
/// fn main() -> Result<(), NetworkError> {
///     let mut net = Network::new(Config::new(3, 3))?;
///     let mut events = ScriptedEvents::new(vec![
///         Event::PacketArrival {
///             time: 0,
///             packet: Packet::new(PacketId::Data(1), 0, 7, 0),
///         },
///         Event::TimeSlotEnd { time: 1200, slot: 0 },
///         Event::EventSetEnd,
///     ]);
///     net.run(&mut events)?;
///     assert_eq!(net.received_pkts(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Network {
    pub(crate) n: usize,
    pub(crate) slot_duration: u64,
    pub(crate) controller: Controller,
    pub(crate) transmitters: Vec<Transmitter>,
    pub(crate) receivers: Vec<Receiver>,
    pub(crate) stage_one_awgrs: Vec<Awgr>,
    pub(crate) stage_three_awgrs: Vec<Awgr>,
    pub(crate) space_switches: Vec<SpaceSwitch>,
    pub(crate) generated_pkts: u64,
    pub(crate) received_pkts: u64,
    pub(crate) overflow_drop: u64,
    pub(crate) link_drop: u64,
}

impl Network {
    /// Build a fabric from the given configuration.
    pub fn new(config: Config) -> Result<Self, NetworkError> {
        config.validate()?;
        let n = config.n;

        let mut controller = Controller::new(n, config.slot_duration, config.hello_interval, config.seed);
        controller.set_reroute_policy(config.reroute);

        let mut transmitters = Vec::with_capacity(n * n);
        let mut receivers = Vec::with_capacity(n * n);
        let mut stage_one_awgrs = Vec::with_capacity(n);
        let mut stage_three_awgrs = Vec::with_capacity(n);
        let mut space_switches = Vec::with_capacity(n);
        for i in 0..n {
            space_switches.push(SpaceSwitch::new(n, i));
            stage_one_awgrs.push(Awgr::new(n, i, Stage::One));
            stage_three_awgrs.push(Awgr::new(n, i, Stage::Three));
            for j in 0..n {
                transmitters.push(Transmitter::new(i * n + j, i, j));
                receivers.push(Receiver::new(i * n + j, i, j));
            }
        }

        Ok(Self {
            n,
            slot_duration: config.slot_duration,
            controller,
            transmitters,
            receivers,
            stage_one_awgrs,
            stage_three_awgrs,
            space_switches,
            generated_pkts: 0,
            received_pkts: 0,
            overflow_drop: 0,
            link_drop: 0,
        })
    }

    /// The fabric scale `n`.
    pub fn n(&self) -> usize {
        self.n
    }

    /// The slot duration in nanoseconds.
    pub fn slot_duration(&self) -> u64 {
        self.slot_duration
    }

    /// The controller of this network.
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Mutable access to the controller (to flip behavior flags before a run).
    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    /// Number of data packets handed to the fabric so far.
    pub fn generated_pkts(&self) -> u64 {
        self.generated_pkts
    }

    /// Number of data packets terminated at their receivers so far.
    pub fn received_pkts(&self) -> u64 {
        self.received_pkts
    }

    /// Number of packets dropped at full transmitter buffers.
    pub fn overflow_drop(&self) -> u64 {
        self.overflow_drop
    }

    /// Number of packets dropped at failed AWGR ports.
    pub fn link_drop(&self) -> u64 {
        self.link_drop
    }

    /// Number of packets still awaiting scheduling at the space switches.
    pub fn queued_pkts(&self) -> usize {
        self.space_switches.iter().map(|s| s.queue_len()).sum()
    }

    /// Drive the network from the given event source until it is exhausted. The controller's
    /// expected-failure budget is taken from the source.
    pub fn run<S: EventSource>(&mut self, source: &mut S) -> Result<(), NetworkError> {
        self.controller.set_expected_failures(source.link_fail_count());
        while let Some(event) = source.next_event() {
            self.dispatch(event)?;
        }
        Ok(())
    }

    /// Dispatch a single event.
    pub fn dispatch(&mut self, event: Event) -> Result<(), NetworkError> {
        match event {
            Event::PacketArrival { packet, .. } => {
                self.generated_pkts += 1;
                self.packet_arrival(packet);
                Ok(())
            }
            Event::TimeSlotEnd { slot, .. } => self.timeslot_end(slot),
            Event::LinkFailure { time, awgr, port } => {
                info!("Failure at {time}.");
                self.stage_one_awgrs[awgr].register_failure(port);
                Ok(())
            }
            Event::EventSetEnd => {
                self.eventset_end();
                Ok(())
            }
        }
    }

    /// A packet arrives at its source transmitter. Rerouted packets re-enter through their new
    /// transmitter (paying that buffer's admission again) until they are queued or dropped.
    fn packet_arrival(&mut self, mut pkt: Packet) {
        loop {
            let tx = pkt.src;
            if !self.transmitters[tx].accept() {
                debug!("[Packet {}] : Dropped at Transmitter {} (buffer full)", pkt.id, tx);
                self.overflow_drop += 1;
                return;
            }
            info!("[Packet {}] : Arrived at Transmitter {}", pkt.id, tx);
            match self
                .controller
                .enqueue_scheduler(pkt, &mut self.space_switches, &self.transmitters)
            {
                Schedule::Queued => return,
                Schedule::Reroute(redirected) => pkt = redirected,
            }
        }
    }

    /// A slot boundary: run fault tracking first (probes enqueued at the head of the switch
    /// queues take part in the upcoming allotment), then allot the closing slot and forward
    /// every dispatched packet through the fabric.
    fn timeslot_end(&mut self, slot: u64) -> Result<(), NetworkError> {
        info!("[Timeslot {slot}] : Timeslot ENDING....");
        let current_slot = self.controller.current_slot();
        self.controller
            .fault_tracking(current_slot, &mut self.space_switches)?;
        let launches =
            self.controller
                .allot_slots(slot, &mut self.space_switches, &mut self.transmitters);
        for pkt in launches {
            self.deliver(pkt);
        }
        info!("[Timeslot {slot}] : Timeslot ENDED, Next Timeslot STARTING...");
        Ok(())
    }

    /// The event set ended: keep allotting slots until every space switch queue is drained.
    fn eventset_end(&mut self) {
        let current_slot = self.controller.current_slot();
        let launches = self.controller.clear_queue(
            current_slot,
            &mut self.space_switches,
            &mut self.transmitters,
        );
        for pkt in launches {
            self.deliver(pkt);
        }
    }

    /// Forward a dispatched packet through the three stages. Returns the terminating receiver
    /// and the packet for data deliveries; probes are reported to the controller and drops are
    /// counted.
    pub(crate) fn deliver(&mut self, mut pkt: Packet) -> Option<(RxId, Packet)> {
        let n = self.n;
        let src_awgr = pkt.src / n;
        let src_port = pkt.src % n;

        let switch_id = match self.stage_one_awgrs[src_awgr].receive(src_port, &mut pkt) {
            Some(out) => out,
            None => {
                self.link_drop += 1;
                return None;
            }
        };
        let out_awgr = match self.space_switches[switch_id].receive(src_awgr, &pkt) {
            Some(out) => out,
            None => return None,
        };
        let rx_port = match self.stage_three_awgrs[out_awgr].receive(switch_id, &mut pkt) {
            Some(out) => out,
            None => {
                self.link_drop += 1;
                return None;
            }
        };

        let rx = out_awgr * n + rx_port;
        match self.receivers[rx].receive(&mut pkt) {
            Delivery::Probe(seq) => {
                self.controller.received_hello(seq);
                None
            }
            Delivery::Data => {
                self.received_pkts += 1;
                if let Ok(delay) = pkt.total_delay() {
                    info!(target: "latency", "[Packet {}], {}", pkt.id, delay);
                }
                let receive_slot = (pkt.arrival_time
                    + pkt.scheduling_delay.unwrap_or(0)
                    + pkt.propagation_delay.unwrap_or(0)) as f64
                    / self.slot_duration as f64;
                info!(target: "throughput", "{}, {}", pkt.dest, receive_slot);
                Some((rx, pkt))
            }
        }
    }
}
