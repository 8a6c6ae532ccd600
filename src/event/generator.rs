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

//! Random traffic source with Poisson inter-arrival times.

use std::collections::VecDeque;

use rand::prelude::*;
use rand_distr::Exp;

use crate::{
    packet::{Packet, PacketId},
    types::{AwgrId, NetworkError},
};

use super::{Event, EventSource};

/// Event source producing uniformly addressed traffic whose arrivals follow a Poisson process,
/// merged with the time-slot boundaries and a static list of injected link failures.
///
/// The merge picks the earliest of {next arrival, next slot boundary, next injected failure},
/// breaking ties in that order. Slot boundaries are derived from the slot of the *next pending
/// arrival*, so slots in which no packet arrives produce no boundary event. Once virtual time
/// passes the runtime, a single [`Event::EventSetEnd`] terminates the stream.
///
/// All randomness is drawn from a seeded generator, so a fixed seed reproduces the exact same
/// event stream.
#[derive(Debug, Clone)]
pub struct PoissonEventGenerator {
    n: usize,
    runtime: u64,
    slot_duration: u64,
    inter_arrival: Exp<f64>,
    rng: StdRng,
    /// Virtual time of the next pending arrival.
    next_arrival: f64,
    /// Slot counter tracking the slot of the next pending arrival.
    slot_ctr: u64,
    next_id: u64,
    link_failures: VecDeque<(u64, AwgrId, usize)>,
    fail_count: usize,
    finished: bool,
}

impl PoissonEventGenerator {
    /// Create a new generator. `rate` is the arrival rate in packets per nanosecond across the
    /// whole fabric; `runtime` bounds the arrival times in nanoseconds.
    pub fn new(
        n: usize,
        rate: f64,
        runtime: u64,
        slot_duration: u64,
        seed: u64,
    ) -> Result<Self, NetworkError> {
        let inter_arrival = Exp::new(rate)
            .map_err(|_| NetworkError::InvalidConfig(format!("invalid arrival rate: {rate}")))?;
        let mut rng = StdRng::seed_from_u64(seed);
        let next_arrival = inter_arrival.sample(&mut rng);
        let slot_ctr = next_arrival as u64 / slot_duration;
        Ok(Self {
            n,
            runtime,
            slot_duration,
            inter_arrival,
            rng,
            next_arrival,
            slot_ctr,
            next_id: 1,
            link_failures: VecDeque::new(),
            fail_count: 0,
            finished: false,
        })
    }

    /// Inject a static list of link failures, each a `(time_ns, awgr_id, failed_port)` triple.
    /// The triples are delivered in list order.
    pub fn with_link_failures(
        mut self,
        failures: impl IntoIterator<Item = (u64, AwgrId, usize)>,
    ) -> Self {
        self.link_failures = failures.into_iter().collect();
        self.fail_count = self.link_failures.len();
        self
    }
}

impl EventSource for PoissonEventGenerator {
    fn next_event(&mut self) -> Option<Event> {
        if self.finished {
            return None;
        }
        if self.next_arrival >= self.runtime as f64 {
            self.finished = true;
            return Some(Event::EventSetEnd);
        }

        let arrival = self.next_arrival;
        let slot_end = ((self.slot_ctr + 1) * self.slot_duration) as f64;
        let failure = self.link_failures.front().map(|(t, _, _)| *t as f64);

        if arrival <= slot_end && failure.map_or(true, |f| arrival <= f) {
            // packet arrival; source and destination are a distinct pair
            let endpoints = rand::seq::index::sample(&mut self.rng, self.n * self.n, 2);
            let packet = Packet::new(
                PacketId::Data(self.next_id),
                endpoints.index(0),
                endpoints.index(1),
                arrival as u64,
            );
            self.next_id += 1;
            self.next_arrival += self.inter_arrival.sample(&mut self.rng);
            Some(Event::PacketArrival {
                time: arrival as u64,
                packet,
            })
        } else if failure.map_or(true, |f| slot_end <= f) {
            // slot boundary; resync the counter to the slot of the next pending arrival
            let ev = Event::TimeSlotEnd {
                time: slot_end as u64,
                slot: self.slot_ctr,
            };
            self.slot_ctr = self.next_arrival as u64 / self.slot_duration;
            Some(ev)
        } else {
            let (time, awgr, port) = self.link_failures.pop_front()?;
            Some(Event::LinkFailure { time, awgr, port })
        }
    }

    fn link_fail_count(&self) -> usize {
        self.fail_count
    }
}
