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

//! Module for defining events and the event stream driving the simulation.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

mod generator;
pub use generator::PoissonEventGenerator;

use crate::{
    packet::Packet,
    types::AwgrId,
};

/// Event to handle. Events are strictly ordered by virtual time; ties resolve in variant order
/// (arrival before slot boundary before link failure), and [`Event::EventSetEnd`] is always
/// last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A packet arrives at its source transmitter.
    PacketArrival {
        /// Virtual time of the arrival in nanoseconds.
        time: u64,
        /// The arriving packet.
        packet: Packet,
    },
    /// A time slot boundary: slot `slot` has just ended.
    TimeSlotEnd {
        /// Virtual time of the boundary in nanoseconds.
        time: u64,
        /// Number of the slot that ended.
        slot: u64,
    },
    /// A stage-1 AWGR loses one of its outgoing ports.
    LinkFailure {
        /// Virtual time of the failure in nanoseconds.
        time: u64,
        /// The AWGR whose port fails.
        awgr: AwgrId,
        /// The failed outgoing port.
        port: usize,
    },
    /// No further events will be produced; drain all queues.
    EventSetEnd,
}

impl Event {
    /// The virtual timestamp of the event, if it has one.
    pub fn time(&self) -> Option<u64> {
        match self {
            Event::PacketArrival { time, .. }
            | Event::TimeSlotEnd { time, .. }
            | Event::LinkFailure { time, .. } => Some(*time),
            Event::EventSetEnd => None,
        }
    }
}

/// Interface of an event stream. The network pulls events one by one and dispatches them; the
/// source guarantees non-decreasing timestamps. Swapping the source changes how traffic is
/// produced without touching the network: [`ScriptedEvents`] replays a fixed list (used by the
/// tests), [`PoissonEventGenerator`] produces random traffic on demand.
pub trait EventSource {
    /// Produce the next event, or `None` once the stream is exhausted. The last produced event
    /// is always [`Event::EventSetEnd`].
    fn next_event(&mut self) -> Option<Event>;

    /// The number of link failures this source will inject over its lifetime. The controller
    /// uses this as the budget of *expected* faults; declaring more is an error.
    fn link_fail_count(&self) -> usize;
}

/// A deterministic event source replaying a prepared list of events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedEvents {
    events: VecDeque<Event>,
    fail_count: usize,
}

impl ScriptedEvents {
    /// Create a new scripted source. The injected-failure budget is the number of
    /// [`Event::LinkFailure`] entries in the script.
    pub fn new(events: impl IntoIterator<Item = Event>) -> Self {
        let events: VecDeque<Event> = events.into_iter().collect();
        let fail_count = events
            .iter()
            .filter(|e| matches!(e, Event::LinkFailure { .. }))
            .count();
        Self { events, fail_count }
    }

    /// The number of events left in the script.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no event is left in the script.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSource for ScriptedEvents {
    fn next_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    fn link_fail_count(&self) -> usize {
        self.fail_count
    }
}
