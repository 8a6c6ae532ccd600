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

#![deny(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # ResiConnect
//!
//! This is a library for simulating an AWGR-SpaceSwitch-AWGR (ASA) three-stage optical
//! data-center fabric, together with the centralized controller that schedules it and keeps it
//! alive under link failures.
//!
//! ## Main Concepts
//!
//! The [`network::Network`] is the main datastructure to operate on. It owns the `n^2`
//! transmitter/receiver pairs, the two passive AWGR stages, the `n` space switches, and the
//! [`controller::Controller`], wired by port indices. Time is virtual (integer nanoseconds) and
//! advances only through the event stream: the network consumes [`event::Event`]s — packet
//! arrivals, slot boundaries, injected link failures, and the end-of-set marker — from any
//! [`event::EventSource`].
//!
//! Two sources ship with the crate: [`event::ScriptedEvents`] replays a fixed list (this is
//! what the tests use), and [`event::PoissonEventGenerator`] produces random uniform traffic
//! with Poisson inter-arrival times, merged with slot boundaries and a static link-failure
//! schedule. Everything is deterministic once the seeds are fixed.
//!
//! On every slot boundary the controller first sweeps its outstanding hello packets for
//! timeouts — escalating probe frequencies, and declaring a link failed after repeated
//! anomalies — then matches each space switch's request matrix to a crossbar permutation and
//! dispatches the winning packets, at most one per transmitter and wavelength. Traffic that
//! would cross a declared-failed link is redirected onto surviving transmitters or receivers
//! (see [`controller::ReroutePolicy`]).
//!
//! ## Example usage
//!
//! ```rust
//! use resiconnect::prelude::*;
//!
//! fn main() -> Result<(), NetworkError> {
//!     let mut net = Network::new(Config::new(3, 3))?;
//!
//!     // one cell from ToR 0 to ToR 7, then close the slot and drain the fabric
//!     let mut events = ScriptedEvents::new(vec![
//!         Event::PacketArrival {
//!             time: 0,
//!             packet: Packet::new(PacketId::Data(1), 0, 7, 0),
//!         },
//!         Event::TimeSlotEnd { time: 1200, slot: 0 },
//!         Event::EventSetEnd,
//!     ]);
//!     net.run(&mut events)?;
//!
//!     assert_eq!(net.generated_pkts(), 1);
//!     assert_eq!(net.received_pkts(), 1);
//!     Ok(())
//! }
//! ```

pub mod awgr;
pub mod controller;
pub mod event;
pub mod matching;
pub mod network;
pub mod packet;
pub mod prelude;
pub mod receiver;
pub mod space_switch;
pub mod transmitter;
pub mod types;

#[cfg(test)]
mod test;
