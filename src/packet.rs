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

//! Module defining the traffic unit of the simulated fabric.

use serde::{Deserialize, Serialize};

use crate::types::{NetworkError, TxId};

/// Identity of a packet. Data cells carry a plain sequence number, hello packets carry the
/// controller-assigned probe sequence number and render as `hello-<k>`.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum PacketId {
    /// A regular traffic cell.
    Data(u64),
    /// A probe (hello) packet injected by the controller.
    Probe(u64),
}

impl PacketId {
    /// Returns `true` iff this is a probe (hello) packet id.
    pub fn is_probe(&self) -> bool {
        matches!(self, PacketId::Probe(_))
    }
}

impl std::fmt::Display for PacketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketId::Data(k) => write!(f, "{k}"),
            PacketId::Probe(k) => write!(f, "hello-{k}"),
        }
    }
}

/// A single cell transmitted through the fabric. Every packet is independent; there is no flow
/// state. The delay fields are filled in by the components the packet traverses: the controller
/// stamps the wavelength before the dispatch slot, the AWGRs accumulate propagation delay, and
/// rerouting adds to the miscellaneous delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Unique id of the packet.
    pub id: PacketId,
    /// Source ToR index in `[0, n^2)`.
    pub src: usize,
    /// Destination ToR index in `[0, n^2)`.
    pub dest: usize,
    /// Virtual arrival time in nanoseconds.
    pub arrival_time: u64,
    /// The time slot in which the packet is dispatched, assigned by the controller.
    pub dispatch_slot: Option<u64>,
    /// The wavelength in `[0, n)` assigned by the controller.
    pub wavelength: Option<usize>,
    /// Delay between arrival and the end of the dispatch slot.
    pub scheduling_delay: Option<u64>,
    /// Accumulated propagation delay of the traversed AWGR hops.
    pub propagation_delay: Option<u64>,
    /// Extra penalty accumulated by re-routing.
    pub misc_delay: u64,
    /// Set once the packet reached a receiver.
    pub received: bool,
    /// Transmitters already tried and found to sit behind a failed link.
    pub failed_transmitters: Vec<TxId>,
}

impl Packet {
    /// Create a new data packet. All delay fields start unset.
    pub fn new(id: PacketId, src: usize, dest: usize, arrival_time: u64) -> Self {
        Self {
            id,
            src,
            dest,
            arrival_time,
            dispatch_slot: None,
            wavelength: None,
            scheduling_delay: None,
            propagation_delay: None,
            misc_delay: 0,
            received: false,
            failed_transmitters: Vec::new(),
        }
    }

    /// Create a hello packet with sequence number `seq`. The wavelength is fixed at creation so
    /// the probe deterministically traverses the link pair chosen by the controller.
    pub fn hello(seq: u64, src: usize, wavelength: usize, dest: usize, time: u64) -> Self {
        let mut pkt = Self::new(PacketId::Probe(seq), src, dest, time);
        pkt.wavelength = Some(wavelength);
        pkt
    }

    /// Accumulate propagation delay (one AWGR hop at a time).
    pub fn add_propagation_delay(&mut self, delay: u64) {
        self.propagation_delay = Some(self.propagation_delay.unwrap_or(0) + delay);
    }

    /// The total delay experienced by the packet. Only defined once the packet has reached its
    /// receiver; querying earlier returns [`NetworkError::IncompleteTransmission`].
    pub fn total_delay(&self) -> Result<u64, NetworkError> {
        if !self.received {
            return Err(NetworkError::IncompleteTransmission(self.id));
        }
        Ok(self.scheduling_delay.unwrap_or(0) + self.propagation_delay.unwrap_or(0) + self.misc_delay)
    }
}
