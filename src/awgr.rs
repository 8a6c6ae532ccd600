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

//! Module defining the passive arrayed-waveguide grating router.

use std::collections::BTreeSet;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    packet::Packet,
    types::{AwgrId, Stage},
};

/// Propagation delay added per AWGR hop, in nanoseconds.
pub const PROPAGATION_DELAY: u64 = 600;

/// An `n x n` arrayed-waveguide grating router. Fully passive: a packet entering on `in_port`
/// with wavelength `w` leaves on `(in_port + w) mod n`, no configuration involved. Stage-1 AWGRs
/// forward to the space switches, stage-3 AWGRs to the receivers; the failed-port set models
/// broken outgoing fibers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Awgr {
    n: usize,
    id: AwgrId,
    stage: Stage,
    failed_ports: BTreeSet<usize>,
}

impl Awgr {
    /// Create a new AWGR of the given stage.
    pub fn new(n: usize, id: AwgrId, stage: Stage) -> Self {
        Self {
            n,
            id,
            stage,
            failed_ports: BTreeSet::new(),
        }
    }

    /// The id of this AWGR within its stage.
    pub fn id(&self) -> AwgrId {
        self.id
    }

    /// The stage of this AWGR.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The wavelength-routing function: the output port for a packet entering on `in_port` with
    /// the given wavelength.
    pub fn route(&self, in_port: usize, wavelength: usize) -> usize {
        (in_port + wavelength) % self.n
    }

    /// Whether the outgoing link on `port` is intact.
    pub fn link_ok(&self, port: usize) -> bool {
        !self.failed_ports.contains(&port)
    }

    /// Mark the outgoing link on `port` as failed. Subsequent packets routed to it are dropped.
    pub fn register_failure(&mut self, port: usize) {
        self.failed_ports.insert(port);
    }

    /// The set of failed outgoing ports.
    pub fn failed_ports(&self) -> &BTreeSet<usize> {
        &self.failed_ports
    }

    /// Receive a packet on `in_port`. Returns the output port after adding the hop's
    /// propagation delay, or `None` if the outgoing link has failed and the packet is lost (the
    /// network counts the drop).
    pub fn receive(&self, in_port: usize, pkt: &mut Packet) -> Option<usize> {
        info!(
            "[Packet {}] : Reached Stage {} AWGR with ID = {}",
            pkt.id, self.stage, self.id
        );
        let out_port = self.route(in_port, pkt.wavelength.unwrap_or(0));
        if self.link_ok(out_port) {
            pkt.add_propagation_delay(PROPAGATION_DELAY);
            Some(out_port)
        } else {
            info!(
                "[Packet {}] : Being dropped at Stage {} AWGR with ID = {}",
                pkt.id, self.stage, self.id
            );
            None
        }
    }
}
