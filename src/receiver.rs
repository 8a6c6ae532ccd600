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

//! Module defining the per-ToR receiver.

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    packet::{Packet, PacketId},
    types::{AwgrId, RxId},
};

/// What a receiver terminated. The network dispatches on this: data receipts update the traffic
/// counters, probe receipts are reported to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A regular traffic cell was terminated.
    Data,
    /// A probe (hello) packet with the given sequence number was terminated.
    Probe(u64),
}

/// The ToR ingress of the fabric. Terminates data cells and reports hello receipts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receiver {
    id: RxId,
    parent_awgr: AwgrId,
    awgr_port: usize,
}

impl Receiver {
    /// Create a new receiver attached to `parent_awgr` on `port`.
    pub fn new(id: RxId, parent_awgr: AwgrId, port: usize) -> Self {
        Self {
            id,
            parent_awgr,
            awgr_port: port,
        }
    }

    /// The id of this receiver.
    pub fn id(&self) -> RxId {
        self.id
    }

    /// The stage-3 AWGR this receiver hangs off.
    pub fn parent_awgr(&self) -> AwgrId {
        self.parent_awgr
    }

    /// The port of the parent AWGR this receiver is attached to.
    pub fn awgr_port(&self) -> usize {
        self.awgr_port
    }

    /// Terminate a packet. Marks it received and tells the caller whether it was data or a
    /// probe.
    pub fn receive(&self, pkt: &mut Packet) -> Delivery {
        pkt.received = true;
        info!("[Packet {}] : Received at Receiver {}", pkt.id, self.id);
        match pkt.id {
            PacketId::Probe(seq) => Delivery::Probe(seq),
            PacketId::Data(_) => Delivery::Data,
        }
    }
}
