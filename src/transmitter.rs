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

//! Module defining the per-ToR transmitter.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::{AwgrId, TxId};

/// Number of packets a transmitter can buffer while waiting for a slot.
pub const BUFFER_CAPACITY: usize = 5000;

/// Per-destination transmission counts over one slot (or summed over a window of slots). The
/// `count` aggregate tracks the total across all destinations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransmissionCounts {
    /// Packets sent, keyed by destination ToR.
    pub per_dest: HashMap<usize, u32>,
    /// Total packets sent.
    pub count: u32,
}

/// The ToR egress of the fabric. It buffers arriving cells (dropping on overflow), hands them to
/// the controller for scheduling, and keeps the per-slot per-destination dispatch histogram the
/// controller consumes for its load-balancing decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transmitter {
    id: TxId,
    parent_awgr: AwgrId,
    awgr_port: usize,
    /// Dispatch histogram, keyed by dispatch slot.
    transmissions: BTreeMap<u64, TransmissionCounts>,
    buffer_count: usize,
}

impl Transmitter {
    /// Create a new transmitter attached to `parent_awgr` on `port`.
    pub fn new(id: TxId, parent_awgr: AwgrId, port: usize) -> Self {
        Self {
            id,
            parent_awgr,
            awgr_port: port,
            transmissions: BTreeMap::new(),
            buffer_count: 0,
        }
    }

    /// The id of this transmitter.
    pub fn id(&self) -> TxId {
        self.id
    }

    /// The stage-1 AWGR this transmitter feeds into.
    pub fn parent_awgr(&self) -> AwgrId {
        self.parent_awgr
    }

    /// The port of the parent AWGR this transmitter is attached to.
    pub fn awgr_port(&self) -> usize {
        self.awgr_port
    }

    /// The number of packets currently held in the buffer.
    pub fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    /// Take an arriving packet into the buffer. Returns `false` if the buffer is full and the
    /// packet must be dropped (counted as an overflow drop by the network).
    pub fn accept(&mut self) -> bool {
        if self.buffer_count < BUFFER_CAPACITY {
            self.buffer_count += 1;
            true
        } else {
            false
        }
    }

    /// Record the dispatch of a packet to `dest` in slot `slot` and release its buffer space.
    /// Probes travel through the histogram as well even though they never occupied the buffer,
    /// hence the clamp.
    pub fn record_dispatch(&mut self, slot: u64, dest: usize) {
        let entry = self.transmissions.entry(slot).or_default();
        *entry.per_dest.entry(dest).or_insert(0) += 1;
        entry.count += 1;
        self.buffer_count = self.buffer_count.saturating_sub(1);
    }

    /// Sum the dispatch histogram over the last `k` slots (newest first, never reaching further
    /// back than `current_slot - k`).
    pub fn pairwise_transmission_count(&self, current_slot: u64, k: u64) -> TransmissionCounts {
        let mut ret = TransmissionCounts::default();
        for (_, counts) in self
            .transmissions
            .range(current_slot.saturating_sub(k)..)
            .rev()
            .take(k as usize)
        {
            for (dest, c) in &counts.per_dest {
                *ret.per_dest.entry(*dest).or_insert(0) += c;
            }
            ret.count += counts.count;
        }
        ret
    }
}
