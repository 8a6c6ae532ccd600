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

//! Module defining the electronic crossbar between the two AWGR stages.

use std::collections::{HashMap, VecDeque};

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    packet::Packet,
    types::{SwitchId, TxId},
};

/// Per-transmitter wavelength usage within one (space switch, slot) pair. The controller
/// enforces the per-wavelength transmission cap against these counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavelengthCounts {
    /// Scheduled transmissions keyed by wavelength.
    pub per_wavelength: HashMap<usize, u32>,
    /// Total scheduled transmissions of the transmitter in this slot.
    pub count: u32,
}

/// State of a space switch for one time slot: the request matrix the controller accumulates,
/// the crossbar permutation it decides on, and the per-transmitter wavelength bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotState {
    /// Request matrix: entry `(i, j)` counts queued connections from source AWGR `i` to
    /// destination AWGR `j`.
    pub req_matrix: Vec<Vec<u32>>,
    /// Crossbar configuration: input port `i` connects to output port `final_state[i]`. Set
    /// once the controller has solved the matching for this slot.
    pub final_state: Option<Vec<usize>>,
    /// Per-transmitter wavelength usage in this slot.
    pub transmissions: HashMap<TxId, WavelengthCounts>,
}

impl SlotState {
    fn new(n: usize) -> Self {
        Self {
            req_matrix: vec![vec![0; n]; n],
            final_state: None,
            transmissions: HashMap::new(),
        }
    }
}

/// An `n x n` crossbar reconfigured at every slot boundary. Owns the FIFO of packets awaiting a
/// slot (probes enter at the front so they are matched in the next allotment) and the per-slot
/// state, created lazily on first access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceSwitch {
    n: usize,
    id: SwitchId,
    /// Packets awaiting scheduling at this switch.
    pub(crate) queue: VecDeque<Packet>,
    state: HashMap<u64, SlotState>,
}

impl SpaceSwitch {
    /// Create a new space switch.
    pub fn new(n: usize, id: SwitchId) -> Self {
        Self {
            n,
            id,
            queue: VecDeque::new(),
            state: HashMap::new(),
        }
    }

    /// The id of this space switch.
    pub fn id(&self) -> SwitchId {
        self.id
    }

    /// The number of packets awaiting scheduling.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// The state for the given slot, created on first access.
    pub fn slot_state(&mut self, slot: u64) -> &mut SlotState {
        let n = self.n;
        self.state.entry(slot).or_insert_with(|| SlotState::new(n))
    }

    /// The state for the given slot, if the controller already touched it.
    pub fn get_slot_state(&self, slot: u64) -> Option<&SlotState> {
        self.state.get(&slot)
    }

    /// Receive a packet on `in_port` and return the crossbar output port for the packet's
    /// dispatch slot. Returns `None` if no configuration exists for that slot (an internal
    /// ordering bug; the packet is dropped with a warning).
    pub fn receive(&self, in_port: usize, pkt: &Packet) -> Option<usize> {
        info!("[Packet {}] : Reached Space Switch {}", pkt.id, self.id);
        let out_port = pkt
            .dispatch_slot
            .and_then(|slot| self.state.get(&slot))
            .and_then(|state| state.final_state.as_ref())
            .map(|perm| perm[in_port]);
        match out_port {
            Some(out) => {
                info!("[Packet {}] : Sent from Space Switch {}", pkt.id, self.id);
                Some(out)
            }
            None => {
                warn!(
                    "[Packet {}] : No crossbar state at Space Switch {} for slot {:?}",
                    pkt.id, self.id, pkt.dispatch_slot
                );
                None
            }
        }
    }
}
