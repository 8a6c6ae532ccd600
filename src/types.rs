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

//! Module containing all type definitions

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::packet::PacketId;

/// Transmitter identification (index into the network-held vector). Transmitter `i` is attached
/// to stage-1 AWGR `i / n` on port `i % n`.
pub type TxId = usize;
/// Receiver identification (index into the network-held vector). Receiver `i` is attached to
/// stage-3 AWGR `i / n` on port `i % n`.
pub type RxId = usize;
/// AWGR identification within its stage.
pub type AwgrId = usize;
/// Space switch identification.
pub type SwitchId = usize;

/// The stage of the fabric an AWGR (or a link) belongs to. Stage 1 sits between the transmitters
/// and the space switches, stage 3 between the space switches and the receivers.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Stage {
    /// Transmitter-side AWGR stage.
    One,
    /// Receiver-side AWGR stage.
    Three,
}

impl Stage {
    /// The numeric stage label used in link tuples and log messages.
    pub fn number(&self) -> u8 {
        match self {
            Stage::One => 1,
            Stage::Three => 3,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl TryFrom<u8> for Stage {
    type Error = NetworkError;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            1 => Ok(Stage::One),
            3 => Ok(Stage::Three),
            _ => Err(NetworkError::InvalidStage(x)),
        }
    }
}

/// Identity of a fabric link. A stage-1 link connects stage-1 AWGR `a` to space switch `b`, a
/// stage-3 link connects space switch `a` to stage-3 AWGR `b`. AWGR-internal port failures
/// keyed by `(awgr_id, failed_port)` map onto the same identity.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Link {
    /// The stage the link belongs to.
    pub stage: Stage,
    /// First endpoint (stage-1 AWGR id, or space switch id for stage-3 links).
    pub a: usize,
    /// Second endpoint (space switch id, or stage-3 AWGR id for stage-3 links).
    pub b: usize,
}

impl Link {
    /// A stage-1 link between AWGR `awgr` and space switch `switch`.
    pub fn stage_one(awgr: AwgrId, switch: SwitchId) -> Self {
        Self {
            stage: Stage::One,
            a: awgr,
            b: switch,
        }
    }

    /// A stage-3 link between space switch `switch` and AWGR `awgr`.
    pub fn stage_three(switch: SwitchId, awgr: AwgrId) -> Self {
        Self {
            stage: Stage::Three,
            a: switch,
            b: awgr,
        }
    }
}

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.stage, self.a, self.b)
    }
}

/// Network Errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkError {
    /// The total delay of a packet was queried before the packet reached its receiver. This
    /// always indicates an ordering bug in the caller.
    #[error("Packet {0} has not reached its destination yet!")]
    IncompleteTransmission(PacketId),
    /// Fault tracking declared more link failures than the event source injected.
    #[error("Detected additional link faults: {0}")]
    UnexpectedFault(Link),
    /// An AWGR was constructed with a stage other than 1 or 3.
    #[error("Invalid AWGR stage: {0}")]
    InvalidStage(u8),
    /// The network parameters are out of the supported range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
