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

use crate::{
    controller::Controller,
    event::Event,
    network::{Config, Network},
    packet::{Packet, PacketId},
    space_switch::SpaceSwitch,
    transmitter::Transmitter,
    types::Stage,
};

/// Build a network with the default slot duration and a fixed seed.
fn net(n: usize, hello_interval: u64) -> Network {
    Network::new(Config::new(n, hello_interval)).unwrap()
}

/// A data-packet arrival event.
fn arrival(id: u64, src: usize, dest: usize, time: u64) -> Event {
    Event::PacketArrival {
        time,
        packet: Packet::new(PacketId::Data(id), src, dest, time),
    }
}

/// The space switches of a fabric of scale `n`, detached from any network.
fn switches(n: usize) -> Vec<SpaceSwitch> {
    (0..n).map(|i| SpaceSwitch::new(n, i)).collect()
}

/// The transmitters of a fabric of scale `n`, detached from any network.
fn transmitters(n: usize) -> Vec<Transmitter> {
    (0..n * n).map(|i| Transmitter::new(i, i / n, i % n)).collect()
}

/// Assert that every link belongs to exactly one frequency band.
fn assert_band_partition(c: &Controller, n: usize) {
    for s_id in 0..n {
        for endpoint in 0..n {
            for stage in [Stage::One, Stage::Three] {
                let members = c
                    .fault_freq
                    .iter()
                    .filter(|t| match stage {
                        Stage::One => t.stage_one[s_id].contains(&endpoint),
                        Stage::Three => t.stage_three[s_id].contains(&endpoint),
                    })
                    .count();
                assert_eq!(
                    members, 1,
                    "link (stage {stage}, switch {s_id}, endpoint {endpoint}) \
                     is in {members} bands"
                );
            }
        }
    }
}

mod test_fault;
mod test_matching;
mod test_reroute;
