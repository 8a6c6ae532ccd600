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

//! Test the redirection policies: ResiConnect across both axes, the nearest-neighbor baseline,
//! and the weighted transmitter-only variant.

use crate::{
    controller::{Controller, ReroutePolicy, Schedule, REROUTE_PENALTY},
    packet::{Packet, PacketId},
    types::Link,
};
use pretty_assertions::assert_eq;

use super::{switches, transmitters};

fn controller(n: usize) -> Controller {
    Controller::new(n, 1200, 3, 0)
}

#[test]
fn balanced_load_redirects_the_transmitter() {
    let mut c = controller(3);
    let txs = transmitters(3);
    let mut pkt = Packet::new(PacketId::Data(1), 0, 5, 0);
    pkt.failed_transmitters.push(0);

    // with empty histograms every transmitter has full headroom and no receiver has any,
    // so the transmitter axis wins
    c.resi_redirect(&mut pkt, &txs);
    assert_eq!(pkt.dest, 5);
    assert!(pkt.src == 1 || pkt.src == 2, "redirected to {}", pkt.src);
}

#[test]
fn saturated_transmitters_redirect_the_receiver() {
    let mut c = controller(3);
    let mut txs = transmitters(3);
    c.current_slot = 10;

    // the failing transmitter recently reached receivers 3 and 4, so both have headroom
    txs[0].record_dispatch(9, 3);
    txs[0].record_dispatch(9, 4);
    // transmitter 1 is saturated: its free capacity drops below the receiver-side headroom
    for slot in 1..=10 {
        txs[1].record_dispatch(slot, 6);
        if slot <= 3 {
            txs[1].record_dispatch(slot, 7);
        }
    }

    let mut pkt = Packet::new(PacketId::Data(1), 0, 5, 0);
    pkt.failed_transmitters.push(0);
    c.resi_redirect(&mut pkt, &txs);

    // the destination moved within its AWGR; the source is untouched
    assert_eq!(pkt.src, 0);
    assert!(pkt.dest == 3 || pkt.dest == 4, "redirected to {}", pkt.dest);
}

#[test]
fn redirect_avoids_failed_transmitters() {
    let mut c = controller(3);
    let txs = transmitters(3);
    for _ in 0..50 {
        let mut pkt = Packet::new(PacketId::Data(1), 0, 5, 0);
        pkt.failed_transmitters.push(0);
        pkt.failed_transmitters.push(1);
        c.resi_redirect(&mut pkt, &txs);
        assert_eq!(pkt.src, 2);
    }
}

#[test]
fn alternate_transmitter_stays_on_the_source_awgr() {
    let mut c = controller(3);
    let txs = transmitters(3);
    let mut pkt = Packet::new(PacketId::Data(1), 3, 8, 0);
    pkt.failed_transmitters.push(4);
    let alt = c.alternate_transmitter(&pkt, &txs);
    assert_eq!(alt, 5);
}

#[test]
fn adjacent_transmitter_at_group_edges() {
    let mut c = controller(3);
    let low = Packet::new(PacketId::Data(1), 3, 8, 0);
    assert_eq!(c.adjacent_transmitter(&low), 4);
    let high = Packet::new(PacketId::Data(2), 5, 8, 0);
    assert_eq!(c.adjacent_transmitter(&high), 4);
    let mid = Packet::new(PacketId::Data(3), 4, 8, 0);
    for _ in 0..20 {
        let alt = c.adjacent_transmitter(&mid);
        assert!(alt == 3 || alt == 5);
    }
}

#[test]
fn enqueue_over_a_failed_link_reroutes() {
    let mut c = controller(3);
    let mut sw = switches(3);
    let txs = transmitters(3);
    // the stage-1 link from AWGR 0 to space switch 1 is down; src 0 -> dest 5 crosses it
    c.failed_links.insert(Link::stage_one(0, 1));
    c.failed_links_version += 1;

    let pkt = Packet::new(PacketId::Data(1), 0, 5, 0);
    match c.enqueue_scheduler(pkt, &mut sw, &txs) {
        Schedule::Reroute(p) => {
            assert_eq!(p.misc_delay, REROUTE_PENALTY);
            assert_eq!(p.failed_transmitters, vec![0]);
            // balanced load: the transmitter axis moved within AWGR 0
            assert!(p.src == 1 || p.src == 2);
            assert_eq!(p.dest, 5);
        }
        Schedule::Queued => panic!("packet crossed a failed link without redirection"),
    }
    assert!(c.queues_empty(&sw));
}

#[test]
fn nearest_neighbor_policy_moves_one_over() {
    let mut c = controller(3);
    c.set_reroute_policy(ReroutePolicy::NearestNeighbor);
    let mut sw = switches(3);
    let txs = transmitters(3);
    c.failed_links.insert(Link::stage_one(0, 1));
    c.failed_links_version += 1;

    let pkt = Packet::new(PacketId::Data(1), 0, 5, 0);
    match c.enqueue_scheduler(pkt, &mut sw, &txs) {
        Schedule::Reroute(p) => {
            assert_eq!(p.src, 1);
            assert_eq!(p.dest, 5);
            assert_eq!(p.misc_delay, REROUTE_PENALTY);
        }
        Schedule::Queued => panic!("packet crossed a failed link without redirection"),
    }
}

#[test]
fn exhausted_axis_falls_back_to_uniform() {
    let mut c = controller(3);
    let txs = transmitters(3);
    // every sibling is already known-failed; the redirect still picks someone else
    let mut pkt = Packet::new(PacketId::Data(1), 0, 5, 0);
    pkt.failed_transmitters.extend([0, 1, 2]);
    c.resi_redirect(&mut pkt, &txs);
    assert!(pkt.src == 1 || pkt.src == 2);
}

#[test]
fn route_cache_invalidates_on_new_failures() {
    let mut c = controller(3);
    let mut txs = transmitters(3);
    c.current_slot = 10;

    let mut pkt = Packet::new(PacketId::Data(1), 0, 5, 0);
    pkt.failed_transmitters.push(0);
    c.resi_redirect(&mut pkt, &txs);
    let cached_version = c.alternate_routes[&0].version;

    // new dispatches alone do not refresh the cache
    txs[1].record_dispatch(10, 6);
    let mut pkt = Packet::new(PacketId::Data(2), 0, 5, 0);
    pkt.failed_transmitters.push(0);
    c.resi_redirect(&mut pkt, &txs);
    assert_eq!(c.alternate_routes[&0].version, cached_version);
    assert_eq!(c.alternate_routes[&0].data[1].count, 0);

    // a declared failure does
    c.failed_links.insert(Link::stage_three(1, 1));
    c.failed_links_version += 1;
    let mut pkt = Packet::new(PacketId::Data(3), 0, 5, 0);
    pkt.failed_transmitters.push(0);
    c.resi_redirect(&mut pkt, &txs);
    assert_eq!(c.alternate_routes[&0].version, c.failed_links_version);
    assert_eq!(c.alternate_routes[&0].data[1].count, 1);
}
