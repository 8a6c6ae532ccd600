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

//! Test the fault-tracking half of the controller: frequency bands, probe timeouts, fault
//! declaration, and probe pairing.

use crate::{
    controller::{Controller, PendingProbe, ANOMALY_THRESHOLD, RECEIVE_THRESHOLD},
    types::{Link, NetworkError, Stage},
};
use lazy_static::lazy_static;
use pretty_assertions::assert_eq;

use super::{assert_band_partition, switches};

lazy_static! {
    static ref IN_LINK: Link = Link::stage_one(0, 1);
    static ref OUT_LINK: Link = Link::stage_three(1, 2);
}

fn controller(n: usize) -> Controller {
    Controller::new(n, 1200, 3, 0)
}

/// Strip every link from every band, so the controller dispatches no probes of its own and the
/// test fully scripts the pending set.
fn isolate(c: &mut Controller) {
    for band in c.fault_freq.iter_mut() {
        for set in band.stage_one.iter_mut().chain(band.stage_three.iter_mut()) {
            set.clear();
        }
    }
}

fn pending(freq: u64, dispatch_slot: u64) -> PendingProbe {
    PendingProbe {
        freq,
        switch: 1,
        in_link: 0,
        out_link: 2,
        dispatch_slot,
    }
}

#[test]
fn all_links_start_in_the_slowest_band() {
    let c = controller(3);
    assert_band_partition(&c, 3);
    for s_id in 0..3 {
        for endpoint in 0..3 {
            assert_eq!(c.band_of(s_id, Stage::One, endpoint), Some(3));
            assert_eq!(c.band_of(s_id, Stage::Three, endpoint), Some(3));
        }
    }
}

#[test]
fn timeout_escalates_the_pair_one_band() {
    let mut c = controller(3);
    let mut sw = switches(3);
    c.pending_hellos.insert(1, pending(3, 0));
    c.hello_ctr = 2;

    // slot 11 is past the receive threshold, and no band interval divides it except 1 and 11
    c.fault_tracking(11, &mut sw).unwrap();

    assert!(c.pending_hellos.is_empty());
    assert_eq!(c.band_of(1, Stage::One, 0), Some(2));
    assert_eq!(c.band_of(1, Stage::Three, 2), Some(2));
    assert_eq!(c.anomaly_count.get(&*IN_LINK), Some(&1));
    assert_eq!(c.anomaly_count.get(&*OUT_LINK), Some(&1));
    assert_band_partition(&c, 3);
}

#[test]
fn band_one_is_the_fastest_class() {
    let mut c = controller(3);
    let mut sw = switches(3);
    isolate(&mut c);
    // two consecutive timeouts bring the pair from band 3 down to band 1, where it stays
    c.fault_freq[3].stage_one[1].insert(0);
    c.fault_freq[3].stage_three[1].insert(2);
    for (seq, slot) in [(1, 20), (2, 40), (3, 60)] {
        let freq = c.band_of(1, Stage::One, 0).unwrap();
        c.pending_hellos.insert(seq, pending(freq, slot - 15));
        c.fault_tracking(slot, &mut sw).unwrap();
        // drop the probes the due bands dispatched; this test scripts its own
        c.pending_hellos.clear();
        for s in sw.iter_mut() {
            s.queue.clear();
        }
    }
    assert_eq!(c.band_of(1, Stage::One, 0), Some(1));
    assert_eq!(c.band_of(1, Stage::Three, 2), Some(1));
}

#[test]
fn ten_consecutive_timeouts_declare_the_link() {
    let mut c = controller(3);
    let mut sw = switches(3);
    isolate(&mut c);
    c.set_expected_failures(1);

    // nine timeouts of the same stage-1 link, out-links rotating so only the stage-1 member
    // accumulates anomalies at full rate
    let mut slot = 15;
    for seq in 0..(ANOMALY_THRESHOLD as u64 - 1) {
        c.pending_hellos.insert(
            seq,
            PendingProbe {
                freq: 3,
                switch: 1,
                in_link: 0,
                out_link: (seq % 3) as usize,
                dispatch_slot: slot - RECEIVE_THRESHOLD - 1,
            },
        );
        c.fault_tracking(slot, &mut sw).unwrap();
        slot += 1;
    }
    assert_eq!(c.anomaly_count.get(&*IN_LINK), Some(&9));
    assert!(c.failed_links().is_empty());

    // the tenth crosses the threshold
    c.pending_hellos.insert(
        100,
        PendingProbe {
            freq: 3,
            switch: 1,
            in_link: 0,
            out_link: 1,
            dispatch_slot: slot - RECEIVE_THRESHOLD - 1,
        },
    );
    c.fault_tracking(slot, &mut sw).unwrap();

    assert!(c.failed_links().contains(&*IN_LINK));
    assert_eq!(c.band_of(1, Stage::One, 0), Some(0));
    assert_eq!(c.fault_found_at(), Some(1200 * slot));
}

#[test]
fn excess_declaration_is_an_unexpected_fault() {
    let mut c = controller(3);
    let mut sw = switches(3);
    isolate(&mut c);
    // no failures were injected, so the first declaration already exceeds the budget
    c.anomaly_count.insert(*IN_LINK, ANOMALY_THRESHOLD - 1);
    c.pending_hellos.insert(1, pending(3, 0));

    let res = c.fault_tracking(12, &mut sw);
    assert_eq!(res, Err(NetworkError::UnexpectedFault(*IN_LINK)));
    // the declaration itself still happened
    assert!(c.failed_links().contains(&*IN_LINK));
}

#[test]
fn declared_pairs_produce_no_further_anomalies() {
    let mut c = controller(3);
    let mut sw = switches(3);
    isolate(&mut c);
    c.set_expected_failures(1);
    c.failed_links.insert(*IN_LINK);
    c.pending_hellos.insert(1, pending(3, 0));

    c.fault_tracking(12, &mut sw).unwrap();
    assert!(c.pending_hellos.is_empty());
    assert!(c.anomaly_count.is_empty());
}

#[test]
fn receipt_clears_anomalies_and_relaxes_the_band() {
    let mut c = controller(3);
    c.anomaly_count.insert(*IN_LINK, 4);
    c.anomaly_count.insert(*OUT_LINK, 4);
    c.move_to_band(1, Stage::One, 0, 2);
    c.move_to_band(1, Stage::Three, 2, 2);
    c.pending_hellos.insert(7, pending(2, 100));

    c.received_hello(7);

    assert!(c.pending_hellos.is_empty());
    assert!(c.anomaly_count.is_empty());
    assert_eq!(c.band_of(1, Stage::One, 0), Some(3));
    assert_eq!(c.band_of(1, Stage::Three, 2), Some(3));
    assert_band_partition(&c, 3);
}

#[test]
fn receipt_at_slowest_band_moves_nothing() {
    let mut c = controller(3);
    c.pending_hellos.insert(7, pending(3, 100));
    c.received_hello(7);
    assert_eq!(c.band_of(1, Stage::One, 0), Some(3));
    assert_eq!(c.band_of(1, Stage::Three, 2), Some(3));
    assert_band_partition(&c, 3);
}

#[test]
fn late_receipt_is_ignored() {
    let mut c = controller(3);
    let before = c.fault_freq.clone();
    c.received_hello(99);
    assert_eq!(c.fault_freq, before);
}

#[test]
fn legacy_deescalation_moves_the_in_link_twice() {
    let mut c = controller(3);
    c.set_legacy_deescalation(true);
    c.move_to_band(1, Stage::One, 0, 2);
    c.move_to_band(1, Stage::Three, 2, 2);
    c.pending_hellos.insert(7, pending(2, 100));

    c.received_hello(7);

    // the in-link lands in both stage sets of the relaxed band, the out-link in none
    assert_eq!(c.band_of(1, Stage::One, 0), Some(3));
    assert!(c.fault_freq[3].stage_three[1].contains(&0));
    assert_eq!(c.band_of(1, Stage::Three, 2), None);
}

#[test]
fn failed_links_grow_monotonically() {
    let mut c = controller(3);
    let mut sw = switches(3);
    c.set_expected_failures(100);
    let mut seen = std::collections::BTreeSet::new();
    for slot in 1..40 {
        c.fault_tracking(slot, &mut sw).unwrap();
        for s in sw.iter_mut() {
            s.queue.clear();
        }
        assert!(c.failed_links().is_superset(&seen));
        seen = c.failed_links().clone();
        assert_band_partition(&c, 3);
    }
}

#[test]
fn pending_probes_never_outlive_the_threshold() {
    let mut c = controller(3);
    let mut sw = switches(3);
    c.set_expected_failures(100);
    for slot in 1..30 {
        c.fault_tracking(slot, &mut sw).unwrap();
        for s in sw.iter_mut() {
            s.queue.clear();
        }
        for probe in c.pending_hellos.values() {
            assert!(slot <= probe.dispatch_slot + RECEIVE_THRESHOLD);
        }
    }
}

#[test]
fn probes_target_the_chosen_switch() {
    let mut c = controller(5);
    let mut sw = switches(5);
    c.fault_tracking(0, &mut sw).unwrap();
    assert!(c.hello_count() > 0);
    // every dispatched probe sits at the front of its switch queue with a wavelength that
    // steers it through exactly that switch
    for (s_id, s) in sw.iter().enumerate() {
        for pkt in s.queue.iter() {
            assert!(pkt.id.is_probe());
            let wavelength = pkt.wavelength.unwrap();
            assert_eq!((pkt.src % 5 + wavelength) % 5, s_id);
            assert_eq!((pkt.src % 5 + 2 * wavelength) % 5, pkt.dest % 5);
        }
    }
}

#[test]
fn probe_pairs_do_not_repeat_consecutively() {
    let mut c = controller(4);

    let first = c.get_permutations(0, vec![0, 1, 2, 3], vec![0, 1, 2, 3]);
    assert_eq!(first.0.len(), first.1.len());
    let recorded = c.previous_link_pair[0].clone();

    let second = c.get_permutations(0, vec![0, 1, 2, 3], vec![0, 1, 2, 3]);
    assert_eq!(second.0.len(), second.1.len());
    for i in 0..4 {
        assert_ne!(
            recorded[second.0[i]],
            Some(second.1[i]),
            "pair ({}, {}) repeated from the previous tick",
            second.0[i],
            second.1[i]
        );
    }
    // every link of the band is probed at least once
    for link in 0..4 {
        assert!(second.0.contains(&link));
        assert!(second.1.contains(&link));
    }
}

#[test]
fn unequal_band_sides_are_padded() {
    let mut c = controller(4);
    let (ins, outs) = c.get_permutations(2, vec![0, 1, 3], vec![2]);
    assert_eq!(ins.len(), outs.len());
    assert!(ins.len() >= 3);
    for link in [0, 1, 3] {
        assert!(ins.contains(&link));
    }
    assert!(outs.contains(&2));
}
