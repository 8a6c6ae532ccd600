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

//! Active fault detection: probe frequency bands, timeout sweeps, and probe dispatch.
//!
//! Every link of the fabric belongs to exactly one frequency band. Band `hello_interval` is the
//! slowest and the initial home of all links; a probe timeout moves the probed link pair one
//! band down (doubling its probing frequency at band `f` means probing every `f` slots), a
//! successful probe receipt moves it one band up again. Band 0 is terminal: it holds the links
//! declared failed after [`ANOMALY_THRESHOLD`](super::ANOMALY_THRESHOLD) consecutive timeouts.

use std::collections::BTreeSet;

use itertools::Itertools;
use log::*;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    packet::Packet,
    space_switch::SpaceSwitch,
    types::{Link, NetworkError, Stage, SwitchId},
};

use super::{Controller, PendingProbe, ANOMALY_THRESHOLD, RECEIVE_THRESHOLD};

/// The link membership of one frequency band: per space switch, the adjacent stage-1 in-links
/// and stage-3 out-links probed at this band's frequency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTracking {
    /// Stage-1 links, indexed by space switch.
    pub stage_one: Vec<BTreeSet<usize>>,
    /// Stage-3 links, indexed by space switch.
    pub stage_three: Vec<BTreeSet<usize>>,
}

impl LinkTracking {
    /// Create empty band membership for a fabric of scale `n`.
    pub fn new(n: usize) -> Self {
        Self {
            stage_one: vec![BTreeSet::new(); n],
            stage_three: vec![BTreeSet::new(); n],
        }
    }
}

impl Controller {
    /// Move one link endpoint into the given band, removing it from every other band first so
    /// the exactly-one-band partition always holds.
    pub(crate) fn move_to_band(&mut self, s_id: SwitchId, stage: Stage, endpoint: usize, band: u64) {
        for tracking in self.fault_freq.iter_mut() {
            match stage {
                Stage::One => tracking.stage_one[s_id].remove(&endpoint),
                Stage::Three => tracking.stage_three[s_id].remove(&endpoint),
            };
        }
        let target = &mut self.fault_freq[band as usize];
        match stage {
            Stage::One => target.stage_one[s_id].insert(endpoint),
            Stage::Three => target.stage_three[s_id].insert(endpoint),
        };
    }

    /// The frequency band currently holding the given link endpoint, if any.
    pub fn band_of(&self, s_id: SwitchId, stage: Stage, endpoint: usize) -> Option<u64> {
        self.fault_freq.iter().position(|t| match stage {
            Stage::One => t.stage_one[s_id].contains(&endpoint),
            Stage::Three => t.stage_three[s_id].contains(&endpoint),
        }).map(|b| b as u64)
    }

    /// The main fault tracking pass, run on every slot boundary before the slot is allotted.
    /// Sweeps the pending probes for timeouts (recording anomalies, escalating probe
    /// frequencies, and declaring faults past the anomaly threshold), then dispatches fresh
    /// probes for every band whose interval divides the current slot. Probes enter their space
    /// switch queue at the front so the upcoming allotment matches them first.
    pub fn fault_tracking(
        &mut self,
        current_slot: u64,
        switches: &mut [SpaceSwitch],
    ) -> Result<(), NetworkError> {
        // sweep pending probes for timeouts
        let expired: Vec<u64> = self
            .pending_hellos
            .iter()
            .filter(|(_, p)| current_slot > p.dispatch_slot + RECEIVE_THRESHOLD)
            .map(|(seq, _)| *seq)
            .collect();
        for seq in expired {
            let probe = match self.pending_hellos.remove(&seq) {
                Some(p) => p,
                None => continue,
            };
            self.probe_timeout(seq, probe, current_slot)?;
        }

        // dispatch probes for every band due in this slot
        for freq in 1..=self.hello_interval {
            if current_slot % freq != 0 {
                continue;
            }
            for s_id in 0..self.n {
                let band = &self.fault_freq[freq as usize];
                let in_links = band.stage_one[s_id].iter().copied().collect_vec();
                let out_links = band.stage_three[s_id].iter().copied().collect_vec();
                let (in_links, out_links) = self.get_permutations(s_id, in_links, out_links);
                for (in_link, out_link) in in_links.into_iter().zip(out_links) {
                    self.dispatch_probe(freq, s_id, in_link, out_link, current_slot, switches);
                }
            }
        }

        Ok(())
    }

    /// Handle the timeout of one probe: record an anomaly on both member links, declare a fault
    /// once the threshold is crossed, and escalate the pair's probing frequency otherwise.
    fn probe_timeout(
        &mut self,
        seq: u64,
        probe: PendingProbe,
        current_slot: u64,
    ) -> Result<(), NetworkError> {
        let links = [
            Link::stage_one(probe.in_link, probe.switch),
            Link::stage_three(probe.switch, probe.out_link),
        ];
        // a pair with an already-declared member carries no new information
        if links.iter().any(|l| self.failed_links.contains(l)) {
            return Ok(());
        }

        debug!("[Timeslot {current_slot}] : Hello Packet hello-{seq} timed out");
        let mut fault_declared = false;
        for link in links {
            let anomalies = self.anomaly_count.entry(link).or_insert(0);
            *anomalies += 1;
            if *anomalies < ANOMALY_THRESHOLD {
                continue;
            }
            fault_declared = true;
            self.fault_found_at = Some(self.slot * current_slot);
            let endpoint = match link.stage {
                Stage::One => probe.in_link,
                Stage::Three => probe.out_link,
            };
            self.move_to_band(probe.switch, link.stage, endpoint, 0);
            self.failed_links.insert(link);
            self.failed_links_version += 1;
            warn!("[Timeslot {current_slot}] : Link {link} declared FAILED");
            if self.failed_links.len() > self.expected_failures {
                return Err(NetworkError::UnexpectedFault(link));
            }
        }

        if !fault_declared && probe.freq > 1 {
            // anomalous but below the threshold: probe this pair more often
            self.move_to_band(probe.switch, Stage::One, probe.in_link, probe.freq - 1);
            self.move_to_band(probe.switch, Stage::Three, probe.out_link, probe.freq - 1);
        }
        Ok(())
    }

    /// Build and enqueue one hello packet traversing `(in_link, space switch, out_link)`. The
    /// source member within the in-link AWGR is random; wavelength and destination are derived
    /// so the deterministic routing steers the probe exactly through the chosen switch.
    fn dispatch_probe(
        &mut self,
        freq: u64,
        s_id: SwitchId,
        in_link: usize,
        out_link: usize,
        current_slot: u64,
        switches: &mut [SpaceSwitch],
    ) {
        let n = self.n;
        let src_member = self.rng.gen_range(0..n);
        let src = n * in_link + src_member;
        let wavelength = if s_id >= src_member {
            s_id - src_member
        } else {
            n + s_id - src_member
        };
        debug_assert_eq!(
            (src_member + wavelength) % n,
            s_id,
            "probe wavelength must steer through the probed switch"
        );
        let dest = n * out_link + (src_member + 2 * wavelength) % n;

        let seq = self.hello_ctr;
        self.hello_ctr += 1;
        let pkt = Packet::hello(seq, src, wavelength, dest, self.slot * current_slot);
        debug!(
            "[Packet hello-{seq}] : Probing links (1, {in_link}, {s_id}) and (3, {s_id}, {out_link})"
        );
        self.pending_hellos.insert(
            seq,
            PendingProbe {
                freq,
                switch: s_id,
                in_link,
                out_link,
                dispatch_slot: current_slot,
            },
        );
        switches[s_id].queue.push_front(pkt);
    }

    /// Pair the in-links `a` with the out-links `b` of one space switch for probing. Both sides
    /// are shuffled; the shorter side is padded with random non-failed links so every link is
    /// probed at least once. A pair identical to the one probed in the previous tick is broken
    /// up: its out-link is replaced and the displaced out-link is re-paired with a fresh
    /// in-link at the end.
    pub(crate) fn get_permutations(
        &mut self,
        s_id: SwitchId,
        mut a: Vec<usize>,
        mut b: Vec<usize>,
    ) -> (Vec<usize>, Vec<usize>) {
        a.shuffle(&mut self.rng);
        b.shuffle(&mut self.rng);

        let a_choices = (0..self.n)
            .filter(|i| !self.fault_freq[0].stage_one[s_id].contains(i))
            .collect_vec();
        let b_choices = (0..self.n)
            .filter(|i| !self.fault_freq[0].stage_three[s_id].contains(i))
            .collect_vec();

        while a.len() != b.len() {
            if a.len() < b.len() {
                match a_choices.choose(&mut self.rng) {
                    Some(&pick) => a.push(pick),
                    None => {
                        b.truncate(a.len());
                        break;
                    }
                }
            } else {
                match b_choices.choose(&mut self.rng) {
                    Some(&pick) => b.push(pick),
                    None => {
                        a.truncate(b.len());
                        break;
                    }
                }
            }
        }

        for i in 0..a.len() {
            let in_link = a[i];
            let out_link = b[i];
            if self.previous_link_pair[s_id][in_link] == Some(out_link) {
                let rep_in = a_choices.iter().copied().filter(|&j| j != in_link).collect_vec();
                let rep_out = b_choices.iter().copied().filter(|&j| j != out_link).collect_vec();
                match (
                    rep_in.choose(&mut self.rng),
                    rep_out.choose(&mut self.rng),
                ) {
                    (Some(&new_in), Some(&new_out)) => {
                        b[i] = new_out;
                        a.push(new_in);
                        b.push(out_link);
                    }
                    // no replacement candidates left; keep the repeated pair
                    _ => self.previous_link_pair[s_id][in_link] = Some(out_link),
                }
            } else {
                self.previous_link_pair[s_id][in_link] = Some(out_link);
            }
        }

        (a, b)
    }

    /// Register the receipt of a hello packet. If the pair's probing frequency had been
    /// escalated, it is relaxed one band again, and the anomaly counters of both member links
    /// are cleared. Probes arriving past their timeout are logged and ignored.
    pub fn received_hello(&mut self, seq: u64) {
        let probe = match self.pending_hellos.remove(&seq) {
            Some(p) => p,
            None => {
                info!("Past threshold arrival of Hello Packet : hello-{seq}");
                return;
            }
        };
        debug!("Received Hello Packet : hello-{seq}");

        if probe.freq < self.hello_interval {
            let relaxed = probe.freq + 1;
            if self.legacy_deescalation {
                // the reference controller moved the in-link into both stage sets
                self.fault_freq[probe.freq as usize].stage_one[probe.switch].remove(&probe.in_link);
                self.fault_freq[probe.freq as usize].stage_three[probe.switch]
                    .remove(&probe.out_link);
                self.fault_freq[relaxed as usize].stage_one[probe.switch].insert(probe.in_link);
                self.fault_freq[relaxed as usize].stage_three[probe.switch].insert(probe.in_link);
            } else {
                self.move_to_band(probe.switch, Stage::One, probe.in_link, relaxed);
                self.move_to_band(probe.switch, Stage::Three, probe.out_link, relaxed);
            }
        }

        self.anomaly_count
            .remove(&Link::stage_one(probe.in_link, probe.switch));
        self.anomaly_count
            .remove(&Link::stage_three(probe.switch, probe.out_link));
    }
}
