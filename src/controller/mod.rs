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

//! # The centralized controller
//!
//! The controller is the engine of the simulator. On every arriving packet it assigns the
//! wavelength and space switch that the deterministic AWGR routing dictates
//! ([`Controller::enqueue_scheduler`]); on every slot boundary it sweeps the outstanding probes
//! for timeouts and dispatches new ones ([`Controller::fault_tracking`]), then allots the
//! closing slot by matching each space switch's request matrix to a crossbar permutation under
//! the per-wavelength transmission cap ([`Controller::allot_slots`]). Packets whose path
//! crosses a declared-failed link are redirected onto surviving transmitters or receivers
//! ([`Controller::enqueue_scheduler`] with [`ReroutePolicy`]).
//!
//! The controller owns all scheduling, fault, and probe bookkeeping; it borrows the space
//! switches and transmitters it operates on from the network for the duration of each call.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::*;
use rand::prelude::*;

use crate::{
    matching::Matcher,
    packet::Packet,
    space_switch::SpaceSwitch,
    transmitter::{TransmissionCounts, Transmitter},
    types::{Link, SwitchId},
};

mod fault;
mod reroute;
pub use fault::LinkTracking;
pub use reroute::ReroutePolicy;

/// Maximum number of transmissions per (transmitter, wavelength) within one slot. The per-slot
/// transmitter capacity is `MAX_TRANSMISSION_COUNT * n`.
pub const MAX_TRANSMISSION_COUNT: u32 = 1;
/// Value of m: how many previous time slots the load-balancing statistics examine.
pub const PREV_EXAMINE_SLOTS: u64 = 10;
/// Slots after which an unanswered probe counts as timed out.
pub const RECEIVE_THRESHOLD: u64 = 10;
/// Probe timeouts after which a link is declared failed.
pub const ANOMALY_THRESHOLD: u32 = 10;
/// Penalty in nanoseconds added to a packet's miscellaneous delay on each redirection.
pub const REROUTE_PENALTY: u64 = 1200;

/// Outcome of scheduling one arriving packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Schedule {
    /// The packet was placed on its space switch queue and awaits a slot.
    Queued,
    /// The packet's path crosses a failed link; it was redirected and must re-enter the fabric
    /// through the transmitter it now names as its source.
    Reroute(Packet),
}

/// A probe in flight, waiting to be answered by a receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingProbe {
    /// The frequency band the probe was dispatched from.
    pub freq: u64,
    /// The space switch whose adjacent link pair the probe traverses.
    pub switch: SwitchId,
    /// The stage-1 in-link of the pair.
    pub in_link: usize,
    /// The stage-3 out-link of the pair.
    pub out_link: usize,
    /// The slot in which the probe was handed to the space switch.
    pub dispatch_slot: u64,
}

/// Cached free-capacity estimates for the transmitters of one source AWGR, invalidated whenever
/// the failed-link set changes.
#[derive(Debug, Clone)]
pub(crate) struct CachedRoutes {
    pub version: u64,
    pub t_free: Vec<f64>,
    pub data: Vec<TransmissionCounts>,
}

/// The centralized controller. See the [module documentation](self) for an overview.
#[derive(Debug)]
pub struct Controller {
    pub(crate) n: usize,
    /// Slot duration in nanoseconds.
    pub(crate) slot: u64,
    /// The slowest probe interval; also the number of non-failed frequency bands.
    pub(crate) hello_interval: u64,
    /// The slot currently running, tracked from packet arrivals.
    pub(crate) current_slot: u64,
    /// Links declared failed, as `(stage, a, b)` tuples. Grows monotonically.
    pub(crate) failed_links: BTreeSet<Link>,
    /// Bumped on every declaration; invalidates [`CachedRoutes`].
    pub(crate) failed_links_version: u64,
    pub(crate) alternate_routes: HashMap<usize, CachedRoutes>,
    /// Probes awaiting a receiver report, keyed by probe sequence number.
    pub(crate) pending_hellos: BTreeMap<u64, PendingProbe>,
    /// Probe timeouts per link since the last successful receipt.
    pub(crate) anomaly_count: BTreeMap<Link, u32>,
    /// Sequence number of the next hello packet.
    pub(crate) hello_ctr: u64,
    /// Frequency bands `0..=hello_interval`; band 0 holds declared-failed links, all links
    /// start in band `hello_interval`.
    pub(crate) fault_freq: Vec<LinkTracking>,
    /// Last out-link paired with each (switch, in-link), to avoid probing the same pair twice
    /// in a row.
    pub(crate) previous_link_pair: Vec<Vec<Option<usize>>>,
    pub(crate) reroute: ReroutePolicy,
    /// Budget of failures the event source will inject; declaring more is fatal.
    pub(crate) expected_failures: usize,
    /// Virtual time at which the most recent fault was declared.
    pub(crate) fault_found_at: Option<u64>,
    /// Replicate the reference controller's probe de-escalation bookkeeping (which moved the
    /// in-link into both stage sets) instead of the corrected pairwise move.
    pub(crate) legacy_deescalation: bool,
    pub(crate) rng: StdRng,
}

impl Controller {
    /// Create a new controller for a fabric of scale `n`, with the given slot duration (ns) and
    /// hello interval. All links start in the slowest band. Randomness (probe pairing, probe
    /// member choice, redirection sampling) is drawn from a generator seeded with `seed`.
    pub fn new(n: usize, slot: u64, hello_interval: u64, seed: u64) -> Self {
        let mut fault_freq: Vec<LinkTracking> = (0..=hello_interval)
            .map(|_| LinkTracking::new(n))
            .collect();
        let init = &mut fault_freq[hello_interval as usize];
        for s_id in 0..n {
            init.stage_one[s_id].extend(0..n);
            init.stage_three[s_id].extend(0..n);
        }

        Self {
            n,
            slot,
            hello_interval,
            current_slot: 0,
            failed_links: BTreeSet::new(),
            failed_links_version: 0,
            alternate_routes: HashMap::new(),
            pending_hellos: BTreeMap::new(),
            anomaly_count: BTreeMap::new(),
            hello_ctr: 1,
            fault_freq,
            previous_link_pair: vec![vec![None; n]; n],
            reroute: ReroutePolicy::default(),
            expected_failures: 0,
            fault_found_at: None,
            legacy_deescalation: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Select the rerouting policy applied when a packet's path crosses a failed link.
    pub fn set_reroute_policy(&mut self, policy: ReroutePolicy) {
        self.reroute = policy;
    }

    /// Set the number of link failures the event source is going to inject. Declaring more
    /// faults than this budget aborts the simulation.
    pub fn set_expected_failures(&mut self, count: usize) {
        self.expected_failures = count;
    }

    /// Replicate the reference controller's de-escalation bookkeeping on probe receipt instead
    /// of the corrected behavior.
    pub fn set_legacy_deescalation(&mut self, legacy: bool) {
        self.legacy_deescalation = legacy;
    }

    /// The slot currently running.
    pub fn current_slot(&self) -> u64 {
        self.current_slot
    }

    /// The links declared failed so far.
    pub fn failed_links(&self) -> &BTreeSet<Link> {
        &self.failed_links
    }

    /// Number of hello packets dispatched so far.
    pub fn hello_count(&self) -> u64 {
        self.hello_ctr - 1
    }

    /// Virtual time of the most recent fault declaration, if any.
    pub fn fault_found_at(&self) -> Option<u64> {
        self.fault_found_at
    }

    /// Assign wavelength and space switch to an arriving packet and queue it for scheduling.
    ///
    /// With `mSrc = src mod n` and `mDest = dest mod n`, the deterministic AWGR routing fixes
    /// the wavelength to `(mDest - mSrc) / 2 mod n` (shifted by `n` when the difference is odd)
    /// and the space switch to `(mDest + mSrc) / 2 mod n` (likewise). If either adjacent link
    /// of that switch is declared failed, the packet is redirected instead and must re-enter
    /// through its new transmitter.
    pub fn enqueue_scheduler(
        &mut self,
        mut pkt: Packet,
        switches: &mut [SpaceSwitch],
        transmitters: &[Transmitter],
    ) -> Schedule {
        let n = self.n as i64;
        self.current_slot = pkt.arrival_time / self.slot;

        let m_src = (pkt.src % self.n) as i64;
        let m_dest = (pkt.dest % self.n) as i64;

        let diff = m_dest - m_src;
        let wavelength = if diff % 2 == 0 {
            (diff / 2).rem_euclid(n) as usize
        } else {
            ((n + diff) / 2).rem_euclid(n) as usize
        };
        pkt.wavelength = Some(wavelength);

        let sum = m_dest + m_src;
        let s_switch_id = if sum % 2 == 0 {
            ((sum / 2) % n) as usize
        } else {
            (((sum + n) / 2) % n) as usize
        };

        let path = [
            Link::stage_one(pkt.src / self.n, s_switch_id),
            Link::stage_three(s_switch_id, pkt.dest / self.n),
        ];
        if path.iter().any(|l| self.failed_links.contains(l)) {
            pkt.failed_transmitters.push(pkt.src);
            match self.reroute {
                ReroutePolicy::ResiConnect => self.resi_redirect(&mut pkt, transmitters),
                ReroutePolicy::NearestNeighbor => pkt.src = self.adjacent_transmitter(&pkt),
            }
            pkt.misc_delay += REROUTE_PENALTY;
            info!(
                "[Packet {}] : Being re-routed through Transmitter {}....",
                pkt.id, pkt.src
            );
            Schedule::Reroute(pkt)
        } else {
            switches[s_switch_id].queue.push_back(pkt);
            Schedule::Queued
        }
    }

    /// Allot the closing slot `slot_number`: accumulate each space switch's queue into its
    /// request matrix, solve the crossbar matching, and dispatch every queued packet whose
    /// source/destination pair won its permutation entry, subject to the per-wavelength
    /// transmission cap. Returns the dispatched packets in order; the caller forwards them
    /// through the fabric.
    pub fn allot_slots(
        &self,
        slot_number: u64,
        switches: &mut [SpaceSwitch],
        transmitters: &mut [Transmitter],
    ) -> Vec<Packet> {
        let n = self.n;
        let mut launches = Vec::new();

        for s_id in 0..n {
            // accumulate the request matrix over the queued packets
            let mut requests = vec![vec![0u32; n]; n];
            for pkt in switches[s_id].queue.iter() {
                requests[pkt.src / n][pkt.dest / n] += 1;
            }

            let matching = {
                let state = switches[s_id].slot_state(slot_number);
                for (row, add) in state.req_matrix.iter_mut().zip(requests) {
                    for (entry, a) in row.iter_mut().zip(add) {
                        *entry += a;
                    }
                }
                let (value, matching) = Matcher::new(&state.req_matrix).solve();
                debug!(
                    "[Space Switch {s_id}] : Slot {slot_number} matching grants {value} requests"
                );
                state.final_state = Some(matching.clone());
                matching
            };

            // dispatch every queued packet that won its permutation entry, as far as the
            // wavelength cap allows; the rest stay queued for a future slot
            let queue = std::mem::take(&mut switches[s_id].queue);
            for mut pkt in queue {
                let wavelength = match pkt.wavelength {
                    Some(w) => w,
                    None => {
                        warn!("[Packet {}] : No wavelength assigned, dropping", pkt.id);
                        continue;
                    }
                };
                if pkt.dest / n != matching[pkt.src / n] {
                    switches[s_id].queue.push_back(pkt);
                    continue;
                }
                let schedulable = {
                    let state = switches[s_id].slot_state(slot_number);
                    let counts = state.transmissions.entry(pkt.src).or_default();
                    let per_wavelength = counts.per_wavelength.entry(wavelength).or_insert(0);
                    if *per_wavelength < MAX_TRANSMISSION_COUNT {
                        *per_wavelength += 1;
                        counts.count += 1;
                        true
                    } else {
                        false
                    }
                };
                if schedulable {
                    pkt.dispatch_slot = Some(slot_number);
                    pkt.scheduling_delay = Some((slot_number + 1) * self.slot - pkt.arrival_time);
                    debug!("[Packet {}] : Wavelength Assigned = {}", pkt.id, wavelength);
                    debug!("[Packet {}] : Space Switch Assigned = {}", pkt.id, s_id);
                    debug!("[Packet {}] : Time Slot Assigned = {}", pkt.id, slot_number);
                    transmitters[pkt.src].record_dispatch(slot_number, pkt.dest);
                    launches.push(pkt);
                } else {
                    switches[s_id].queue.push_back(pkt);
                }
            }
        }

        launches
    }

    /// Returns `true` iff no space switch has packets awaiting scheduling.
    pub fn queues_empty(&self, switches: &[SpaceSwitch]) -> bool {
        switches.iter().all(|s| s.queue.is_empty())
    }

    /// Keep allotting slots starting at `slot_number` until every space switch queue is empty.
    /// Used once the event set ends to flush all remaining traffic. Returns the dispatched
    /// packets across all flushed slots.
    pub fn clear_queue(
        &self,
        mut slot_number: u64,
        switches: &mut [SpaceSwitch],
        transmitters: &mut [Transmitter],
    ) -> Vec<Packet> {
        let mut launches = Vec::new();
        while !self.queues_empty(switches) {
            launches.extend(self.allot_slots(slot_number, switches, transmitters));
            slot_number += 1;
        }
        launches
    }
}
