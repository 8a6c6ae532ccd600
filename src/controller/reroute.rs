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

//! Fault-tolerant rerouting of traffic around declared link failures.
//!
//! Two policies exist: the load-aware ResiConnect redirection that weighs free capacity on both
//! the transmitter and the receiver axis, and the nearest-neighbor-transmitter baseline that
//! simply hops to an adjacent transmitter.

use std::collections::BTreeSet;

use clap::ValueEnum;
use log::*;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    packet::Packet,
    transmitter::Transmitter,
    types::TxId,
};

use super::{CachedRoutes, Controller, MAX_TRANSMISSION_COUNT, PREV_EXAMINE_SLOTS};

/// The redirection policy applied when a packet's path crosses a failed link.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum,
)]
pub enum ReroutePolicy {
    /// Load-aware redirection across both the transmitter and the receiver axis.
    #[default]
    ResiConnect,
    /// Redirect to an adjacent transmitter (nearest-neighbor baseline).
    NearestNeighbor,
}

impl Controller {
    /// Compute the free-capacity estimate of every transmitter attached to the given source
    /// AWGR, averaged over the last [`PREV_EXAMINE_SLOTS`] slots, and cache the result together
    /// with the per-transmitter pairwise dispatch data.
    pub(crate) fn compute_routes(&mut self, awgr: usize, transmitters: &[Transmitter]) -> Vec<f64> {
        let n = self.n;
        let mut t_free = Vec::with_capacity(n);
        let mut data = Vec::with_capacity(n);
        for alt in 0..n {
            let tx = &transmitters[awgr * n + alt];
            let window = tx.pairwise_transmission_count(self.current_slot, PREV_EXAMINE_SLOTS);
            let avg_usage = window.count as f64 / PREV_EXAMINE_SLOTS as f64;
            t_free.push(MAX_TRANSMISSION_COUNT as f64 * n as f64 - avg_usage);
            data.push(window);
        }
        self.alternate_routes.insert(
            awgr,
            CachedRoutes {
                version: self.failed_links_version,
                t_free: t_free.clone(),
                data,
            },
        );
        t_free
    }

    /// The cached free-capacity estimates for the given source AWGR, recomputed if the
    /// failed-link set changed since they were cached.
    fn fresh_routes(&mut self, awgr: usize, transmitters: &[Transmitter]) -> Vec<f64> {
        match self.alternate_routes.get(&awgr) {
            Some(cache) if cache.version == self.failed_links_version => cache.t_free.clone(),
            _ => self.compute_routes(awgr, transmitters),
        }
    }

    /// ResiConnect redirection: rewrite the packet's source *or* destination, balancing across
    /// whichever axis has more headroom.
    ///
    /// For the packet's source AWGR, the per-transmitter free capacities `T_free` come from
    /// [`Self::compute_routes`]. For the destination AWGR, the per-receiver free capacities
    /// `R_free` are derived from the failing transmitter's pairwise dispatch history. If any
    /// other transmitter's `T_free` is below `sum(R_free)`, the receiver axis is used,
    /// otherwise the transmitter axis. The rewrite target is sampled from the chosen free
    /// vector, normalized to a distribution over the remaining candidates.
    pub(crate) fn resi_redirect(&mut self, pkt: &mut Packet, transmitters: &[Transmitter]) {
        let n = self.n;
        let m_src = pkt.src % n;
        let m_dest = pkt.dest % n;
        let src_awgr = pkt.src / n;
        let dest_awgr = pkt.dest / n;

        let failed: BTreeSet<usize> = pkt.failed_transmitters.iter().map(|t| t % n).collect();
        let transmitter_choices: Vec<usize> = (0..n)
            .filter(|i| !failed.contains(i) && *i != m_src)
            .collect();
        let receiver_choices: Vec<usize> = (0..n).filter(|i| *i != m_dest).collect();

        let t_free = self.fresh_routes(src_awgr, transmitters);
        let pairwise = self.alternate_routes[&src_awgr].data[m_src].per_dest.clone();

        // free capacity towards each receiver of the destination AWGR
        let mut recv_free = Vec::with_capacity(n);
        for i in (dest_awgr * n)..((dest_awgr + 1) * n) {
            if i == pkt.dest {
                recv_free.push(0.0);
            } else if let Some(&sent) = pairwise.get(&i) {
                recv_free
                    .push(MAX_TRANSMISSION_COUNT as f64 - sent as f64 / PREV_EXAMINE_SLOTS as f64);
            } else {
                recv_free.push(0.0);
            }
        }
        let recv_free_sum: f64 = recv_free.iter().sum();

        let recv_redirection = (0..n).any(|k| k != m_src && recv_free_sum > t_free[k]);

        let (free, mut choices, current) = if recv_redirection {
            (recv_free, receiver_choices, m_dest)
        } else {
            (t_free, transmitter_choices, m_src)
        };
        if choices.is_empty() {
            // every candidate on this axis is exhausted; spread uniformly over the group
            choices = (0..n).filter(|i| *i != current).collect();
        }
        let pick = self.weighted_pick(&free, &choices);

        if recv_redirection {
            debug!("[Packet {}] : Redirected to Receiver {}", pkt.id, pick + n * dest_awgr);
            pkt.dest = pick + n * dest_awgr;
        } else {
            debug!("[Packet {}] : Redirected to Transmitter {}", pkt.id, pick + n * src_awgr);
            pkt.src = pick + n * src_awgr;
        }
    }

    /// Weighted transmitter-only redirection: pick an alternate transmitter on the packet's
    /// source AWGR, sampled by free capacity. This is the transmitter half of
    /// [`Self::resi_redirect`], kept for comparison runs against the nearest-neighbor baseline.
    pub fn alternate_transmitter(&mut self, pkt: &Packet, transmitters: &[Transmitter]) -> TxId {
        let n = self.n;
        let m_src = pkt.src % n;
        let src_awgr = pkt.src / n;

        let failed: BTreeSet<usize> = pkt.failed_transmitters.iter().map(|t| t % n).collect();
        let mut choices: Vec<usize> = (0..n)
            .filter(|i| !failed.contains(i) && *i != m_src)
            .collect();
        if choices.is_empty() {
            choices = (0..n).filter(|i| *i != m_src).collect();
        }

        let t_free = self.fresh_routes(src_awgr, transmitters);
        let pick = self.weighted_pick(&t_free, &choices);
        pick + n * src_awgr
    }

    /// Nearest-neighbor-transmitter baseline: redirect to `src - 1` or `src + 1`, staying
    /// within the source AWGR.
    pub fn adjacent_transmitter(&mut self, pkt: &Packet) -> TxId {
        let n = self.n;
        let src = pkt.src;
        if src % n == 0 {
            src + 1
        } else if src % n == n - 1 {
            src - 1
        } else if self.rng.gen::<bool>() {
            src + 1
        } else {
            src - 1
        }
    }

    /// Sample one index from `choices`, weighted by the free-capacity vector (uniform over the
    /// candidates when no capacity is free anywhere).
    fn weighted_pick(&mut self, free: &[f64], choices: &[usize]) -> usize {
        let n = self.n;
        let mut weights = vec![0.0; n];
        let mut total = 0.0;
        for &i in choices {
            weights[i] = free[i];
            total += free[i];
        }
        if total == 0.0 {
            for &i in choices {
                weights[i] = 1.0 / choices.len() as f64;
            }
        } else {
            for w in weights.iter_mut() {
                *w /= total;
            }
        }

        let p: f64 = self.rng.gen();
        let mut acc = 0.0;
        let mut pick = choices.last().copied().unwrap_or(0);
        for (i, w) in weights.iter().enumerate() {
            if *w == 0.0 {
                continue;
            }
            if acc + w > p {
                pick = i;
                break;
            }
            acc += w;
        }
        pick
    }
}
