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

//! Maximum-weight bipartite matching of a per-slot request matrix.
//!
//! The controller hands the solver an `n x n` matrix of connection requests between source and
//! destination AWGRs and receives back a crossbar permutation maximizing the number of granted
//! requests. The solver is exact and fully deterministic: among all optimal permutations it
//! returns the lexicographically smallest one, so repeated runs (and ties) always configure the
//! crossbar identically.
//!
//! The search runs over column subsets (`O(2^n * n)` time and `O(2^n)` space), which is exact
//! and fast for the fabric sizes this simulator targets; the network constructor rejects `n`
//! beyond the supported range.

/// Solver for the per-slot crossbar assignment.
#[derive(Debug, Clone)]
pub struct Matcher<'a> {
    weights: &'a [Vec<u32>],
}

impl<'a> Matcher<'a> {
    /// Create a solver over a square request matrix. `weights[i][j]` counts the requests from
    /// source AWGR `i` to destination AWGR `j`.
    pub fn new(weights: &'a [Vec<u32>]) -> Self {
        Self { weights }
    }

    /// Solve the assignment. Returns the total granted weight and the permutation, where entry
    /// `i` is the crossbar output port connected to input port `i`.
    pub fn solve(&self) -> (u64, Vec<usize>) {
        let n = self.weights.len();
        debug_assert!(self.weights.iter().all(|row| row.len() == n));
        debug_assert!(n <= 16, "request matrix too large for subset search");
        if n == 0 {
            return (0, Vec::new());
        }

        let full: usize = (1 << n) - 1;
        // best[mask]: the best value of assigning rows (n - |mask|).. to exactly the columns in
        // mask. best[full] covers all rows.
        let mut best = vec![0u64; 1 << n];
        for mask in 1..=full {
            let row = n - (mask as u32).count_ones() as usize;
            let mut val = 0u64;
            let mut bits = mask;
            while bits != 0 {
                let col = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                let cand = self.weights[row][col] as u64 + best[mask & !(1 << col)];
                val = val.max(cand);
            }
            best[mask] = val;
        }

        // reconstruct, preferring the smallest column for each row in turn so the result is the
        // lexicographically smallest optimal permutation
        let mut matching = Vec::with_capacity(n);
        let mut mask = full;
        for row in 0..n {
            for col in 0..n {
                if mask & (1 << col) == 0 {
                    continue;
                }
                let rest = mask & !(1 << col);
                if self.weights[row][col] as u64 + best[rest] == best[mask] {
                    matching.push(col);
                    mask = rest;
                    break;
                }
            }
        }
        debug_assert_eq!(matching.len(), n);

        (best[full], matching)
    }
}
