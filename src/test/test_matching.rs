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

//! Test the request-matrix assignment solver.

use crate::matching::Matcher;
use pretty_assertions::assert_eq;

fn is_permutation(matching: &[usize]) -> bool {
    let mut seen = vec![false; matching.len()];
    for &m in matching {
        if m >= matching.len() || seen[m] {
            return false;
        }
        seen[m] = true;
    }
    true
}

#[test]
fn diagonal_matrix() {
    let weights = vec![vec![3, 0, 0], vec![0, 7, 0], vec![0, 0, 2]];
    let (value, matching) = Matcher::new(&weights).solve();
    assert_eq!(value, 12);
    assert_eq!(matching, vec![0, 1, 2]);
}

#[test]
fn anti_diagonal_matrix() {
    let weights = vec![vec![0, 0, 5], vec![0, 5, 0], vec![5, 0, 0]];
    let (value, matching) = Matcher::new(&weights).solve();
    assert_eq!(value, 15);
    assert_eq!(matching, vec![2, 1, 0]);
}

#[test]
fn greedy_row_choice_is_suboptimal() {
    // taking the largest entry of row 0 first would forfeit row 1 entirely
    let weights = vec![vec![5, 4], vec![5, 0]];
    let (value, matching) = Matcher::new(&weights).solve();
    assert_eq!(value, 9);
    assert_eq!(matching, vec![1, 0]);
}

#[test]
fn empty_requests_yield_identity() {
    let weights = vec![vec![0; 4]; 4];
    let (value, matching) = Matcher::new(&weights).solve();
    assert_eq!(value, 0);
    assert_eq!(matching, vec![0, 1, 2, 3]);
}

#[test]
fn ties_break_lexicographically() {
    let weights = vec![vec![1; 3]; 3];
    let (value, matching) = Matcher::new(&weights).solve();
    assert_eq!(value, 3);
    assert_eq!(matching, vec![0, 1, 2]);
}

#[test]
fn result_is_always_a_permutation() {
    let weights = vec![
        vec![2, 9, 1, 4],
        vec![9, 2, 4, 1],
        vec![1, 4, 2, 9],
        vec![4, 1, 9, 2],
    ];
    let (value, matching) = Matcher::new(&weights).solve();
    assert!(is_permutation(&matching));
    assert_eq!(value, 36);
    let granted: u64 = matching
        .iter()
        .enumerate()
        .map(|(i, &j)| weights[i][j] as u64)
        .sum();
    assert_eq!(granted, value);
}

#[test]
fn single_hot_pair_wins() {
    let mut weights = vec![vec![0; 5]; 5];
    weights[3][1] = 10;
    let (value, matching) = Matcher::new(&weights).solve();
    assert_eq!(value, 10);
    assert_eq!(matching[3], 1);
    assert!(is_permutation(&matching));
}
