// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use super::MAX_K;
use super::MIN_K;

const POWERS_OF_THREE: [u64; 31] = [
    1,
    3,
    9,
    27,
    81,
    243,
    729,
    2187,
    6561,
    19683,
    59049,
    177147,
    531441,
    1594323,
    4782969,
    14348907,
    43046721,
    129140163,
    387420489,
    1162261467,
    3486784401,
    10460353203,
    31381059609,
    94143178827,
    282429536481,
    847288609443,
    2541865828329,
    7625597484987,
    22876792454961,
    68630377364883,
    205891132094649,
];

pub fn compute_total_capacity(k: u16, m: u8, num_levels: usize) -> u32 {
    let mut total: u32 = 0;
    for level in 0..num_levels {
        total += level_capacity(k, num_levels, level, m);
    }
    total
}

pub fn level_capacity(k: u16, num_levels: usize, height: usize, min_wid: u8) -> u32 {
    assert!(height < num_levels, "height must be < num_levels");
    let depth = num_levels - height - 1;
    let cap = int_cap_aux(k, depth as u8);
    std::cmp::max(min_wid as u32, cap as u32)
}

pub fn int_cap_aux(k: u16, depth: u8) -> u16 {
    assert!(depth <= 60, "depth must be <= 60");
    if depth <= 30 {
        return int_cap_aux_aux(k, depth);
    }
    let half = depth / 2;
    let rest = depth - half;
    let tmp = int_cap_aux_aux(k, half);
    int_cap_aux_aux(tmp, rest)
}

pub fn int_cap_aux_aux(k: u16, depth: u8) -> u16 {
    assert!(depth <= 30, "depth must be <= 30");
    let twok = (k as u64) << 1;
    let tmp = (twok << depth) / POWERS_OF_THREE[depth as usize];
    let result = (tmp + 1) >> 1;
    assert!(result <= k as u64, "capacity result exceeds k");
    result as u16
}

pub fn sum_the_sample_weights(level_sizes: &[usize]) -> u64 {
    let mut total = 0u64;
    let mut weight = 1u64;
    for &size in level_sizes {
        total += weight * size as u64;
        weight <<= 1;
    }
    total
}

/// Normalized rank error for the given `k`, per the KLL accuracy model.
///
/// `pmf` selects the (larger) union-bound constant used for PMF/CDF queries
/// over the (smaller) constant used for a single rank query.
pub fn normalized_rank_error(k: u16, pmf: bool) -> f64 {
    let k = k as f64;
    if pmf {
        2.446 / k.powf(0.9433)
    } else {
        2.296 / k.powf(0.9723)
    }
}

/// Smallest `k` in `[MIN_K, MAX_K]` whose `normalized_rank_error(k, pmf)` is
/// at most `eps`. Returns `MAX_K` if no such `k` exists within range.
pub fn k_from_epsilon(eps: f64, pmf: bool) -> u16 {
    assert!(eps > 0.0, "eps must be positive");
    let mut lo = MIN_K;
    let mut hi = MAX_K;
    if normalized_rank_error(hi, pmf) > eps {
        return hi;
    }
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if normalized_rank_error(mid, pmf) <= eps {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_monotone_non_increasing() {
        let mut prev = f64::INFINITY;
        for k in [8u16, 16, 32, 64, 128, 200, 256, 1024, 65535] {
            let eps = normalized_rank_error(k, false);
            assert!(eps <= prev);
            prev = eps;
        }
    }

    #[test]
    fn k_from_epsilon_round_trips_approximately() {
        let eps = normalized_rank_error(200, false);
        let k = k_from_epsilon(eps, false);
        assert!(normalized_rank_error(k, false) <= eps);
    }

    #[test]
    fn int_cap_aux_matches_recurrence_for_small_depths() {
        let k = 200u16;
        assert_eq!(int_cap_aux(k, 0), k);
        let mut expected = k as u64;
        for depth in 1..10u8 {
            expected = (2 * expected).div_ceil(3);
            assert_eq!(int_cap_aux(k, depth) as u64, expected);
        }
    }
}
