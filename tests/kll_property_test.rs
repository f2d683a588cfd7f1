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

use googletest::prelude::*;
use kll_sketch::common::RandomSource;
use kll_sketch::common::XorShift64;
use kll_sketch::kll::DEFAULT_K;
use kll_sketch::kll::KllSketch;
use kll_sketch::kll::QuantileSearchCriterion::Inclusive;

fn seeded_stream(seed: u64, count: usize) -> Vec<f64> {
    let mut rng = XorShift64::seeded(seed);
    (0..count)
        .map(|_| (rng.next_u64() % 1_000_000) as f64)
        .collect()
}

#[test]
fn test_rank_is_monotone_non_decreasing_across_sorted_view() {
    let data = seeded_stream(1, 5_000);
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update_slice(&data).unwrap();

    let view = sketch.sorted_view().unwrap();
    let mut sorted = data.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mut last_rank = 0.0;
    for item in sorted.iter().step_by(97) {
        let rank = view.rank(item, Inclusive);
        expect_that!(rank, ge(last_rank));
        last_rank = rank;
    }
}

#[test]
fn test_quantile_of_rank_is_within_normalized_error_of_true_rank() {
    let data = seeded_stream(2, 20_000);
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update_slice(&data).unwrap();

    let mut sorted = data.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let eps = sketch.normalized_rank_error(false);

    for probe_rank in [0.1, 0.25, 0.5, 0.75, 0.9] {
        let estimated = sketch.quantile(probe_rank, Inclusive).unwrap();
        let true_index = sorted.partition_point(|v| *v <= estimated);
        let true_rank = true_index as f64 / sorted.len() as f64;
        expect_that!((true_rank - probe_rank).abs(), le(eps + 0.02));
    }
}

#[test]
fn test_pmf_sums_to_one_and_matches_cdf_differences() {
    let data = seeded_stream(3, 2_000);
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update_slice(&data).unwrap();

    let split_points = [100_000.0, 300_000.0, 500_000.0, 700_000.0, 900_000.0];
    let pmf = sketch.pmf(&split_points, Inclusive).unwrap();
    let cdf = sketch.cdf(&split_points, Inclusive).unwrap();

    let pmf_sum: f64 = pmf.iter().sum();
    assert!((pmf_sum - 1.0).abs() < 1e-9);

    let mut running = 0.0;
    for (bucket, cdf_value) in pmf.iter().zip(cdf.iter()) {
        running += bucket;
        assert!((running - cdf_value).abs() < 1e-9);
    }
    assert!((running - *cdf.last().unwrap()).abs() < 1e-9);
}

#[test]
fn test_total_weight_conserved_across_repeated_merges() {
    let mut accumulator = KllSketch::<f64>::new(DEFAULT_K);
    let mut expected_total = 0u64;
    for seed in 1..=10u64 {
        let data = seeded_stream(seed, 400);
        let mut shard = KllSketch::<f64>::new_with_rng(DEFAULT_K, XorShift64::seeded(seed));
        shard.update_slice(&data).unwrap();
        expected_total += data.len() as u64;
        accumulator.merge(&shard).unwrap();
        assert_eq!(accumulator.n(), expected_total);
    }
}

#[test]
fn test_update_weighted_does_not_change_min_or_max() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update(10.0).unwrap();
    sketch.update(20.0).unwrap();
    sketch.update_weighted(15.0, 1_000).unwrap();

    assert_eq!(sketch.min_item(), Some(&10.0));
    assert_eq!(sketch.max_item(), Some(&20.0));
    assert_eq!(sketch.n(), 1_002);
}

#[test]
fn test_iter_weights_sum_to_n() {
    let data = seeded_stream(5, 3_000);
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update_slice(&data).unwrap();

    let total_weight: u64 = sketch.iter().map(|(_, weight)| weight).sum();
    assert_eq!(total_weight, sketch.n());
    assert_eq!(sketch.iter().count(), sketch.num_retained());
}

#[test]
fn test_num_retained_never_exceeds_total_capacity_bound() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    let data = seeded_stream(4, 100_000);
    for (i, value) in data.iter().enumerate() {
        sketch.update(*value).unwrap();
        if i % 5_000 == 0 {
            expect_that!(sketch.num_retained(), le(sketch.n() as usize));
        }
    }
    assert!(sketch.is_estimation_mode());
}
