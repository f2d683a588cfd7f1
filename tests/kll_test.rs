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

use kll_sketch::error::ErrorKind;
use kll_sketch::kll::DEFAULT_K;
use kll_sketch::kll::KllSketch;
use kll_sketch::kll::MAX_K;
use kll_sketch::kll::MIN_K;
use kll_sketch::kll::QuantileSearchCriterion::Exclusive;
use kll_sketch::kll::QuantileSearchCriterion::Inclusive;

const NUMERIC_NOISE_TOLERANCE: f64 = 1e-6;

fn assert_approx_eq(actual: f64, expected: f64, tolerance: f64) {
    let delta = (actual - expected).abs();
    assert!(
        delta <= tolerance,
        "expected {expected} +/- {tolerance}, got {actual}"
    );
}

#[test]
fn test_k_limits() {
    let _min = KllSketch::<f32>::new(MIN_K);
    let _max = KllSketch::<f32>::new(MAX_K);
}

#[test]
#[should_panic(expected = "k must be in")]
fn test_k_too_small_panics() {
    KllSketch::<f32>::new(MIN_K - 1);
}

#[test]
fn test_empty() {
    let sketch = KllSketch::<f32>::new(DEFAULT_K);
    assert!(sketch.is_empty());
    assert!(!sketch.is_estimation_mode());
    assert_eq!(sketch.n(), 0);
    assert_eq!(sketch.num_retained(), 0);
    assert!(sketch.min_item().is_none());
    assert!(sketch.max_item().is_none());
    assert_eq!(sketch.rank(&0.0, Inclusive).unwrap_err().kind(), ErrorKind::SketchEmpty);
    assert_eq!(
        sketch.quantile(0.5, Inclusive).unwrap_err().kind(),
        ErrorKind::SketchEmpty
    );
    assert_eq!(
        sketch.pmf(&[0.0f32], Inclusive).unwrap_err().kind(),
        ErrorKind::SketchEmpty
    );
    assert_eq!(
        sketch.cdf(&[0.0f32], Inclusive).unwrap_err().kind(),
        ErrorKind::SketchEmpty
    );
}

#[test]
#[should_panic(expected = "rank must be in [0.0, 1.0]")]
fn test_quantile_out_of_range_panics() {
    let mut sketch = KllSketch::<f32>::new(DEFAULT_K);
    sketch.update(0.0).unwrap();
    sketch.quantile(-1.0, Inclusive).unwrap();
}

#[test]
fn test_one_item() {
    let mut sketch = KllSketch::<f32>::new(DEFAULT_K);
    sketch.update(1.0).unwrap();
    assert!(!sketch.is_empty());
    assert!(!sketch.is_estimation_mode());
    assert_eq!(sketch.n(), 1);
    assert_eq!(sketch.num_retained(), 1);
    assert_eq!(sketch.rank(&1.0, Exclusive).unwrap(), 0.0);
    assert_eq!(sketch.rank(&1.0, Inclusive).unwrap(), 1.0);
    assert_eq!(sketch.rank(&2.0, Exclusive).unwrap(), 1.0);
    assert_eq!(sketch.min_item().cloned(), Some(1.0));
    assert_eq!(sketch.max_item().cloned(), Some(1.0));
    assert_eq!(sketch.quantile(0.5, Inclusive).unwrap(), 1.0);
}

#[test]
fn test_nan_is_ignored() {
    let mut sketch = KllSketch::<f32>::new(DEFAULT_K);
    sketch.update(f32::NAN).unwrap();
    assert!(sketch.is_empty());
    sketch.update(0.0).unwrap();
    sketch.update(f32::NAN).unwrap();
    assert_eq!(sketch.n(), 1);
}

#[test]
fn test_cdf_rejects_single_nan_split_point() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update(1.0).unwrap();
    sketch.update(2.0).unwrap();
    let err = sketch.cdf(&[f64::NAN], Inclusive).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_pmf_rejects_nan_among_multiple_split_points() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update(1.0).unwrap();
    sketch.update(2.0).unwrap();
    sketch.update(3.0).unwrap();
    let err = sketch.pmf(&[1.5, f64::NAN], Inclusive).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_many_items_exact_mode() {
    let mut sketch = KllSketch::<f32>::new(DEFAULT_K);
    let n = DEFAULT_K as usize;
    for i in 1..=n {
        sketch.update(i as f32).unwrap();
        assert_eq!(sketch.n(), i as u64);
    }
    assert!(!sketch.is_empty());
    assert!(!sketch.is_estimation_mode());
    assert_eq!(sketch.num_retained(), n);
    assert_eq!(sketch.min_item().cloned(), Some(1.0));
    assert_eq!(sketch.quantile(0.0, Inclusive).unwrap(), 1.0);
    assert_eq!(sketch.max_item().cloned(), Some(n as f32));
    assert_eq!(sketch.quantile(1.0, Inclusive).unwrap(), n as f32);

    for i in 1..=n {
        let inclusive_rank = i as f64 / n as f64;
        assert_eq!(sketch.rank(&(i as f32), Inclusive).unwrap(), inclusive_rank);
        let exclusive_rank = (i - 1) as f64 / n as f64;
        assert_eq!(sketch.rank(&(i as f32), Exclusive).unwrap(), exclusive_rank);
    }
}

#[test]
fn test_ten_items_quantiles() {
    let mut sketch = KllSketch::<f32>::new(DEFAULT_K);
    for i in 1..=10 {
        sketch.update(i as f32).unwrap();
    }
    assert_eq!(sketch.quantile(0.0, Inclusive).unwrap(), 1.0);
    assert_eq!(sketch.quantile(0.5, Inclusive).unwrap(), 5.0);
    assert_eq!(sketch.quantile(0.99, Inclusive).unwrap(), 10.0);
    assert_eq!(sketch.quantile(1.0, Inclusive).unwrap(), 10.0);
}

#[test]
fn test_hundred_items_quantiles() {
    let mut sketch = KllSketch::<f32>::new(DEFAULT_K);
    for i in 0..100 {
        sketch.update(i as f32).unwrap();
    }
    assert_eq!(sketch.quantile(0.0, Inclusive).unwrap(), 0.0);
    assert_eq!(sketch.quantile(0.01, Inclusive).unwrap(), 0.0);
    assert_eq!(sketch.quantile(0.5, Inclusive).unwrap(), 49.0);
    assert_eq!(sketch.quantile(0.99, Inclusive).unwrap(), 98.0);
    assert_eq!(sketch.quantile(1.0, Inclusive).unwrap(), 99.0);
}

#[test]
fn test_many_items_estimation_mode_rank_error() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    let n = 10_000;
    for i in 0..n {
        sketch.update(i as f64).unwrap();
    }
    assert!(sketch.is_estimation_mode());
    let eps = sketch.normalized_rank_error(false);

    for target in [0.1, 0.25, 0.5, 0.75, 0.9] {
        let q = sketch.quantile(target, Inclusive).unwrap();
        let rank = sketch.rank(&q, Inclusive).unwrap();
        assert_approx_eq(rank, target, eps + NUMERIC_NOISE_TOLERANCE);
    }
}

#[test]
fn test_merge_disjoint_ranges() {
    let mut a = KllSketch::<f64>::new(DEFAULT_K);
    let mut b = KllSketch::<f64>::new(DEFAULT_K);
    for i in 0..500 {
        a.update(i as f64).unwrap();
    }
    for i in 500..1000 {
        b.update(i as f64).unwrap();
    }
    a.merge(&b).unwrap();
    assert_eq!(a.n(), 1000);
    assert_eq!(a.min_item().cloned(), Some(0.0));
    assert_eq!(a.max_item().cloned(), Some(999.0));
    assert_approx_eq(a.rank(&500.0, Exclusive).unwrap(), 0.5, 0.02);
}

#[test]
fn test_merge_into_empty_is_identity() {
    let mut a = KllSketch::<f64>::new(DEFAULT_K);
    let mut b = KllSketch::<f64>::new(DEFAULT_K);
    b.update(1.0).unwrap();
    b.update(2.0).unwrap();
    a.merge(&b).unwrap();
    assert_eq!(a.n(), 2);
    assert_eq!(a.min_item().cloned(), Some(1.0));
}

#[test]
fn test_merging_empty_sketch_is_noop() {
    let mut a = KllSketch::<f64>::new(DEFAULT_K);
    a.update(1.0).unwrap();
    let b = KllSketch::<f64>::new(DEFAULT_K);
    a.merge(&b).unwrap();
    assert_eq!(a.n(), 1);
}

#[test]
fn test_compact_serialize_round_trip() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    for i in 0..2_000 {
        sketch.update(i as f64).unwrap();
    }
    let bytes = sketch.serialize();
    assert_eq!(bytes.len(), sketch.compact_serialized_size_bytes());

    let round_tripped = KllSketch::<f64>::deserialize(&bytes).unwrap();
    assert_eq!(round_tripped.n(), sketch.n());
    assert_eq!(round_tripped.min_item(), sketch.min_item());
    assert_eq!(round_tripped.max_item(), sketch.max_item());
    assert_eq!(
        round_tripped.quantile(0.5, Inclusive).unwrap(),
        sketch.quantile(0.5, Inclusive).unwrap()
    );
}

#[test]
fn test_empty_serialize_round_trip() {
    let sketch = KllSketch::<f64>::new(DEFAULT_K);
    let bytes = sketch.serialize();
    assert_eq!(bytes.len(), 8);
    let round_tripped = KllSketch::<f64>::deserialize(&bytes).unwrap();
    assert!(round_tripped.is_empty());
}

#[test]
fn test_single_item_serialize_round_trip() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update(42.0).unwrap();
    let bytes = sketch.serialize();
    let round_tripped = KllSketch::<f64>::deserialize(&bytes).unwrap();
    assert_eq!(round_tripped.n(), 1);
    assert_eq!(round_tripped.min_item().cloned(), Some(42.0));
    assert_eq!(round_tripped.max_item().cloned(), Some(42.0));
}

#[test]
fn test_deserialize_rejects_bad_family() {
    let sketch = KllSketch::<f64>::new(DEFAULT_K);
    let mut bytes = sketch.serialize();
    bytes[2] = 99;
    let err = KllSketch::<f64>::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFormat);
}

#[test]
fn test_deserialize_rejects_item_kind_mismatch() {
    let mut sketch = KllSketch::<i64>::new(DEFAULT_K);
    sketch.update(7).unwrap();
    let bytes = sketch.serialize();
    let err = KllSketch::<f64>::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn test_wrap_is_read_only() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update(1.0).unwrap();
    let bytes = sketch.serialize();
    let mut wrapped = KllSketch::<f64>::wrap(&bytes).unwrap();
    assert!(wrapped.is_read_only());
    let err = wrapped.update(2.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReadOnly);
}

#[test]
fn test_reset_clears_state_but_keeps_k() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update(1.0).unwrap();
    sketch.update(2.0).unwrap();
    sketch.reset().unwrap();
    assert!(sketch.is_empty());
    assert_eq!(sketch.k(), DEFAULT_K);
    assert_eq!(sketch.min_k(), DEFAULT_K);
}

#[test]
fn test_update_weighted_matches_repeated_update() {
    let mut weighted = KllSketch::<i64>::new(DEFAULT_K);
    weighted.update_weighted(5, 7).unwrap();

    let mut repeated = KllSketch::<i64>::new(DEFAULT_K);
    for _ in 0..7 {
        repeated.update(5).unwrap();
    }

    assert_eq!(weighted.n(), repeated.n());
    assert_eq!(weighted.min_item(), repeated.min_item());
    assert_eq!(weighted.max_item(), repeated.max_item());
}

#[test]
fn test_update_weighted_rejects_zero_weight() {
    let mut sketch = KllSketch::<i64>::new(DEFAULT_K);
    let err = sketch.update_weighted(5, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_update_slice() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
    sketch.update_slice(&values).unwrap();
    assert_eq!(sketch.n(), 100);
    assert_eq!(sketch.min_item().cloned(), Some(0.0));
    assert_eq!(sketch.max_item().cloned(), Some(99.0));
}

#[test]
fn test_quantile_bounds_straddle_rank() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    for i in 0..1000 {
        sketch.update(i as f64).unwrap();
    }
    let rank = 0.5;
    let lo = sketch.quantile_lower_bound(rank).unwrap();
    let hi = sketch.quantile_upper_bound(rank).unwrap();
    assert!(lo <= rank && rank <= hi);
}

#[test]
fn test_ranks_matches_individual_rank_calls() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    for i in 0..1000 {
        sketch.update(i as f64).unwrap();
    }
    let probes = [10.0, 250.0, 500.0, 999.0];
    let batched = sketch.ranks(&probes, Inclusive).unwrap();
    let individual: Vec<f64> = probes
        .iter()
        .map(|item| sketch.rank(item, Inclusive).unwrap())
        .collect();
    assert_eq!(batched, individual);
}

#[test]
fn test_quantiles_matches_individual_quantile_calls_and_preserves_order() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    for i in 0..1000 {
        sketch.update(i as f64).unwrap();
    }
    let probe_ranks = [0.1, 0.5, 0.9];
    let batched = sketch.quantiles(&probe_ranks, Inclusive).unwrap();
    let individual: Vec<f64> = probe_ranks
        .iter()
        .map(|&r| sketch.quantile(r, Inclusive).unwrap())
        .collect();
    assert_eq!(batched, individual);
}

#[test]
fn test_quantiles_rejects_out_of_range_rank() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update(1.0).unwrap();
    let err = sketch.quantiles(&[0.5, 1.5], Inclusive).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_get_partition_boundaries_has_expected_count_and_endpoints() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    for i in 0..1000 {
        sketch.update(i as f64).unwrap();
    }
    let boundaries = sketch.get_partition_boundaries(4, Inclusive).unwrap();
    assert_eq!(boundaries.len(), 5);
    assert_eq!(boundaries.first(), sketch.min_item());
    assert_eq!(boundaries.last(), sketch.max_item());
    for window in boundaries.windows(2) {
        assert!(window[0] <= window[1]);
    }
}

#[test]
fn test_get_partition_boundaries_rejects_zero_partitions() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update(1.0).unwrap();
    let err = sketch.get_partition_boundaries(0, Inclusive).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}
