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

use kll_sketch::common::RandomSource;
use kll_sketch::common::XorShift64;
use kll_sketch::kll::DEFAULT_K;
use kll_sketch::kll::KllSketch;
use kll_sketch::kll::QuantileSearchCriterion::Inclusive;

#[test]
fn test_merge_conserves_total_weight() {
    let mut shards: Vec<KllSketch<f64>> = (0..8).map(|_| KllSketch::new(DEFAULT_K)).collect();
    let mut total = 0u64;
    for (shard_idx, shard) in shards.iter_mut().enumerate() {
        for i in 0..250 {
            shard.update((shard_idx * 1000 + i) as f64).unwrap();
            total += 1;
        }
    }

    let mut merged = KllSketch::<f64>::new(DEFAULT_K);
    for shard in &shards {
        merged.merge(shard).unwrap();
    }

    assert_eq!(merged.n(), total);
}

#[test]
fn test_merge_is_order_independent_on_rank_estimate() {
    let mut forward = KllSketch::<f64>::new_with_rng(DEFAULT_K, XorShift64::seeded(42));
    let mut backward = KllSketch::<f64>::new_with_rng(DEFAULT_K, XorShift64::seeded(42));

    let shards: Vec<KllSketch<f64>> = (0..6)
        .map(|shard_idx| {
            let mut s = KllSketch::new_with_rng(DEFAULT_K, XorShift64::seeded(shard_idx as u64 + 1));
            for i in 0..300 {
                s.update((shard_idx * 10_000 + i) as f64).unwrap();
            }
            s
        })
        .collect();

    for shard in &shards {
        forward.merge(shard).unwrap();
    }
    for shard in shards.iter().rev() {
        backward.merge(shard).unwrap();
    }

    assert_eq!(forward.n(), backward.n());
    let eps = forward.normalized_rank_error(false).max(backward.normalized_rank_error(false));
    let forward_median = forward.quantile(0.5, Inclusive).unwrap();
    let backward_rank = backward.rank(&forward_median, Inclusive).unwrap();
    assert!((backward_rank - 0.5).abs() <= eps + 0.05);
}

#[test]
fn test_merge_with_rng_uses_supplied_source_deterministically() {
    let shard_a = make_shard(0);
    let shard_b = make_shard(1);

    let mut first = KllSketch::<f64>::new(DEFAULT_K);
    let mut rng1 = XorShift64::seeded(7);
    first.merge_with_rng(&shard_a, &mut rng1).unwrap();
    first.merge_with_rng(&shard_b, &mut rng1).unwrap();

    let mut second = KllSketch::<f64>::new(DEFAULT_K);
    let mut rng2 = XorShift64::seeded(7);
    second.merge_with_rng(&shard_a, &mut rng2).unwrap();
    second.merge_with_rng(&shard_b, &mut rng2).unwrap();

    assert_eq!(first.n(), second.n());
    assert_eq!(first.serialize(), second.serialize());
}

fn make_shard(seed: u64) -> KllSketch<f64> {
    let mut s = KllSketch::<f64>::new_with_rng(DEFAULT_K, XorShift64::seeded(seed + 1));
    for i in 0..2_000 {
        s.update((seed * 100_000 + i) as f64).unwrap();
    }
    s
}
