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

use super::DEFAULT_K;
use super::QuantileSearchCriterion;
use super::engine::Engine;
pub(crate) use super::ops::KllItem;
use super::ops::StaticOps;
use super::sorted_view::SortedView;
use crate::common::RandomSource;
use crate::common::XorShift64;
use crate::error::Error;

/// KLL sketch for estimating quantiles and ranks over `f32`, `f64`, or
/// `i64` streams.
///
/// See the [kll module level documentation](crate::kll) for more. For
/// arbitrary item types with an externally supplied comparator and
/// serializer, see [`KllItemsSketch`](super::KllItemsSketch).
#[allow(private_bounds)]
#[derive(Debug, Clone)]
pub struct KllSketch<T: KllItem, R: RandomSource = XorShift64> {
    engine: Engine<T, StaticOps<T>, R>,
}

impl<T: KllItem> Default for KllSketch<T> {
    fn default() -> Self {
        Self::new(DEFAULT_K)
    }
}

#[allow(private_bounds)]
impl<T: KllItem> KllSketch<T> {
    /// Creates a new sketch with the given value of k and a
    /// default-seeded random source.
    ///
    /// # Panics
    ///
    /// Panics if k is not in `[MIN_K, MAX_K]`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kll_sketch::kll::KllSketch;
    /// let sketch = KllSketch::<f64>::new(200);
    /// assert_eq!(sketch.k(), 200);
    /// ```
    pub fn new(k: u16) -> Self {
        Self::new_with_rng(k, XorShift64::default())
    }
}

#[allow(private_bounds)]
impl<T: KllItem, R: RandomSource> KllSketch<T, R> {
    /// Creates a new sketch with the given value of k and an explicit
    /// random source, for deterministic / reproducible compaction.
    pub fn new_with_rng(k: u16, rng: R) -> Self {
        Self {
            engine: Engine::new(k, StaticOps::new(), rng),
        }
    }

    /// Returns parameter k used to configure this sketch.
    pub fn k(&self) -> u16 {
        self.engine.k()
    }

    /// Returns the minimum k used when merging sketches.
    pub fn min_k(&self) -> u16 {
        self.engine.min_k()
    }

    /// Returns total weight of the stream.
    pub fn n(&self) -> u64 {
        self.engine.n()
    }

    /// Returns true if the sketch has not seen any data.
    pub fn is_empty(&self) -> bool {
        self.engine.is_empty()
    }

    /// Returns true if this sketch was obtained via [`wrap`](Self::wrap)
    /// and rejects mutating calls.
    pub fn is_read_only(&self) -> bool {
        self.engine.is_read_only()
    }

    /// Returns the number of retained items.
    pub fn num_retained(&self) -> usize {
        self.engine.num_retained()
    }

    /// Returns true if the sketch is in estimation mode.
    pub fn is_estimation_mode(&self) -> bool {
        self.engine.is_estimation_mode()
    }

    /// Returns the minimum item seen by the sketch.
    pub fn min_item(&self) -> Option<&T> {
        self.engine.min_item()
    }

    /// Returns the maximum item seen by the sketch.
    pub fn max_item(&self) -> Option<&T> {
        self.engine.max_item()
    }

    /// Updates the sketch with a new item.
    ///
    /// NaN values are ignored for floating-point types.
    pub fn update(&mut self, item: T) -> Result<(), Error> {
        self.engine.update(item)
    }

    /// Updates the sketch with every item in `items`, in order.
    pub fn update_slice(&mut self, items: &[T]) -> Result<(), Error> {
        self.engine.update_slice(items)
    }

    /// Updates the sketch with `item`, counted `weight` times, without
    /// materializing `weight` individual updates.
    pub fn update_weighted(&mut self, item: T, weight: u64) -> Result<(), Error> {
        self.engine.update_weighted(item, weight)
    }

    /// Merges another sketch into this one, using this sketch's random
    /// source for any compaction the merge triggers.
    pub fn merge(&mut self, other: &KllSketch<T, R>) -> Result<(), Error> {
        self.engine.merge(&other.engine)
    }

    /// Merges another sketch into this one, using `rng` for any
    /// compaction the merge triggers instead of this sketch's own
    /// random source.
    pub fn merge_with_rng<R2: RandomSource>(
        &mut self,
        other: &KllSketch<T, R>,
        rng: &mut R2,
    ) -> Result<(), Error> {
        self.engine.merge_with_rng(&other.engine, rng)
    }

    /// Clears the sketch back to its initial empty state, keeping k.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.engine.reset()
    }

    /// Returns the normalized rank of the given item.
    pub fn rank(&self, item: &T, criterion: QuantileSearchCriterion) -> Result<f64, Error> {
        self.engine.rank(item, criterion)
    }

    /// Returns the normalized ranks of each item in `items`.
    pub fn ranks(&self, items: &[T], criterion: QuantileSearchCriterion) -> Result<Vec<f64>, Error> {
        self.engine.ranks(items, criterion)
    }

    /// Returns the quantile for the given normalized rank.
    ///
    /// # Panics
    ///
    /// Panics if rank is not in `[0.0, 1.0]`.
    pub fn quantile(&self, rank: f64, criterion: QuantileSearchCriterion) -> Result<T, Error> {
        self.engine.quantile(rank, criterion)
    }

    /// Returns the quantiles for each normalized rank in `ranks`.
    pub fn quantiles(
        &self,
        ranks: &[f64],
        criterion: QuantileSearchCriterion,
    ) -> Result<Vec<T>, Error> {
        self.engine.quantiles(ranks, criterion)
    }

    /// Returns the approximate CDF for the given split points.
    pub fn cdf(
        &self,
        split_points: &[T],
        criterion: QuantileSearchCriterion,
    ) -> Result<Vec<f64>, Error> {
        self.engine.cdf(split_points, criterion)
    }

    /// Returns the approximate PMF for the given split points.
    pub fn pmf(
        &self,
        split_points: &[T],
        criterion: QuantileSearchCriterion,
    ) -> Result<Vec<f64>, Error> {
        self.engine.pmf(split_points, criterion)
    }

    /// Lower end of the normalized-rank error band around `rank`.
    pub fn quantile_lower_bound(&self, rank: f64) -> Result<f64, Error> {
        self.engine.quantile_lower_bound(rank)
    }

    /// Upper end of the normalized-rank error band around `rank`.
    pub fn quantile_upper_bound(&self, rank: f64) -> Result<f64, Error> {
        self.engine.quantile_upper_bound(rank)
    }

    /// Evenly spaced quantile boundaries splitting the estimated
    /// distribution into `num_partitions` buckets of approximately equal
    /// weight.
    pub fn get_partition_boundaries(
        &self,
        num_partitions: u32,
        criterion: QuantileSearchCriterion,
    ) -> Result<Vec<T>, Error> {
        self.engine.get_partition_boundaries(num_partitions, criterion)
    }

    /// Builds a frozen, reusable view for answering many rank/quantile
    /// queries without repeating the O(n log n) sort each time.
    pub fn sorted_view(&self) -> Result<SortedView<T>, Error> {
        if self.is_empty() {
            return Err(Error::sketch_empty("sorted_view"));
        }
        Ok(self.engine.sorted_view())
    }

    /// Weighted iteration over retained items in level order. Cheaper
    /// than [`sorted_view`](Self::sorted_view) when callers don't need
    /// items in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (T, u64)> + '_ {
        self.engine.iter()
    }

    /// Returns normalized rank error for the configured k.
    pub fn normalized_rank_error(&self, pmf: bool) -> f64 {
        self.engine.normalized_rank_error(pmf)
    }

    /// Serializes the sketch to the compact binary format.
    pub fn serialize(&self) -> Vec<u8> {
        self.engine.serialize()
    }

    /// Serializes the sketch preserving unused per-level capacity, so the
    /// result can be re-wrapped and keep accepting updates.
    pub fn serialize_updatable(&self) -> Vec<u8> {
        self.engine.serialize_updatable()
    }

    /// Size in bytes of [`serialize`](Self::serialize)'s output.
    pub fn compact_serialized_size_bytes(&self) -> usize {
        self.engine.compact_serialized_size_bytes()
    }

    /// Size in bytes of [`serialize_updatable`](Self::serialize_updatable)'s
    /// output.
    pub fn updatable_serialized_size_bytes(&self) -> usize {
        self.engine.updatable_serialized_size_bytes()
    }

    /// Deserializes a mutable sketch from bytes, using `rng` as its
    /// random source going forward.
    pub fn heapify_with_rng(bytes: &[u8], rng: R) -> Result<Self, Error> {
        Ok(Self {
            engine: Engine::deserialize(bytes, StaticOps::new(), rng, false)?,
        })
    }

    /// Deserializes a read-only sketch from bytes.
    ///
    /// Mutating calls on the result return [`ErrorKind::ReadOnly`](crate::error::ErrorKind::ReadOnly).
    pub fn wrap_with_rng(bytes: &[u8], rng: R) -> Result<Self, Error> {
        Ok(Self {
            engine: Engine::deserialize(bytes, StaticOps::new(), rng, true)?,
        })
    }
}

#[allow(private_bounds)]
impl<T: KllItem> KllSketch<T> {
    /// Deserializes a mutable sketch from bytes with a default-seeded
    /// random source.
    pub fn heapify(bytes: &[u8]) -> Result<Self, Error> {
        Self::heapify_with_rng(bytes, XorShift64::default())
    }

    /// Deserializes a read-only sketch from bytes with a default-seeded
    /// random source.
    pub fn wrap(bytes: &[u8]) -> Result<Self, Error> {
        Self::wrap_with_rng(bytes, XorShift64::default())
    }

    /// Deserializes a sketch from bytes (alias for [`heapify`](Self::heapify),
    /// kept for call sites that don't distinguish read-only wrapping).
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Self::heapify(bytes)
    }
}
