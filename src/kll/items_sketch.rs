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

use std::cmp::Ordering;
use std::sync::Arc;

use super::QuantileSearchCriterion;
use super::engine::Engine;
use super::ops::ItemKind;
use super::ops::Ops;
use super::sorted_view::SortedView;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::common::RandomSource;
use crate::common::XorShift64;
use crate::error::Error;

/// Total order over items of type `T`, supplied by the caller of
/// [`KllItemsSketch`] rather than derived from `Ord`, so sketches can be
/// built over types with no natural ordering of their own (or an ordering
/// different from their `Ord` impl).
pub trait ItemComparator<T>: Send + Sync {
    /// Compares `a` and `b`.
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

impl<T, F> ItemComparator<T> for F
where
    F: Fn(&T, &T) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self(a, b)
    }
}

/// Serializer for items of type `T`, supplied by the caller of
/// [`KllItemsSketch`].
pub trait ItemSerde<T>: Send + Sync {
    /// Serialized size in bytes of `value`.
    fn serialized_size(&self, value: &T) -> usize;
    /// Serializes `value` into `bytes`.
    fn serialize(&self, value: &T, bytes: &mut SketchBytes);
    /// Deserializes a single value from `input`.
    fn deserialize(&self, input: &mut SketchSlice<'_>) -> Result<T, Error>;
}

#[derive(Clone)]
pub(crate) struct DynOps<T> {
    comparator: Arc<dyn ItemComparator<T>>,
    serde: Arc<dyn ItemSerde<T>>,
}

impl<T> Ops<T> for DynOps<T> {
    fn item_kind(&self) -> ItemKind {
        ItemKind::Items
    }

    fn cmp(&self, a: &T, b: &T) -> Ordering {
        self.comparator.compare(a, b)
    }

    fn serialized_size(&self, value: &T) -> usize {
        self.serde.serialized_size(value)
    }

    fn serialize(&self, value: &T, bytes: &mut SketchBytes) {
        self.serde.serialize(value, bytes)
    }

    fn deserialize(&self, input: &mut SketchSlice<'_>) -> Result<T, Error> {
        self.serde.deserialize(input)
    }
}

/// KLL sketch for estimating quantiles and ranks over items of any type,
/// given an externally supplied comparator and serializer.
///
/// See the [kll module level documentation](crate::kll) for more. For the
/// fixed-width primitives `f32`, `f64`, and `i64`, prefer
/// [`KllSketch`](super::KllSketch), which has no per-item dynamic dispatch.
///
/// # Examples
///
/// ```
/// # use kll_sketch::kll::KllItemsSketch;
/// let mut sketch = KllItemsSketch::<String>::new(
///     200,
///     |a: &String, b: &String| a.cmp(b),
///     kll_sketch::kll::StringItemSerde,
/// );
/// sketch.update("banana".to_string()).unwrap();
/// sketch.update("apple".to_string()).unwrap();
/// let least = sketch.quantile(0.0, Default::default()).unwrap();
/// assert_eq!(least, "apple");
/// ```
#[derive(Clone)]
pub struct KllItemsSketch<T: Clone, R: RandomSource = XorShift64> {
    engine: Engine<T, DynOps<T>, R>,
}

impl<T: Clone + Send + Sync + 'static> KllItemsSketch<T> {
    /// Creates a new sketch with the given `k`, comparator, serializer,
    /// and a default-seeded random source.
    pub fn new(
        k: u16,
        comparator: impl ItemComparator<T> + 'static,
        serde: impl ItemSerde<T> + 'static,
    ) -> Self {
        Self::new_with_rng(k, comparator, serde, XorShift64::default())
    }
}

impl<T: Clone + 'static, R: RandomSource> KllItemsSketch<T, R> {
    /// Creates a new sketch with the given `k`, comparator, serializer,
    /// and explicit random source, for deterministic / reproducible
    /// compaction.
    pub fn new_with_rng(
        k: u16,
        comparator: impl ItemComparator<T> + 'static,
        serde: impl ItemSerde<T> + 'static,
        rng: R,
    ) -> Self
    where
        T: Send + Sync,
    {
        let ops = DynOps {
            comparator: Arc::new(comparator),
            serde: Arc::new(serde),
        };
        Self {
            engine: Engine::new(k, ops, rng),
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

    /// Returns the minimum item seen by the sketch, per the supplied
    /// comparator.
    pub fn min_item(&self) -> Option<&T> {
        self.engine.min_item()
    }

    /// Returns the maximum item seen by the sketch, per the supplied
    /// comparator.
    pub fn max_item(&self) -> Option<&T> {
        self.engine.max_item()
    }

    /// Updates the sketch with a new item.
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

    /// Merges another sketch into this one. Both sketches must have been
    /// built with comparators and serializers that agree on `T`'s order
    /// and encoding; this is the caller's responsibility to ensure, as
    /// `T` alone does not carry that information.
    pub fn merge(&mut self, other: &KllItemsSketch<T, R>) -> Result<(), Error> {
        self.engine.merge(&other.engine)
    }

    /// Merges another sketch into this one, using `rng` for any
    /// compaction the merge triggers instead of this sketch's own random
    /// source.
    pub fn merge_with_rng<R2: RandomSource>(
        &mut self,
        other: &KllItemsSketch<T, R>,
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

    /// Deserializes a mutable sketch from bytes, using the given
    /// comparator, serializer, and random source.
    pub fn heapify_with_rng(
        bytes: &[u8],
        comparator: impl ItemComparator<T> + 'static,
        serde: impl ItemSerde<T> + 'static,
        rng: R,
    ) -> Result<Self, Error> {
        let ops = DynOps {
            comparator: Arc::new(comparator),
            serde: Arc::new(serde),
        };
        Ok(Self {
            engine: Engine::deserialize(bytes, ops, rng, false)?,
        })
    }

    /// Deserializes a read-only sketch from bytes, using the given
    /// comparator, serializer, and random source.
    ///
    /// Mutating calls on the result return [`ErrorKind::ReadOnly`](crate::error::ErrorKind::ReadOnly).
    pub fn wrap_with_rng(
        bytes: &[u8],
        comparator: impl ItemComparator<T> + 'static,
        serde: impl ItemSerde<T> + 'static,
        rng: R,
    ) -> Result<Self, Error> {
        let ops = DynOps {
            comparator: Arc::new(comparator),
            serde: Arc::new(serde),
        };
        Ok(Self {
            engine: Engine::deserialize(bytes, ops, rng, true)?,
        })
    }
}

impl<T: Clone + Send + Sync + 'static> KllItemsSketch<T> {
    /// Deserializes a mutable sketch from bytes with a default-seeded
    /// random source.
    pub fn heapify(
        bytes: &[u8],
        comparator: impl ItemComparator<T> + 'static,
        serde: impl ItemSerde<T> + 'static,
    ) -> Result<Self, Error> {
        Self::heapify_with_rng(bytes, comparator, serde, XorShift64::default())
    }

    /// Deserializes a read-only sketch from bytes with a default-seeded
    /// random source.
    pub fn wrap(
        bytes: &[u8],
        comparator: impl ItemComparator<T> + 'static,
        serde: impl ItemSerde<T> + 'static,
    ) -> Result<Self, Error> {
        Self::wrap_with_rng(bytes, comparator, serde, XorShift64::default())
    }
}

/// [`ItemSerde`] for `String`, using a length-prefixed UTF-8 encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringItemSerde;

impl ItemSerde<String> for StringItemSerde {
    fn serialized_size(&self, value: &String) -> usize {
        4 + value.len()
    }

    fn serialize(&self, value: &String, bytes: &mut SketchBytes) {
        bytes.write_u32_le(value.len() as u32);
        bytes.write(value.as_bytes());
    }

    fn deserialize(&self, input: &mut SketchSlice<'_>) -> Result<String, Error> {
        let len = input
            .read_u32_le()
            .map_err(|_| Error::insufficient_data("string_len"))? as usize;
        let mut buf = vec![0u8; len];
        input
            .read_exact(&mut buf)
            .map_err(|_| Error::insufficient_data("string_bytes"))?;
        String::from_utf8(buf).map_err(|_| Error::deserial("invalid utf-8 string"))
    }
}
