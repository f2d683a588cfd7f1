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

use super::DEFAULT_M;
use super::MAX_K;
use super::MIN_K;
use super::QuantileSearchCriterion;
use super::helper::compute_total_capacity;
use super::helper::level_capacity;
use super::helper::normalized_rank_error;
use super::helper::sum_the_sample_weights;
use super::ops::ItemKind;
use super::ops::Ops;
use super::serialization::DATA_START;
use super::serialization::DATA_START_SINGLE_ITEM;
use super::serialization::EMPTY_SIZE_BYTES;
use super::serialization::FLAG_EMPTY;
use super::serialization::FLAG_LEVEL_ZERO_SORTED;
use super::serialization::FLAG_SINGLE_ITEM;
use super::serialization::FLAG_UPDATABLE;
use super::serialization::ITEM_KIND_MASK;
use super::serialization::ITEM_KIND_SHIFT;
use super::serialization::KLL_FAMILY_ID;
use super::serialization::PREAMBLE_INTS_FULL;
use super::serialization::PREAMBLE_INTS_SHORT;
use super::serialization::SERIAL_VERSION_COMPACT_FULL;
use super::serialization::SERIAL_VERSION_COMPACT_SINGLE;
use super::serialization::SERIAL_VERSION_ITEMS;
use super::serialization::SERIAL_VERSION_UPDATABLE;
use super::sorted_view::SortedView;
use super::sorted_view::build_sorted_view;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::common::RandomSource;
use crate::error::Error;

/// Shared compaction/merge/query engine behind [`KllSketch`](super::KllSketch)
/// and [`KllItemsSketch`](super::KllItemsSketch).
///
/// `O` supplies comparison and (de)serialization for `T`, either statically
/// (fixed-width primitives) or via externally supplied trait objects
/// (arbitrary items). `R` supplies the randomized offset used when
/// compaction discards every other item from a full level.
#[derive(Debug, Clone)]
pub(crate) struct Engine<T, O, R> {
    k: u16,
    m: u8,
    min_k: u16,
    n: u64,
    is_level_zero_sorted: bool,
    read_only: bool,
    levels: Vec<Vec<T>>,
    min_item: Option<T>,
    max_item: Option<T>,
    ops: O,
    rng: R,
}

impl<T, O, R> Engine<T, O, R>
where
    T: Clone,
    O: Ops<T> + Send + Sync + 'static,
    R: RandomSource,
{
    pub(crate) fn new(k: u16, ops: O, rng: R) -> Self {
        assert!(
            (MIN_K..=MAX_K).contains(&k),
            "k must be in [{MIN_K}, {MAX_K}], got {k}"
        );
        Self {
            k,
            m: DEFAULT_M,
            min_k: k,
            n: 0,
            is_level_zero_sorted: false,
            read_only: false,
            levels: vec![Vec::new()],
            min_item: None,
            max_item: None,
            ops,
            rng,
        }
    }

    pub(crate) fn k(&self) -> u16 {
        self.k
    }

    pub(crate) fn min_k(&self) -> u16 {
        self.min_k
    }

    pub(crate) fn n(&self) -> u64 {
        self.n
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub(crate) fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub(crate) fn num_retained(&self) -> usize {
        self.levels.iter().map(|level| level.len()).sum()
    }

    pub(crate) fn is_estimation_mode(&self) -> bool {
        self.levels.len() > 1
    }

    pub(crate) fn min_item(&self) -> Option<&T> {
        self.min_item.as_ref()
    }

    pub(crate) fn max_item(&self) -> Option<&T> {
        self.max_item.as_ref()
    }

    pub(crate) fn normalized_rank_error(&self, pmf: bool) -> f64 {
        normalized_rank_error(self.min_k, pmf)
    }

    fn check_writable(&self, op: &'static str) -> Result<(), Error> {
        if self.read_only {
            Err(Error::read_only(op))
        } else {
            Ok(())
        }
    }

    pub(crate) fn update(&mut self, item: T) -> Result<(), Error> {
        self.check_writable("update")?;
        if self.ops.is_nan(&item) {
            return Ok(());
        }
        self.update_min_max(&item);
        self.internal_update(item);
        Ok(())
    }

    pub(crate) fn update_slice(&mut self, items: &[T]) -> Result<(), Error> {
        self.check_writable("update_slice")?;
        for item in items {
            if self.ops.is_nan(item) {
                continue;
            }
            self.update_min_max(item);
            self.internal_update(item.clone());
        }
        Ok(())
    }

    /// Adds `item` with the given integer weight by decomposing `weight`
    /// into its binary representation and feeding the item into one level
    /// per set bit, exactly as a merge would fold in a same-valued item
    /// from a virtual sketch of that weight.
    pub(crate) fn update_weighted(&mut self, item: T, weight: u64) -> Result<(), Error> {
        self.check_writable("update_weighted")?;
        if weight == 0 {
            return Err(Error::invalid_argument("weight must be > 0"));
        }
        if self.ops.is_nan(&item) {
            return Ok(());
        }
        self.update_min_max(&item);

        let highest_bit = 63 - weight.leading_zeros();
        let needed_levels = highest_bit as usize + 1;
        if self.levels.len() < needed_levels {
            self.levels.resize_with(needed_levels, Vec::new);
        }

        for level in 0..needed_levels {
            if (weight >> level) & 1 == 1 {
                self.levels[level].push(item.clone());
                if level == 0 {
                    self.is_level_zero_sorted = false;
                }
            }
        }
        self.n += weight;

        self.levels = general_compress(
            std::mem::take(&mut self.levels),
            self.k,
            self.m,
            self.is_level_zero_sorted,
            &self.ops,
            &mut self.rng,
        );

        debug_assert_eq!(self.total_weight(), self.n, "total weight does not match n");
        Ok(())
    }

    pub(crate) fn merge(&mut self, other: &Self) -> Result<(), Error> {
        self.merge_with_rng_inner(other, None)
    }

    pub(crate) fn merge_with_rng<R2: RandomSource>(
        &mut self,
        other: &Self,
        rng: &mut R2,
    ) -> Result<(), Error> {
        self.merge_with_rng_inner(other, Some(rng))
    }

    fn merge_with_rng_inner<R2: RandomSource>(
        &mut self,
        other: &Self,
        external_rng: Option<&mut R2>,
    ) -> Result<(), Error> {
        self.check_writable("merge")?;
        if other.is_empty() {
            return Ok(());
        }
        if self.m != other.m {
            return Err(Error::invalid_argument(format!(
                "incompatible m values: {} and {}",
                self.m, other.m
            )));
        }

        self.update_min_max_from_other(other);

        let final_n = self.n + other.n;
        for item in &other.levels[0] {
            self.internal_update(item.clone());
        }

        if other.levels.len() >= 2 {
            let provisional_levels = self.levels.len().max(other.levels.len());
            let mut self_levels = std::mem::take(&mut self.levels);
            let mut work_levels = vec![Vec::new(); provisional_levels];
            work_levels[0] = std::mem::take(&mut self_levels[0]);

            for level in 1..provisional_levels {
                let left = if level < self_levels.len() {
                    std::mem::take(&mut self_levels[level])
                } else {
                    Vec::new()
                };
                let right = other.levels.get(level).cloned().unwrap_or_default();

                work_levels[level] = if left.is_empty() {
                    right
                } else if right.is_empty() {
                    left
                } else {
                    merge_sorted_vec(left, right, &self.ops)
                };
            }

            self.levels = match external_rng {
                Some(rng) => general_compress(
                    work_levels,
                    self.k,
                    self.m,
                    self.is_level_zero_sorted,
                    &self.ops,
                    rng,
                ),
                None => general_compress(
                    work_levels,
                    self.k,
                    self.m,
                    self.is_level_zero_sorted,
                    &self.ops,
                    &mut self.rng,
                ),
            };
        }

        self.n = final_n;
        if other.is_estimation_mode() {
            self.min_k = self.min_k.min(other.min_k);
        }

        debug_assert_eq!(self.total_weight(), self.n, "total weight does not match n");
        Ok(())
    }

    pub(crate) fn reset(&mut self) -> Result<(), Error> {
        self.check_writable("reset")?;
        self.min_k = self.k;
        self.n = 0;
        self.is_level_zero_sorted = false;
        self.levels = vec![Vec::new()];
        self.min_item = None;
        self.max_item = None;
        Ok(())
    }

    pub(crate) fn sorted_view(&self) -> SortedView<T> {
        build_sorted_view(&self.levels, &self.ops)
    }

    /// Weighted iteration over retained items in level order (not sorted
    /// by item). Cheap relative to [`sorted_view`](Self::sorted_view):
    /// no sort, just a per-level weight tag.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (T, u64)> + '_ {
        self.levels.iter().enumerate().flat_map(|(level, items)| {
            let weight = 1u64 << level;
            items.iter().cloned().map(move |item| (item, weight))
        })
    }

    pub(crate) fn rank(&self, item: &T, criterion: QuantileSearchCriterion) -> Result<f64, Error> {
        if self.is_empty() {
            return Err(Error::sketch_empty("rank"));
        }
        Ok(self.sorted_view().rank(item, criterion))
    }

    pub(crate) fn ranks(
        &self,
        items: &[T],
        criterion: QuantileSearchCriterion,
    ) -> Result<Vec<f64>, Error> {
        if self.is_empty() {
            return Err(Error::sketch_empty("ranks"));
        }
        let view = self.sorted_view();
        Ok(items.iter().map(|item| view.rank(item, criterion)).collect())
    }

    pub(crate) fn quantile(&self, rank: f64, criterion: QuantileSearchCriterion) -> Result<T, Error> {
        if self.is_empty() {
            return Err(Error::sketch_empty("quantile"));
        }
        if !(0.0..=1.0).contains(&rank) {
            return Err(Error::invalid_argument("rank must be in [0.0, 1.0]"));
        }
        Ok(self.sorted_view().quantile(rank, criterion))
    }

    pub(crate) fn quantiles(
        &self,
        ranks: &[f64],
        criterion: QuantileSearchCriterion,
    ) -> Result<Vec<T>, Error> {
        if self.is_empty() {
            return Err(Error::sketch_empty("quantiles"));
        }
        for &rank in ranks {
            if !(0.0..=1.0).contains(&rank) {
                return Err(Error::invalid_argument("rank must be in [0.0, 1.0]"));
            }
        }
        let view = self.sorted_view();
        Ok(ranks.iter().map(|&rank| view.quantile(rank, criterion)).collect())
    }

    pub(crate) fn cdf(
        &self,
        split_points: &[T],
        criterion: QuantileSearchCriterion,
    ) -> Result<Vec<f64>, Error> {
        if self.is_empty() {
            return Err(Error::sketch_empty("cdf"));
        }
        self.sorted_view().cdf(split_points, criterion)
    }

    pub(crate) fn pmf(
        &self,
        split_points: &[T],
        criterion: QuantileSearchCriterion,
    ) -> Result<Vec<f64>, Error> {
        if self.is_empty() {
            return Err(Error::sketch_empty("pmf"));
        }
        self.sorted_view().pmf(split_points, criterion)
    }

    /// Lower end of the normalized-rank error band around `rank`.
    pub(crate) fn quantile_lower_bound(&self, rank: f64) -> Result<f64, Error> {
        if self.is_empty() {
            return Err(Error::sketch_empty("quantile_lower_bound"));
        }
        Ok((rank - self.normalized_rank_error(false)).max(0.0))
    }

    /// Upper end of the normalized-rank error band around `rank`.
    pub(crate) fn quantile_upper_bound(&self, rank: f64) -> Result<f64, Error> {
        if self.is_empty() {
            return Err(Error::sketch_empty("quantile_upper_bound"));
        }
        Ok((rank + self.normalized_rank_error(false)).min(1.0))
    }

    /// Evenly spaced quantile boundaries splitting the estimated
    /// distribution into `num_partitions` buckets of approximately equal
    /// weight.
    pub(crate) fn get_partition_boundaries(
        &self,
        num_partitions: u32,
        criterion: QuantileSearchCriterion,
    ) -> Result<Vec<T>, Error> {
        if num_partitions == 0 {
            return Err(Error::invalid_argument("num_partitions must be > 0"));
        }
        if self.is_empty() {
            return Err(Error::sketch_empty("get_partition_boundaries"));
        }
        let view = self.sorted_view();
        let ranks: Vec<f64> = (0..=num_partitions)
            .map(|i| i as f64 / num_partitions as f64)
            .collect();
        Ok(ranks.iter().map(|&r| view.quantile(r, criterion)).collect())
    }

    fn update_min_max(&mut self, item: &T) {
        match self.min_item.as_ref() {
            None => {
                self.min_item = Some(item.clone());
                self.max_item = Some(item.clone());
            }
            Some(min) => {
                if self.ops.cmp(item, min) == Ordering::Less {
                    self.min_item = Some(item.clone());
                }
                if let Some(max) = &self.max_item {
                    if self.ops.cmp(max, item) == Ordering::Less {
                        self.max_item = Some(item.clone());
                    }
                }
            }
        }
    }

    fn update_min_max_from_other(&mut self, other: &Self) {
        match (&self.min_item, &self.max_item) {
            (None, None) => {
                self.min_item = other.min_item.clone();
                self.max_item = other.max_item.clone();
            }
            (Some(min), Some(max)) => {
                if let Some(other_min) = &other.min_item {
                    if self.ops.cmp(other_min, min) == Ordering::Less {
                        self.min_item = Some(other_min.clone());
                    }
                }
                if let Some(other_max) = &other.max_item {
                    if self.ops.cmp(max, other_max) == Ordering::Less {
                        self.max_item = Some(other_max.clone());
                    }
                }
            }
            _ => {
                self.min_item = other.min_item.clone();
                self.max_item = other.max_item.clone();
            }
        }
    }

    fn internal_update(&mut self, item: T) {
        if self.num_retained() >= self.capacity() {
            self.compress_while_updating();
        }
        self.n += 1;
        self.is_level_zero_sorted = false;
        self.levels[0].insert(0, item);
    }

    fn capacity(&self) -> usize {
        compute_total_capacity(self.k, self.m, self.levels.len()) as usize
    }

    fn compress_while_updating(&mut self) {
        let level = find_level_to_compact(&self.levels, self.k, self.m);
        if level + 1 == self.levels.len() {
            self.levels.push(Vec::new());
        }

        let mut current = std::mem::take(&mut self.levels[level]);
        let mut above = std::mem::take(&mut self.levels[level + 1]);

        let odd = current.len() % 2 == 1;
        let mut leftover = None;
        if odd {
            leftover = Some(current.remove(0));
        }

        if level == 0 && !self.is_level_zero_sorted {
            let ops = &self.ops;
            current.sort_by(|a, b| ops.cmp(a, b));
        }

        let use_up = above.is_empty();
        let promoted = downsample(current, self.rng.next_u64() as u32, use_up);
        above = if above.is_empty() {
            promoted
        } else {
            merge_sorted_vec(promoted, above, &self.ops)
        };
        self.levels[level + 1] = above;

        let mut new_level = Vec::new();
        if let Some(item) = leftover {
            new_level.push(item);
        }
        self.levels[level] = new_level;
    }

    fn total_weight(&self) -> u64 {
        let sizes: Vec<usize> = self.levels.iter().map(|level| level.len()).collect();
        sum_the_sample_weights(&sizes)
    }

    fn level_offsets(&self) -> Vec<u32> {
        let capacity = self.capacity() as u32;
        let retained = self.num_retained() as u32;
        assert!(capacity >= retained, "capacity must be >= retained");

        let mut offsets = Vec::with_capacity(self.levels.len() + 1);
        let mut offset = capacity - retained;
        offsets.push(offset);
        for level in &self.levels {
            offset += level.len() as u32;
            offsets.push(offset);
        }
        offsets
    }

    fn compact_serialized_size(&self) -> usize {
        if self.is_empty() {
            return EMPTY_SIZE_BYTES;
        }
        if self.n == 1 {
            let item = &self.levels[0][0];
            return DATA_START_SINGLE_ITEM + self.ops.serialized_size(item);
        }

        let mut size = DATA_START + self.levels.len() * 4;
        if let Some(min_item) = &self.min_item {
            size += self.ops.serialized_size(min_item);
        }
        if let Some(max_item) = &self.max_item {
            size += self.ops.serialized_size(max_item);
        }
        for level in &self.levels {
            for item in level {
                size += self.ops.serialized_size(item);
            }
        }
        size
    }

    pub(crate) fn compact_serialized_size_bytes(&self) -> usize {
        self.compact_serialized_size()
    }

    pub(crate) fn updatable_serialized_size_bytes(&self) -> usize {
        if self.is_empty() {
            return EMPTY_SIZE_BYTES;
        }
        let slack: usize = self
            .levels
            .iter()
            .enumerate()
            .map(|(h, level)| {
                let cap = level_capacity(self.k, self.levels.len(), h, self.m) as usize;
                cap.saturating_sub(level.len())
            })
            .sum();
        self.compact_serialized_size() + slack * self.ops.serialized_size(
            self.min_item.as_ref().expect("non-empty sketch has a min item"),
        )
    }

    fn flags_base(&self, is_empty: bool, is_single_item: bool, updatable: bool) -> u8 {
        (if is_empty { FLAG_EMPTY } else { 0 })
            | (if self.is_level_zero_sorted {
                FLAG_LEVEL_ZERO_SORTED
            } else {
                0
            })
            | (if is_single_item { FLAG_SINGLE_ITEM } else { 0 })
            | (if updatable { FLAG_UPDATABLE } else { 0 })
            | (self.ops.item_kind().to_bits() << ITEM_KIND_SHIFT)
    }

    /// Serializes the sketch to the compact binary format (no slack).
    pub(crate) fn serialize(&self) -> Vec<u8> {
        let size = self.compact_serialized_size();
        let mut bytes = SketchBytes::with_capacity(size);

        let is_empty = self.is_empty();
        let is_single_item = self.n == 1;

        let preamble_ints = if is_empty || is_single_item {
            PREAMBLE_INTS_SHORT
        } else {
            PREAMBLE_INTS_FULL
        };
        let serial_version = if is_single_item {
            SERIAL_VERSION_COMPACT_SINGLE
        } else if self.ops.item_kind() == ItemKind::Items {
            SERIAL_VERSION_ITEMS
        } else {
            SERIAL_VERSION_COMPACT_FULL
        };

        let flags = self.flags_base(is_empty, is_single_item, false);

        bytes.write_u8(preamble_ints);
        bytes.write_u8(serial_version);
        bytes.write_u8(KLL_FAMILY_ID);
        bytes.write_u8(flags);
        bytes.write_u16_le(self.k);
        bytes.write_u8(self.m);
        bytes.write_u8(0);

        if is_empty {
            return bytes.into_bytes();
        }

        if !is_single_item {
            bytes.write_u64_le(self.n);
            bytes.write_u16_le(self.min_k);
            bytes.write_u8(self.levels.len() as u8);
            bytes.write_u8(0);

            let level_offsets = self.level_offsets();
            for offset in level_offsets.iter().take(self.levels.len()) {
                bytes.write_u32_le(*offset);
            }

            if let Some(min_item) = &self.min_item {
                self.ops.serialize(min_item, &mut bytes);
            }
            if let Some(max_item) = &self.max_item {
                self.ops.serialize(max_item, &mut bytes);
            }
        }

        for level in &self.levels {
            for item in level {
                self.ops.serialize(item, &mut bytes);
            }
        }

        bytes.into_bytes()
    }

    /// Serializes the sketch preserving the unused slack in each level, so
    /// the resulting bytes can back a sketch that keeps accepting updates
    /// without an initial reallocation. Filler slots are clones of the
    /// minimum item (always present in a non-empty sketch).
    pub(crate) fn serialize_updatable(&self) -> Vec<u8> {
        if self.is_empty() {
            return self.serialize();
        }

        let min_item = self.min_item.clone().expect("non-empty sketch has a min item");
        let mut padded_levels = Vec::with_capacity(self.levels.len());
        for (h, level) in self.levels.iter().enumerate() {
            let cap = level_capacity(self.k, self.levels.len(), h, self.m) as usize;
            let mut padded = Vec::with_capacity(cap);
            padded.extend(std::iter::repeat_n(min_item.clone(), cap - level.len()));
            padded.extend(level.iter().cloned());
            padded_levels.push(padded);
        }

        let size = self.updatable_serialized_size_bytes();
        let mut bytes = SketchBytes::with_capacity(size);
        let is_single_item = self.n == 1;

        bytes.write_u8(PREAMBLE_INTS_FULL);
        bytes.write_u8(SERIAL_VERSION_UPDATABLE);
        bytes.write_u8(KLL_FAMILY_ID);
        bytes.write_u8(self.flags_base(false, is_single_item, true));
        bytes.write_u16_le(self.k);
        bytes.write_u8(self.m);
        bytes.write_u8(0);
        bytes.write_u64_le(self.n);
        bytes.write_u16_le(self.min_k);
        bytes.write_u8(padded_levels.len() as u8);
        bytes.write_u8(0);

        let mut offset = 0u32;
        let mut level_offsets = Vec::with_capacity(padded_levels.len() + 1);
        level_offsets.push(offset);
        for level in &padded_levels {
            offset += level.len() as u32;
            level_offsets.push(offset);
        }
        for off in level_offsets.iter().take(padded_levels.len()) {
            bytes.write_u32_le(*off);
        }

        self.ops.serialize(&min_item, &mut bytes);
        self.ops
            .serialize(self.max_item.as_ref().expect("non-empty sketch has a max item"), &mut bytes);

        for level in &padded_levels {
            for item in level {
                self.ops.serialize(item, &mut bytes);
            }
        }

        bytes.into_bytes()
    }

    pub(crate) fn deserialize(bytes: &[u8], ops: O, rng: R, read_only: bool) -> Result<Self, Error> {
        fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
            move |_| Error::insufficient_data(tag)
        }

        let mut cursor = SketchSlice::new(bytes);

        let preamble_ints = cursor.read_u8().map_err(make_error("preamble_ints"))?;
        let serial_version = cursor.read_u8().map_err(make_error("serial_version"))?;
        let family_id = cursor.read_u8().map_err(make_error("family_id"))?;
        let flags = cursor.read_u8().map_err(make_error("flags"))?;
        let k = cursor.read_u16_le().map_err(make_error("k"))?;
        let m = cursor.read_u8().map_err(make_error("m"))?;
        let _unused = cursor.read_u8().map_err(make_error("unused"))?;

        if m != DEFAULT_M {
            return Err(Error::deserial(format!(
                "invalid m: expected {DEFAULT_M}, got {m}"
            )));
        }
        if family_id != KLL_FAMILY_ID {
            return Err(Error::invalid_family(KLL_FAMILY_ID, family_id, "KLL"));
        }
        let valid_versions = [
            SERIAL_VERSION_COMPACT_FULL,
            SERIAL_VERSION_COMPACT_SINGLE,
            SERIAL_VERSION_UPDATABLE,
            SERIAL_VERSION_ITEMS,
        ];
        if !valid_versions.contains(&serial_version) {
            return Err(Error::deserial(format!(
                "invalid serial version: {serial_version}"
            )));
        }

        let kind_bits = (flags & ITEM_KIND_MASK) >> ITEM_KIND_SHIFT;
        let kind = ItemKind::from_bits(kind_bits)?;
        if kind != ops.item_kind() {
            return Err(Error::type_mismatch(format!(
                "serialized item kind {kind:?} does not match expected {:?}",
                ops.item_kind()
            )));
        }

        let is_empty = (flags & FLAG_EMPTY) != 0;
        let is_single_item = (flags & FLAG_SINGLE_ITEM) != 0;
        let is_level_zero_sorted = (flags & FLAG_LEVEL_ZERO_SORTED) != 0;
        if is_empty && is_single_item {
            return Err(Error::deserial(
                "invalid flags: empty and single-item cannot both be set",
            ));
        }
        if is_empty || is_single_item {
            if preamble_ints != PREAMBLE_INTS_SHORT {
                return Err(Error::deserial(format!(
                    "invalid preamble ints: expected {PREAMBLE_INTS_SHORT}, got {preamble_ints}"
                )));
            }
        } else if preamble_ints != PREAMBLE_INTS_FULL {
            return Err(Error::deserial(format!(
                "invalid preamble ints: expected {PREAMBLE_INTS_FULL}, got {preamble_ints}"
            )));
        }

        if !(MIN_K..=MAX_K).contains(&k) {
            return Err(Error::deserial(format!("k out of range: {k}")));
        }

        if is_empty {
            return Ok(Self {
                k,
                m,
                min_k: k,
                n: 0,
                is_level_zero_sorted,
                read_only,
                levels: vec![Vec::new()],
                min_item: None,
                max_item: None,
                ops,
                rng,
            });
        }

        let (n, min_k, num_levels) = if is_single_item {
            (1u64, k, 1usize)
        } else {
            let n = cursor.read_u64_le().map_err(make_error("n"))?;
            let min_k = cursor.read_u16_le().map_err(make_error("min_k"))?;
            let num_levels = cursor.read_u8().map_err(make_error("num_levels"))?;
            let _unused = cursor.read_u8().map_err(make_error("unused2"))?;
            (n, min_k, num_levels as usize)
        };

        if num_levels == 0 {
            return Err(Error::deserial("num_levels must be > 0"));
        }
        if min_k < MIN_K || min_k > k {
            return Err(Error::deserial(format!(
                "min_k must be in [{MIN_K}, {k}], got {min_k}"
            )));
        }

        let capacity = compute_total_capacity(k, m, num_levels);
        let mut level_offsets = Vec::with_capacity(num_levels + 1);
        if !is_single_item {
            for _ in 0..num_levels {
                let offset = cursor.read_u32_le().map_err(make_error("levels"))?;
                level_offsets.push(offset);
            }
        } else {
            level_offsets.push(capacity - 1);
        }
        level_offsets.push(capacity);

        if level_offsets[0] > capacity {
            return Err(Error::deserial("levels[0] exceeds capacity"));
        }
        for window in level_offsets.windows(2) {
            if window[1] < window[0] {
                return Err(Error::deserial("levels array must be non-decreasing"));
            }
        }
        if *level_offsets.last().unwrap() != capacity {
            return Err(Error::deserial("levels last offset must equal capacity"));
        }

        let min_item = if is_single_item {
            None
        } else {
            Some(ops.deserialize(&mut cursor)?)
        };
        let max_item = if is_single_item {
            None
        } else {
            Some(ops.deserialize(&mut cursor)?)
        };

        let mut levels = Vec::with_capacity(num_levels);
        for level in 0..num_levels {
            let size = (level_offsets[level + 1] - level_offsets[level]) as usize;
            let mut items = Vec::with_capacity(size);
            for _ in 0..size {
                items.push(ops.deserialize(&mut cursor)?);
            }
            levels.push(items);
        }

        if serial_version == SERIAL_VERSION_UPDATABLE {
            for (h, level) in levels.iter_mut().enumerate() {
                let cap = level_capacity(k, num_levels, h, m) as usize;
                if level.len() > cap {
                    let keep = level.split_off(level.len() - cap.min(level.len()));
                    *level = keep;
                }
            }
        }

        let mut engine = Self {
            k,
            m,
            min_k,
            n,
            is_level_zero_sorted,
            read_only,
            levels,
            min_item,
            max_item,
            ops,
            rng,
        };

        if is_single_item {
            if let Some(item) = engine.levels[0].first().cloned() {
                engine.min_item = Some(item.clone());
                engine.max_item = Some(item);
            }
        }

        Ok(engine)
    }
}

fn downsample<T>(items: Vec<T>, offset: u32, use_up: bool) -> Vec<T> {
    let len = items.len();
    debug_assert!(len % 2 == 0, "length must be even");
    let offset = (offset & 1) as usize;
    let parity = if use_up {
        (len.max(1) - 1 - offset) % 2
    } else {
        offset
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| if idx % 2 == parity { Some(item) } else { None })
        .collect()
}

fn merge_sorted_vec<T, O: Ops<T>>(left: Vec<T>, right: Vec<T>, ops: &O) -> Vec<T> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left_iter = left.into_iter().peekable();
    let mut right_iter = right.into_iter().peekable();

    while let (Some(l), Some(r)) = (left_iter.peek(), right_iter.peek()) {
        if ops.cmp(l, r) == Ordering::Less {
            merged.push(left_iter.next().unwrap());
        } else {
            merged.push(right_iter.next().unwrap());
        }
    }
    merged.extend(left_iter);
    merged.extend(right_iter);
    merged
}

fn find_level_to_compact<T>(levels: &[Vec<T>], k: u16, m: u8) -> usize {
    let num_levels = levels.len();
    for level in 0..num_levels {
        let pop = levels[level].len() as u32;
        let cap = level_capacity(k, num_levels, level, m);
        if pop >= cap {
            return level;
        }
    }
    panic!("no level to compact");
}

fn general_compress<T, O: Ops<T>>(
    mut levels_in: Vec<Vec<T>>,
    k: u16,
    m: u8,
    is_level_zero_sorted: bool,
    ops: &O,
    rng: &mut impl RandomSource,
) -> Vec<Vec<T>> {
    let mut current_num_levels = levels_in.len();
    let mut current_item_count: usize = levels_in.iter().map(|level| level.len()).sum();
    let mut target_item_count = compute_total_capacity(k, m, current_num_levels) as usize;
    let mut levels_out = Vec::with_capacity(current_num_levels + 1);

    let mut current_level = 0usize;
    while current_level < current_num_levels {
        if current_level + 1 >= levels_in.len() {
            levels_in.push(Vec::new());
        }

        let raw_pop = levels_in[current_level].len();
        let cap = level_capacity(k, current_num_levels, current_level, m) as usize;

        if current_item_count < target_item_count || raw_pop < cap {
            levels_out.push(std::mem::take(&mut levels_in[current_level]));
        } else {
            let mut current = std::mem::take(&mut levels_in[current_level]);
            let mut above = std::mem::take(&mut levels_in[current_level + 1]);

            let odd = current.len() % 2 == 1;
            let mut leftover = None;
            if odd {
                leftover = Some(current.remove(0));
            }

            if current_level == 0 && !is_level_zero_sorted {
                current.sort_by(|a, b| ops.cmp(a, b));
            }

            let use_up = above.is_empty();
            let promoted = downsample(current, rng.next_u64() as u32, use_up);
            let promoted_len = promoted.len();
            above = if above.is_empty() {
                promoted
            } else {
                merge_sorted_vec(promoted, above, ops)
            };
            levels_in[current_level + 1] = above;

            let mut out_level = Vec::new();
            if let Some(item) = leftover {
                out_level.push(item);
            }
            levels_out.push(out_level);

            current_item_count = current_item_count.saturating_sub(promoted_len);

            if current_level == current_num_levels - 1 {
                current_num_levels += 1;
                target_item_count += level_capacity(k, current_num_levels, 0, m) as usize;
                if levels_in.len() < current_num_levels + 1 {
                    levels_in.resize_with(current_num_levels + 1, Vec::new);
                }
            }
        }
        current_level += 1;
    }

    levels_out.truncate(current_num_levels);
    levels_out
}
