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
use super::ops::Ops;
use crate::error::Error;

/// A frozen, weight-cumulated view over a sketch's retained items.
///
/// Built once per query batch from a sketch's levels; answers `rank`,
/// `quantile`, `cdf`, and `pmf` without re-scanning the levels for each
/// call.
#[derive(Clone)]
pub struct SortedView<T> {
    entries: Vec<Entry<T>>,
    total_weight: u64,
    cmp: Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>,
    is_nan: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for SortedView<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SortedView")
            .field("entries", &self.entries)
            .field("total_weight", &self.total_weight)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    item: T,
    cumulative_weight: u64,
}

impl<T: Clone> SortedView<T> {
    fn new(
        mut entries: Vec<Entry<T>>,
        cmp: Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>,
        is_nan: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    ) -> Self {
        entries.sort_by(|a, b| cmp(&a.item, &b.item));
        let mut total_weight = 0u64;
        for entry in &mut entries {
            total_weight += entry.cumulative_weight;
            entry.cumulative_weight = total_weight;
        }
        Self {
            entries,
            total_weight,
            cmp,
            is_nan,
        }
    }

    /// Total weight (== `n` of the sketch this view was built from).
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Number of retained entries backing this view.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if this view has no retained entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Normalized rank of `item` per `criterion`.
    pub fn rank(&self, item: &T, criterion: QuantileSearchCriterion) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }

        let idx = if criterion.is_inclusive() {
            self.upper_bound(item)
        } else {
            self.lower_bound(item)
        };

        if idx == 0 {
            return 0.0;
        }
        let weight = self.entries[idx - 1].cumulative_weight;
        weight as f64 / self.total_weight as f64
    }

    /// Item at normalized rank `rank` per `criterion`.
    ///
    /// # Panics
    ///
    /// Panics if `rank` is not in `[0.0, 1.0]`.
    pub fn quantile(&self, rank: f64, criterion: QuantileSearchCriterion) -> T {
        assert!((0.0..=1.0).contains(&rank), "rank must be in [0.0, 1.0]");
        let inclusive = criterion.is_inclusive();
        let weight = if inclusive {
            (rank * self.total_weight as f64).ceil() as u64
        } else {
            (rank * self.total_weight as f64) as u64
        };

        let idx = if inclusive {
            self.lower_bound_by_weight(weight)
        } else {
            self.upper_bound_by_weight(weight)
        };

        if idx >= self.entries.len() {
            return self.entries[self.entries.len() - 1].item.clone();
        }
        self.entries[idx].item.clone()
    }

    /// Approximate CDF over `split_points`, returning `split_points.len() + 1`
    /// cumulative mass values ending in `1.0`.
    pub fn cdf(
        &self,
        split_points: &[T],
        criterion: QuantileSearchCriterion,
    ) -> Result<Vec<f64>, Error> {
        self.check_split_points(split_points)?;
        let mut ranks = Vec::with_capacity(split_points.len() + 1);
        for item in split_points {
            ranks.push(self.rank(item, criterion));
        }
        ranks.push(1.0);
        Ok(ranks)
    }

    /// Approximate PMF over `split_points`, the per-bucket mass between
    /// consecutive split points (and before the first / after the last).
    pub fn pmf(
        &self,
        split_points: &[T],
        criterion: QuantileSearchCriterion,
    ) -> Result<Vec<f64>, Error> {
        let mut buckets = self.cdf(split_points, criterion)?;
        for i in (1..buckets.len()).rev() {
            buckets[i] -= buckets[i - 1];
        }
        Ok(buckets)
    }

    fn check_split_points(&self, split_points: &[T]) -> Result<(), Error> {
        let len = split_points.len();
        for split_point in split_points {
            if (self.is_nan)(split_point) {
                return Err(Error::invalid_argument(
                    "split_points must not contain NaN values",
                ));
            }
        }
        for i in 0..len.saturating_sub(1) {
            if (self.cmp)(&split_points[i], &split_points[i + 1]) != Ordering::Less {
                return Err(Error::invalid_argument(
                    "split_points must be unique and monotonically increasing",
                ));
            }
        }
        Ok(())
    }

    fn lower_bound(&self, item: &T) -> usize {
        let mut left = 0usize;
        let mut right = self.entries.len();
        while left < right {
            let mid = left + (right - left) / 2;
            if (self.cmp)(&self.entries[mid].item, item) == Ordering::Less {
                left = mid + 1;
            } else {
                right = mid;
            }
        }
        left
    }

    fn upper_bound(&self, item: &T) -> usize {
        let mut left = 0usize;
        let mut right = self.entries.len();
        while left < right {
            let mid = left + (right - left) / 2;
            if (self.cmp)(&self.entries[mid].item, item) == Ordering::Greater {
                right = mid;
            } else {
                left = mid + 1;
            }
        }
        left
    }

    fn lower_bound_by_weight(&self, weight: u64) -> usize {
        let mut left = 0usize;
        let mut right = self.entries.len();
        while left < right {
            let mid = left + (right - left) / 2;
            if self.entries[mid].cumulative_weight < weight {
                left = mid + 1;
            } else {
                right = mid;
            }
        }
        left
    }

    fn upper_bound_by_weight(&self, weight: u64) -> usize {
        let mut left = 0usize;
        let mut right = self.entries.len();
        while left < right {
            let mid = left + (right - left) / 2;
            if self.entries[mid].cumulative_weight > weight {
                right = mid;
            } else {
                left = mid + 1;
            }
        }
        left
    }
}

pub(crate) fn build_sorted_view<T, O>(levels: &[Vec<T>], ops: &O) -> SortedView<T>
where
    T: Clone,
    O: Ops<T> + Send + Sync + 'static,
{
    let num_retained: usize = levels.iter().map(|level| level.len()).sum();
    let mut entries = Vec::with_capacity(num_retained);

    for (level_idx, level) in levels.iter().enumerate() {
        let weight = 1u64 << level_idx;
        for item in level {
            entries.push(Entry {
                item: item.clone(),
                cumulative_weight: weight,
            });
        }
    }

    let cmp_ops = ops.clone();
    let cmp: Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync> =
        Arc::new(move |a, b| cmp_ops.cmp(a, b));
    let is_nan_ops = ops.clone();
    let is_nan: Arc<dyn Fn(&T) -> bool + Send + Sync> =
        Arc::new(move |value| is_nan_ops.is_nan(value));
    SortedView::new(entries, cmp, is_nan)
}
