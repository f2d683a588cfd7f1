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

//! KLL sketch implementation for estimating quantiles and ranks.
//!
//! KLL is a compact, streaming quantiles sketch with lazy compaction and
//! near-optimal accuracy per retained item. It supports one-pass updates,
//! weighted and vector updates, merges across heterogeneous `k`,
//! approximate quantiles, ranks, PMF, and CDF queries, and a compact /
//! updatable binary serialization format.
//!
//! Two public sketch types share one compaction/merge/query engine:
//!
//! - [`KllSketch`] — monomorphized for the fixed-width primitives `f32`,
//!   `f64`, and `i64`.
//! - [`KllItemsSketch`] — for variable-width items of any type, given an
//!   externally supplied comparator and serializer.
//!
//! # Usage
//!
//! ```rust
//! # use kll_sketch::kll::KllSketch;
//! let mut sketch = KllSketch::<f64>::new(200);
//! sketch.update(1.0).unwrap();
//! sketch.update(2.0).unwrap();
//! let q = sketch.quantile(0.5, Default::default()).unwrap();
//! assert!(q >= 1.0 && q <= 2.0);
//! ```

mod criterion;
mod engine;
mod helper;
mod items_sketch;
mod ops;
mod serialization;
mod sketch;
mod sorted_view;

pub use self::criterion::QuantileSearchCriterion;
pub use self::items_sketch::ItemComparator;
pub use self::items_sketch::ItemSerde;
pub use self::items_sketch::KllItemsSketch;
pub use self::items_sketch::StringItemSerde;
pub use self::sketch::KllSketch;
pub use self::sorted_view::SortedView;

/// Default value of parameter k.
pub const DEFAULT_K: u16 = 200;
/// Default value of parameter m.
pub const DEFAULT_M: u8 = 8;
/// Minimum value of parameter k.
pub const MIN_K: u16 = DEFAULT_M as u16;
/// Maximum value of parameter k.
pub const MAX_K: u16 = u16::MAX;

pub use self::helper::k_from_epsilon;
pub use self::helper::normalized_rank_error;
