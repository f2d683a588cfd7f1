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

//! Binary serialization format constants for KLL sketches.
//!
//! Naming and layout follow the Apache DataSketches Java implementation
//! (`KllPreambleUtil`) and the C++ `kll_sketch` serialization format, with
//! two additions this crate needs that the original format does not carry:
//! an `UPDATABLE` serial version that preserves pre-compaction slack so a
//! wrapped buffer can keep accepting updates, and a 2-bit item-kind tag so
//! a compact stream self-describes which fixed-width type (or externally
//! typed item) it holds.

/// Family ID for KLL sketches in DataSketches format (KllPreambleUtil.KLL_FAMILY).
pub(crate) const KLL_FAMILY_ID: u8 = 15;

/// Serialization version for compact empty or full sketches.
pub(crate) const SERIAL_VERSION_COMPACT_FULL: u8 = 1;
/// Serialization version for compact single-item sketches.
pub(crate) const SERIAL_VERSION_COMPACT_SINGLE: u8 = 2;
/// Serialization version for updatable sketches (fixed-width items).
pub(crate) const SERIAL_VERSION_UPDATABLE: u8 = 3;
/// Serialization version for compact items-sketch streams (externally typed items).
pub(crate) const SERIAL_VERSION_ITEMS: u8 = 4;

/// Preamble ints for empty and single-item sketches.
pub(crate) const PREAMBLE_INTS_SHORT: u8 = 2;
/// Preamble ints for sketches with more than one item.
pub(crate) const PREAMBLE_INTS_FULL: u8 = 5;

/// Flag indicating the sketch is empty.
pub(crate) const FLAG_EMPTY: u8 = 1 << 0;
/// Flag indicating level zero is sorted.
pub(crate) const FLAG_LEVEL_ZERO_SORTED: u8 = 1 << 1;
/// Flag indicating the sketch has a single item.
pub(crate) const FLAG_SINGLE_ITEM: u8 = 1 << 2;
/// Flag indicating the stream preserves updatable (pre-compaction) layout.
pub(crate) const FLAG_UPDATABLE: u8 = 1 << 3;

/// Bit position of the 2-bit item-kind tag within the flags byte.
pub(crate) const ITEM_KIND_SHIFT: u8 = 4;
/// Mask isolating the 2-bit item-kind tag within the flags byte.
pub(crate) const ITEM_KIND_MASK: u8 = 0b11 << ITEM_KIND_SHIFT;

/// Serialized size for an empty sketch in bytes.
pub(crate) const EMPTY_SIZE_BYTES: usize = 8;
/// Data offset for single-item sketches.
pub(crate) const DATA_START_SINGLE_ITEM: usize = 8;
/// Data offset for sketches with more than one item.
pub(crate) const DATA_START: usize = 20;
