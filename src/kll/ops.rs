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

use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::error::Error;

/// Item-kind tag carried in the serialized flags byte (bits 4-5).
///
/// Lets a reader distinguish which fixed-width type a compact stream holds,
/// and lets `merge` reject sketches built over incompatible item kinds
/// before any comparator is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemKind {
    Float32,
    Float64,
    Int64,
    Items,
}

impl ItemKind {
    pub(crate) fn to_bits(self) -> u8 {
        match self {
            ItemKind::Float32 => 0,
            ItemKind::Float64 => 1,
            ItemKind::Int64 => 2,
            ItemKind::Items => 3,
        }
    }

    pub(crate) fn from_bits(bits: u8) -> Result<Self, Error> {
        match bits {
            0 => Ok(ItemKind::Float32),
            1 => Ok(ItemKind::Float64),
            2 => Ok(ItemKind::Int64),
            3 => Ok(ItemKind::Items),
            _ => unreachable!("item kind is a 2-bit field"),
        }
    }
}

/// Operations the compaction/merge/query engine needs on `T`, supplied
/// either statically (fixed-width primitives, via [`StaticOps`]) or
/// dynamically (arbitrary items, via `DynOps` in
/// [`items_sketch`](super::items_sketch)).
pub(crate) trait Ops<T>: Clone {
    fn item_kind(&self) -> ItemKind;
    fn cmp(&self, a: &T, b: &T) -> Ordering;
    fn is_nan(&self, _value: &T) -> bool {
        false
    }
    fn serialized_size(&self, value: &T) -> usize;
    fn serialize(&self, value: &T, bytes: &mut SketchBytes);
    fn deserialize(&self, input: &mut SketchSlice<'_>) -> Result<T, Error>;
}

/// Item types with a built-in, zero-cost [`Ops`] implementation.
pub(crate) trait KllItem: Clone {
    const KIND: ItemKind;
    fn cmp(a: &Self, b: &Self) -> Ordering;
    fn is_nan(_value: &Self) -> bool {
        false
    }
    fn serialized_size(value: &Self) -> usize;
    fn serialize(value: &Self, bytes: &mut SketchBytes);
    fn deserialize(input: &mut SketchSlice<'_>) -> Result<Self, Error>;
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StaticOps<T> {
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> StaticOps<T> {
    pub(crate) fn new() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: KllItem> Ops<T> for StaticOps<T> {
    fn item_kind(&self) -> ItemKind {
        T::KIND
    }

    fn cmp(&self, a: &T, b: &T) -> Ordering {
        T::cmp(a, b)
    }

    fn is_nan(&self, value: &T) -> bool {
        T::is_nan(value)
    }

    fn serialized_size(&self, value: &T) -> usize {
        T::serialized_size(value)
    }

    fn serialize(&self, value: &T, bytes: &mut SketchBytes) {
        T::serialize(value, bytes)
    }

    fn deserialize(&self, input: &mut SketchSlice<'_>) -> Result<T, Error> {
        T::deserialize(input)
    }
}

impl KllItem for f32 {
    const KIND: ItemKind = ItemKind::Float32;

    fn cmp(a: &Self, b: &Self) -> Ordering {
        a.partial_cmp(b).unwrap_or(Ordering::Greater)
    }

    fn is_nan(value: &Self) -> bool {
        value.is_nan()
    }

    fn serialized_size(_value: &Self) -> usize {
        4
    }

    fn serialize(value: &Self, bytes: &mut SketchBytes) {
        bytes.write_f32_le(*value);
    }

    fn deserialize(input: &mut SketchSlice<'_>) -> Result<Self, Error> {
        input
            .read_f32_le()
            .map_err(|_| Error::insufficient_data("f32"))
    }
}

impl KllItem for f64 {
    const KIND: ItemKind = ItemKind::Float64;

    fn cmp(a: &Self, b: &Self) -> Ordering {
        a.partial_cmp(b).unwrap_or(Ordering::Greater)
    }

    fn is_nan(value: &Self) -> bool {
        value.is_nan()
    }

    fn serialized_size(_value: &Self) -> usize {
        8
    }

    fn serialize(value: &Self, bytes: &mut SketchBytes) {
        bytes.write_f64_le(*value);
    }

    fn deserialize(input: &mut SketchSlice<'_>) -> Result<Self, Error> {
        input
            .read_f64_le()
            .map_err(|_| Error::insufficient_data("f64"))
    }
}

impl KllItem for i64 {
    const KIND: ItemKind = ItemKind::Int64;

    fn cmp(a: &Self, b: &Self) -> Ordering {
        a.cmp(b)
    }

    fn serialized_size(_value: &Self) -> usize {
        8
    }

    fn serialize(value: &Self, bytes: &mut SketchBytes) {
        bytes.write_i64_le(*value);
    }

    fn deserialize(input: &mut SketchSlice<'_>) -> Result<Self, Error> {
        input
            .read_i64_le()
            .map_err(|_| Error::insufficient_data("i64"))
    }
}
