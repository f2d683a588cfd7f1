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

//! A compact, mergeable streaming quantiles sketch.
//!
//! This crate implements the KLL algorithm (Karnin, Lang, Liberty) for
//! estimating quantiles and ranks over a stream of items with bounded
//! memory, near-optimal accuracy per retained item, and support for
//! merging summaries built independently (e.g. one per shard).
//!
//! The [`kll`] module is the entry point: [`kll::KllSketch`] for the
//! fixed-width primitives `f32`, `f64`, and `i64`, and
//! [`kll::KllItemsSketch`] for arbitrary item types given an externally
//! supplied comparator and serializer.

pub mod codec;
pub mod common;
pub mod error;
pub mod kll;
