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
use kll_sketch::kll::KllItemsSketch;
use kll_sketch::kll::QuantileSearchCriterion::Inclusive;
use kll_sketch::kll::StringItemSerde;

fn string_cmp(a: &String, b: &String) -> std::cmp::Ordering {
    a.cmp(b)
}

#[test]
fn test_string_items_basic_quantiles() {
    let mut sketch = KllItemsSketch::<String>::new(DEFAULT_K, string_cmp, StringItemSerde);
    for word in ["pear", "apple", "banana", "cherry", "date"] {
        sketch.update(word.to_string()).unwrap();
    }
    assert_eq!(sketch.n(), 5);
    assert_eq!(sketch.min_item().cloned(), Some("apple".to_string()));
    assert_eq!(sketch.max_item().cloned(), Some("pear".to_string()));
    assert_eq!(
        sketch.quantile(0.0, Inclusive).unwrap(),
        "apple".to_string()
    );
}

#[test]
fn test_string_items_rank_matches_lexical_order() {
    let mut sketch = KllItemsSketch::<String>::new(DEFAULT_K, string_cmp, StringItemSerde);
    let words: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
    sketch.update_slice(&words).unwrap();

    for (i, word) in words.iter().enumerate() {
        let rank = sketch.rank(word, Inclusive).unwrap();
        let expected = (i + 1) as f64 / words.len() as f64;
        assert_eq!(rank, expected);
    }
}

#[test]
fn test_string_items_serialize_round_trip() {
    let mut sketch = KllItemsSketch::<String>::new(DEFAULT_K, string_cmp, StringItemSerde);
    for i in 0..500 {
        sketch.update(format!("item-{i:04}")).unwrap();
    }
    let bytes = sketch.serialize();
    let round_tripped =
        KllItemsSketch::<String>::heapify(&bytes, string_cmp, StringItemSerde).unwrap();
    assert_eq!(round_tripped.n(), sketch.n());
    assert_eq!(round_tripped.min_item(), sketch.min_item());
    assert_eq!(round_tripped.max_item(), sketch.max_item());
}

#[test]
fn test_string_items_merge() {
    let mut a = KllItemsSketch::<String>::new(DEFAULT_K, string_cmp, StringItemSerde);
    let mut b = KllItemsSketch::<String>::new(DEFAULT_K, string_cmp, StringItemSerde);
    for i in 0..200 {
        a.update(format!("a-{i:04}")).unwrap();
    }
    for i in 0..200 {
        b.update(format!("b-{i:04}")).unwrap();
    }
    a.merge(&b).unwrap();
    assert_eq!(a.n(), 400);
}

#[test]
fn test_wrap_is_read_only() {
    let mut sketch = KllItemsSketch::<String>::new(DEFAULT_K, string_cmp, StringItemSerde);
    sketch.update("x".to_string()).unwrap();
    let bytes = sketch.serialize();
    let mut wrapped = KllItemsSketch::<String>::wrap(&bytes, string_cmp, StringItemSerde).unwrap();
    assert!(wrapped.is_read_only());
    let err = wrapped.update("y".to_string()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReadOnly);
}

#[test]
fn test_deserialize_rejects_item_kind_mismatch_with_fixed_width() {
    let mut sketch = kll_sketch::kll::KllSketch::<f64>::new(DEFAULT_K);
    sketch.update(1.0).unwrap();
    sketch.update(2.0).unwrap();
    let bytes = sketch.serialize();
    let err =
        KllItemsSketch::<String>::heapify(&bytes, string_cmp, StringItemSerde).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}
