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

use streamsketch::frequencies::ErrorType;
use streamsketch::frequencies::FrequentItemsSketch;
use streamsketch::frequencies::FrequentLongsSketch;
use streamsketch::frequencies::I64Serde;
use streamsketch::frequencies::StringSerde;

#[test]
fn longs_purge_keeps_heavy_hitters() {
    let mut sketch = FrequentLongsSketch::new(8).unwrap();
    sketch.update_with_count(1, 10);
    for item in 2..=7 {
        sketch.update(item);
    }

    assert_eq!(sketch.get_total_weight(), 16);
    assert_eq!(sketch.get_maximum_error(), 1);
    assert_eq!(sketch.get_estimate(1), 10);
    assert_eq!(sketch.get_lower_bound(1), 9);

    let rows = sketch.get_frequent_items(ErrorType::NoFalsePositives);
    assert_eq!(rows.len(), 1);
    assert_eq!(*rows[0].item(), 1);
    assert_eq!(rows[0].estimate(), 10);
}

#[test]
fn items_purge_keeps_heavy_hitters() {
    let mut sketch: FrequentItemsSketch<String> = FrequentItemsSketch::new(8).unwrap();
    sketch.update_with_count("a".to_string(), 10);
    for item in ["b", "c", "d", "e", "f", "g"] {
        sketch.update(item.to_string());
    }

    assert_eq!(sketch.get_total_weight(), 16);
    assert_eq!(sketch.get_maximum_error(), 1);
    assert_eq!(sketch.get_estimate(&"a".to_string()), 10);
    assert_eq!(sketch.get_lower_bound(&"a".to_string()), 9);

    let rows = sketch.get_frequent_items(ErrorType::NoFalsePositives);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].item(), &"a".to_string());
    assert_eq!(rows[0].estimate(), 10);
}

#[test]
fn longs_round_trip_preserves_estimates() {
    let mut sketch = FrequentLongsSketch::new(32).unwrap();
    for i in 1..=100 {
        sketch.update_with_count(i, i as u64);
    }
    let bytes = sketch.serialize();
    let restored = FrequentLongsSketch::deserialize(&bytes).unwrap();
    assert_eq!(restored.get_total_weight(), sketch.get_total_weight());
    assert_eq!(restored.get_estimate(42), sketch.get_estimate(42));
    assert_eq!(restored.get_maximum_error(), sketch.get_maximum_error());
}

#[test]
fn items_round_trip_preserves_estimates() {
    let mut sketch: FrequentItemsSketch<String> = FrequentItemsSketch::new(32).unwrap();
    sketch.update_with_count("alpha".to_string(), 3);
    sketch.update_with_count("beta".to_string(), 5);
    sketch.update_with_count("gamma".to_string(), 7);

    let serde = StringSerde;
    let bytes = sketch.serialize_with(&serde);
    let restored = FrequentItemsSketch::deserialize_with(&bytes, &serde).unwrap();
    assert_eq!(restored.get_total_weight(), sketch.get_total_weight());
    assert_eq!(restored.get_estimate(&"beta".to_string()), 5);
    assert_eq!(restored.get_maximum_error(), sketch.get_maximum_error());
}

#[test]
fn merge_is_commutative_on_total_weight() {
    let mut a = FrequentLongsSketch::new(16).unwrap();
    let mut b = FrequentLongsSketch::new(16).unwrap();
    for i in 0..30 {
        a.update_with_count(i, (i + 1) as u64);
    }
    for i in 15..45 {
        b.update_with_count(i, (i + 1) as u64);
    }

    let mut ab = a.clone();
    ab.merge(&b);
    let mut ba = b.clone();
    ba.merge(&a);

    assert_eq!(ab.get_total_weight(), ba.get_total_weight());
}

#[test]
fn explicit_i64_serde_round_trips_generic_sketch() {
    let mut sketch: FrequentItemsSketch<i64> = FrequentItemsSketch::new(16).unwrap();
    sketch.update_with_count(7, 50);
    let serde = I64Serde;
    let bytes = sketch.serialize_with(&serde);
    let restored = FrequentItemsSketch::deserialize_with(&bytes, &serde).unwrap();
    assert_eq!(restored.get_estimate(&7), 50);
}
