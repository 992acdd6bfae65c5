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

//! Weighted heavy-hitter sketch based on the Misra-Gries / space-saving
//! algorithm, backed by a reverse-purge hash map.

use std::hash::Hash;

use crate::codec::{SketchBytes, SketchSlice};
use crate::error::Error;
use crate::frequencies::reverse_purge_item_hash_map::ReversePurgeItemHashMap;
use crate::frequencies::reverse_purge_long_hash_map::ReversePurgeLongHashMap;
use crate::frequencies::serde::ItemsSerde;
use crate::frequencies::serialization::*;

const LG_MIN_MAP_SIZE: u8 = 3;
const EPSILON_FACTOR: f64 = 3.5;
const SAMPLE_SIZE: usize = 1024;
const LOAD_FACTOR_NUMERATOR: usize = 3;
const LOAD_FACTOR_DENOMINATOR: usize = 4;

/// Selects which side of the two-sided error bound a frequent-items query honors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// No false negatives: every item whose true weight could exceed the
    /// threshold is included (upper_bound > threshold).
    NoFalseNegatives,
    /// No false positives: only items definitely above the threshold are
    /// included (lower_bound > threshold).
    NoFalsePositives,
}

/// One row of a frequent-items query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row<T> {
    item: T,
    estimate: u64,
    upper_bound: u64,
    lower_bound: u64,
}

impl<T> Row<T> {
    pub fn item(&self) -> &T {
        &self.item
    }

    pub fn estimate(&self) -> u64 {
        self.estimate
    }

    pub fn upper_bound(&self) -> u64 {
        self.upper_bound
    }

    pub fn lower_bound(&self) -> u64 {
        self.lower_bound
    }
}

fn current_map_capacity(lg_cur_map_size: u8) -> usize {
    ((1usize << lg_cur_map_size) * LOAD_FACTOR_NUMERATOR) / LOAD_FACTOR_DENOMINATOR
}

/// Frequent-items sketch specialized for `i64` keys.
#[derive(Debug, Clone)]
pub struct FrequentLongsSketch {
    lg_max_map_size: u8,
    cur_map_cap: usize,
    offset: u64,
    stream_weight: u64,
    hash_map: ReversePurgeLongHashMap,
}

impl FrequentLongsSketch {
    pub fn new(max_map_size: usize) -> Result<Self, Error> {
        Self::with_lg_map_sizes(
            max_map_size.max(1).next_power_of_two().trailing_zeros() as u8,
            LG_MIN_MAP_SIZE,
        )
    }

    pub(crate) fn with_lg_map_sizes(lg_max_map_size: u8, lg_cur_map_size: u8) -> Result<Self, Error> {
        if lg_max_map_size < LG_MIN_MAP_SIZE {
            return Err(Error::invalid_argument(format!(
                "lg_max_map_size must be >= {LG_MIN_MAP_SIZE}, got {lg_max_map_size}"
            )));
        }
        let lg_cur = lg_cur_map_size.max(LG_MIN_MAP_SIZE).min(lg_max_map_size);
        Ok(Self {
            lg_max_map_size,
            cur_map_cap: current_map_capacity(lg_cur),
            offset: 0,
            stream_weight: 0,
            hash_map: ReversePurgeLongHashMap::new(1usize << lg_cur),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.hash_map.get_num_active() == 0
    }

    pub fn get_num_active_items(&self) -> usize {
        self.hash_map.get_num_active()
    }

    pub fn get_total_weight(&self) -> u64 {
        self.stream_weight
    }

    pub fn get_estimate(&self, item: i64) -> u64 {
        self.hash_map.get(item) as u64 + self.offset
    }

    pub fn get_lower_bound(&self, item: i64) -> u64 {
        self.hash_map.get(item) as u64
    }

    pub fn get_upper_bound(&self, item: i64) -> u64 {
        self.hash_map.get(item) as u64 + self.offset
    }

    pub fn get_maximum_error(&self) -> u64 {
        self.offset
    }

    pub fn get_apriori_error(lg_max_map_size: u8, estimated_total_weight: u64) -> f64 {
        Self::get_epsilon_for_lg(lg_max_map_size) * estimated_total_weight as f64
    }

    fn get_epsilon_for_lg(lg_max_map_size: u8) -> f64 {
        EPSILON_FACTOR / (1u64 << lg_max_map_size) as f64
    }

    pub fn get_epsilon(&self) -> f64 {
        Self::get_epsilon_for_lg(self.lg_max_map_size)
    }

    pub fn get_maximum_map_capacity(&self) -> usize {
        current_map_capacity(self.lg_max_map_size)
    }

    pub fn get_current_map_capacity(&self) -> usize {
        self.cur_map_cap
    }

    pub fn get_lg_max_map_size(&self) -> u8 {
        self.lg_max_map_size
    }

    pub fn get_lg_cur_map_size(&self) -> u8 {
        self.hash_map.get_lg_length()
    }

    pub fn update(&mut self, item: i64) {
        self.update_with_count(item, 1);
    }

    pub fn update_with_count(&mut self, item: i64, count: u64) {
        if count == 0 {
            return;
        }
        self.stream_weight += count;
        self.hash_map.adjust_or_put_value(item, count as i64);
        self.maybe_resize_or_purge();
    }

    fn maybe_resize_or_purge(&mut self) {
        if self.hash_map.get_num_active() <= self.cur_map_cap {
            return;
        }
        let lg_cur = self.hash_map.get_lg_length();
        if lg_cur < self.lg_max_map_size {
            let new_lg = lg_cur + 1;
            self.hash_map.resize(1usize << new_lg);
            self.cur_map_cap = current_map_capacity(new_lg);
        } else {
            let delta = self.hash_map.purge(SAMPLE_SIZE);
            if delta > 0 {
                self.offset += delta as u64;
            }
        }
    }

    pub fn merge(&mut self, other: &FrequentLongsSketch) {
        if other.is_empty() {
            return;
        }
        let merged_total = self.stream_weight + other.stream_weight;
        for (&item, weight) in other.hash_map.iter() {
            self.update_with_count(item, weight as u64);
        }
        self.offset += other.offset;
        self.stream_weight = merged_total;
    }

    pub fn reset(&mut self) {
        let lg_max = self.lg_max_map_size;
        *self = Self::with_lg_map_sizes(lg_max, LG_MIN_MAP_SIZE).expect("lg_max_map_size already valid");
    }

    pub fn get_frequent_items(&self, error_type: ErrorType) -> Vec<Row<i64>> {
        self.get_frequent_items_with_threshold(error_type, self.get_maximum_error())
    }

    pub fn get_frequent_items_with_threshold(
        &self,
        error_type: ErrorType,
        threshold: u64,
    ) -> Vec<Row<i64>> {
        let mut rows = Vec::new();
        for (&item, weight) in self.hash_map.iter() {
            let lower_bound = weight as u64;
            let upper_bound = lower_bound + self.offset;
            let keep = match error_type {
                ErrorType::NoFalsePositives => lower_bound > threshold,
                ErrorType::NoFalseNegatives => upper_bound > threshold,
            };
            if keep {
                rows.push(Row {
                    item,
                    estimate: lower_bound + self.offset,
                    upper_bound,
                    lower_bound,
                });
            }
        }
        rows.sort_by(|a, b| b.estimate.cmp(&a.estimate));
        rows
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(64);
        if self.is_empty() {
            bytes.write_u8(PREAMBLE_LONGS_EMPTY);
            bytes.write_u8(SER_VER);
            bytes.write_u8(FAMILY_ID);
            bytes.write_u8(self.lg_max_map_size);
            bytes.write_u8(self.get_lg_cur_map_size());
            bytes.write_u8(EMPTY_FLAG_MASK);
            bytes.write_u8(0);
            bytes.write_u8(0);
            return bytes.into_bytes();
        }

        bytes.write_u8(PREAMBLE_LONGS_NONEMPTY);
        bytes.write_u8(SER_VER);
        bytes.write_u8(FAMILY_ID);
        bytes.write_u8(self.lg_max_map_size);
        bytes.write_u8(self.get_lg_cur_map_size());
        bytes.write_u8(0);
        bytes.write_u8(0);
        bytes.write_u8(0);

        bytes.write_u32_le(self.get_num_active_items() as u32);
        bytes.write_u32_le(0);
        bytes.write_u64_le(self.stream_weight);
        bytes.write_u64_le(self.offset);

        let keys = self.hash_map.get_active_keys();
        let values = self.hash_map.get_active_values();
        for v in &values {
            bytes.write_u64_le(*v as u64);
        }
        for k in &keys {
            bytes.write_i64_le(*k);
        }
        bytes.into_bytes()
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, Error> {
        if data.len() < PREAMBLE_BYTES {
            return Err(Error::truncated("FI preamble", PREAMBLE_BYTES, data.len()));
        }
        let preamble_longs = data[PREAMBLE_LONGS_BYTE];
        let ser_ver = data[SER_VER_BYTE];
        let family_id = data[FAMILY_BYTE];
        let lg_max_map_size = data[LG_MAX_MAP_SIZE_BYTE];
        let lg_cur_map_size = data[LG_CUR_MAP_SIZE_BYTE];
        let flags = data[FLAGS_BYTE];

        if ser_ver != SER_VER {
            return Err(Error::invalid_argument(format!(
                "unsupported serial version: expected {SER_VER}, got {ser_ver}"
            )));
        }
        if family_id != FAMILY_ID {
            return Err(Error::invalid_argument(format!(
                "invalid family: expected {FAMILY_ID} (FREQUENCY), got {family_id}"
            )));
        }
        if lg_cur_map_size < LG_MIN_MAP_SIZE || lg_cur_map_size > lg_max_map_size {
            return Err(Error::invalid_argument(format!(
                "lg_cur_map_size {lg_cur_map_size} out of range [{LG_MIN_MAP_SIZE}, {lg_max_map_size}]"
            )));
        }

        let is_empty = flags & EMPTY_FLAG_MASK != 0;
        if is_empty {
            if preamble_longs != PREAMBLE_LONGS_EMPTY {
                return Err(Error::invalid_argument(format!(
                    "invalid preamble longs for empty sketch: expected {PREAMBLE_LONGS_EMPTY}, got {preamble_longs}"
                )));
            }
            return Self::with_lg_map_sizes(lg_max_map_size, lg_cur_map_size);
        }
        if preamble_longs != PREAMBLE_LONGS_NONEMPTY {
            return Err(Error::invalid_argument(format!(
                "invalid preamble longs for non-empty sketch: expected {PREAMBLE_LONGS_NONEMPTY}, got {preamble_longs}"
            )));
        }
        if data.len() < PAYLOAD_START_BYTE {
            return Err(Error::truncated("FI payload header", PAYLOAD_START_BYTE, data.len()));
        }

        let mut slice = SketchSlice::new(&data[NUM_ITEMS_INT_BYTE..]);
        let num_items = slice
            .read_u32_le()
            .map_err(|e| Error::truncated("num_items", 4, 0).set_source(e))? as usize;
        let _reserved = slice
            .read_u32_le()
            .map_err(|e| Error::truncated("reserved", 4, 0).set_source(e))?;

        let mut slice = SketchSlice::new(&data[STREAM_WEIGHT_LONG_BYTE..]);
        let stream_weight = slice
            .read_u64_le()
            .map_err(|e| Error::truncated("stream_weight", 8, 0).set_source(e))?;
        let mut slice = SketchSlice::new(&data[OFFSET_LONG_BYTE..]);
        let offset = slice
            .read_u64_le()
            .map_err(|e| Error::truncated("offset", 8, 0).set_source(e))?;

        let weights_start = PAYLOAD_START_BYTE;
        let weights_bytes = num_items * 8;
        let keys_start = weights_start + weights_bytes;
        let keys_bytes = num_items * 8;
        if data.len() < keys_start + keys_bytes {
            return Err(Error::truncated(
                "FI weights/keys",
                keys_start + keys_bytes,
                data.len(),
            ));
        }

        let mut weights = Vec::with_capacity(num_items);
        let mut slice = SketchSlice::new(&data[weights_start..keys_start]);
        for _ in 0..num_items {
            weights.push(slice.read_u64_le().map_err(|e| Error::deserial(e.to_string()))?);
        }
        let mut keys = Vec::with_capacity(num_items);
        let mut slice = SketchSlice::new(&data[keys_start..keys_start + keys_bytes]);
        for _ in 0..num_items {
            keys.push(slice.read_i64_le().map_err(|e| Error::deserial(e.to_string()))?);
        }

        let mut sketch = Self::with_lg_map_sizes(lg_max_map_size, lg_cur_map_size)?;
        for (k, w) in keys.into_iter().zip(weights.into_iter()) {
            sketch.hash_map.adjust_or_put_value(k, w as i64);
        }
        sketch.offset = offset;
        sketch.stream_weight = stream_weight;
        Ok(sketch)
    }
}

impl std::fmt::Display for FrequentLongsSketch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "### Frequent longs sketch summary:")?;
        writeln!(f, "   lg cur map size  : {}", self.get_lg_cur_map_size())?;
        writeln!(f, "   lg max map size  : {}", self.get_lg_max_map_size())?;
        writeln!(f, "   num active items : {}", self.get_num_active_items())?;
        writeln!(f, "   total weight     : {}", self.get_total_weight())?;
        writeln!(f, "   max error        : {}", self.get_maximum_error())?;
        write!(f, "### End sketch summary")
    }
}

/// Frequent-items sketch for an arbitrary `Eq + Hash` item type, with item
/// serialization supplied by an [`ItemsSerde`] implementation.
#[derive(Debug, Clone)]
pub struct FrequentItemsSketch<T: Eq + Hash> {
    lg_max_map_size: u8,
    cur_map_cap: usize,
    offset: u64,
    stream_weight: u64,
    hash_map: ReversePurgeItemHashMap<T>,
}

impl<T: Eq + Hash + Clone> FrequentItemsSketch<T> {
    pub fn new(max_map_size: usize) -> Result<Self, Error> {
        Self::with_lg_map_sizes(
            max_map_size.max(1).next_power_of_two().trailing_zeros() as u8,
            LG_MIN_MAP_SIZE,
        )
    }

    pub(crate) fn with_lg_map_sizes(lg_max_map_size: u8, lg_cur_map_size: u8) -> Result<Self, Error> {
        if lg_max_map_size < LG_MIN_MAP_SIZE {
            return Err(Error::invalid_argument(format!(
                "lg_max_map_size must be >= {LG_MIN_MAP_SIZE}, got {lg_max_map_size}"
            )));
        }
        let lg_cur = lg_cur_map_size.max(LG_MIN_MAP_SIZE).min(lg_max_map_size);
        Ok(Self {
            lg_max_map_size,
            cur_map_cap: current_map_capacity(lg_cur),
            offset: 0,
            stream_weight: 0,
            hash_map: ReversePurgeItemHashMap::new(1usize << lg_cur),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.hash_map.get_num_active() == 0
    }

    pub fn get_num_active_items(&self) -> usize {
        self.hash_map.get_num_active()
    }

    pub fn get_total_weight(&self) -> u64 {
        self.stream_weight
    }

    pub fn get_estimate(&self, item: &T) -> u64 {
        self.hash_map.get(item) as u64 + self.offset
    }

    pub fn get_lower_bound(&self, item: &T) -> u64 {
        self.hash_map.get(item) as u64
    }

    pub fn get_upper_bound(&self, item: &T) -> u64 {
        self.hash_map.get(item) as u64 + self.offset
    }

    pub fn get_maximum_error(&self) -> u64 {
        self.offset
    }

    pub fn get_epsilon(&self) -> f64 {
        EPSILON_FACTOR / (1u64 << self.lg_max_map_size) as f64
    }

    pub fn get_maximum_map_capacity(&self) -> usize {
        current_map_capacity(self.lg_max_map_size)
    }

    pub fn get_current_map_capacity(&self) -> usize {
        self.cur_map_cap
    }

    pub fn get_lg_max_map_size(&self) -> u8 {
        self.lg_max_map_size
    }

    pub fn get_lg_cur_map_size(&self) -> u8 {
        self.hash_map.get_lg_length()
    }

    pub fn update(&mut self, item: T) {
        self.update_with_count(item, 1);
    }

    pub fn update_with_count(&mut self, item: T, count: u64) {
        if count == 0 {
            return;
        }
        self.stream_weight += count;
        self.hash_map.adjust_or_put_value(item, count as i64);
        self.maybe_resize_or_purge();
    }

    fn maybe_resize_or_purge(&mut self) {
        if self.hash_map.get_num_active() <= self.cur_map_cap {
            return;
        }
        let lg_cur = self.hash_map.get_lg_length();
        if lg_cur < self.lg_max_map_size {
            let new_lg = lg_cur + 1;
            self.hash_map.resize(1usize << new_lg);
            self.cur_map_cap = current_map_capacity(new_lg);
        } else {
            let delta = self.hash_map.purge(SAMPLE_SIZE);
            if delta > 0 {
                self.offset += delta as u64;
            }
        }
    }

    pub fn merge(&mut self, other: &FrequentItemsSketch<T>) {
        if other.is_empty() {
            return;
        }
        let merged_total = self.stream_weight + other.stream_weight;
        for (item, weight) in other.hash_map.iter() {
            self.update_with_count(item.clone(), weight as u64);
        }
        self.offset += other.offset;
        self.stream_weight = merged_total;
    }

    pub fn reset(&mut self) {
        let lg_max = self.lg_max_map_size;
        *self = Self::with_lg_map_sizes(lg_max, LG_MIN_MAP_SIZE).expect("lg_max_map_size already valid");
    }

    pub fn get_frequent_items(&self, error_type: ErrorType) -> Vec<Row<T>> {
        self.get_frequent_items_with_threshold(error_type, self.get_maximum_error())
    }

    pub fn get_frequent_items_with_threshold(
        &self,
        error_type: ErrorType,
        threshold: u64,
    ) -> Vec<Row<T>> {
        let mut rows = Vec::new();
        for (item, weight) in self.hash_map.iter() {
            let lower_bound = weight as u64;
            let upper_bound = lower_bound + self.offset;
            let keep = match error_type {
                ErrorType::NoFalsePositives => lower_bound > threshold,
                ErrorType::NoFalseNegatives => upper_bound > threshold,
            };
            if keep {
                rows.push(Row {
                    item: item.clone(),
                    estimate: lower_bound + self.offset,
                    upper_bound,
                    lower_bound,
                });
            }
        }
        rows.sort_by(|a, b| b.estimate.cmp(&a.estimate));
        rows
    }

    pub fn serialize_with(&self, serde: &impl ItemsSerde<T>) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(64);
        if self.is_empty() {
            bytes.write_u8(PREAMBLE_LONGS_EMPTY);
            bytes.write_u8(SER_VER);
            bytes.write_u8(FAMILY_ID);
            bytes.write_u8(self.lg_max_map_size);
            bytes.write_u8(self.get_lg_cur_map_size());
            bytes.write_u8(EMPTY_FLAG_MASK);
            bytes.write_u8(0);
            bytes.write_u8(0);
            return bytes.into_bytes();
        }

        bytes.write_u8(PREAMBLE_LONGS_NONEMPTY);
        bytes.write_u8(SER_VER);
        bytes.write_u8(FAMILY_ID);
        bytes.write_u8(self.lg_max_map_size);
        bytes.write_u8(self.get_lg_cur_map_size());
        bytes.write_u8(0);
        bytes.write_u8(0);
        bytes.write_u8(0);

        bytes.write_u32_le(self.get_num_active_items() as u32);
        bytes.write_u32_le(0);
        bytes.write_u64_le(self.stream_weight);
        bytes.write_u64_le(self.offset);

        let keys = self.hash_map.get_active_keys();
        let values = self.hash_map.get_active_values();
        for v in &values {
            bytes.write_u64_le(*v as u64);
        }
        bytes.write(&serde.serialize_items(&keys));
        bytes.into_bytes()
    }

    pub fn deserialize_with(data: &[u8], serde: &impl ItemsSerde<T>) -> Result<Self, Error> {
        if data.len() < PREAMBLE_BYTES {
            return Err(Error::truncated("FI preamble", PREAMBLE_BYTES, data.len()));
        }
        let preamble_longs = data[PREAMBLE_LONGS_BYTE];
        let ser_ver = data[SER_VER_BYTE];
        let family_id = data[FAMILY_BYTE];
        let lg_max_map_size = data[LG_MAX_MAP_SIZE_BYTE];
        let lg_cur_map_size = data[LG_CUR_MAP_SIZE_BYTE];
        let flags = data[FLAGS_BYTE];

        if ser_ver != SER_VER {
            return Err(Error::invalid_argument(format!(
                "unsupported serial version: expected {SER_VER}, got {ser_ver}"
            )));
        }
        if family_id != FAMILY_ID {
            return Err(Error::invalid_argument(format!(
                "invalid family: expected {FAMILY_ID} (FREQUENCY), got {family_id}"
            )));
        }
        if lg_cur_map_size < LG_MIN_MAP_SIZE || lg_cur_map_size > lg_max_map_size {
            return Err(Error::invalid_argument(format!(
                "lg_cur_map_size {lg_cur_map_size} out of range [{LG_MIN_MAP_SIZE}, {lg_max_map_size}]"
            )));
        }

        let is_empty = flags & EMPTY_FLAG_MASK != 0;
        if is_empty {
            if preamble_longs != PREAMBLE_LONGS_EMPTY {
                return Err(Error::invalid_argument(format!(
                    "invalid preamble longs for empty sketch: expected {PREAMBLE_LONGS_EMPTY}, got {preamble_longs}"
                )));
            }
            return Self::with_lg_map_sizes(lg_max_map_size, lg_cur_map_size);
        }
        if preamble_longs != PREAMBLE_LONGS_NONEMPTY {
            return Err(Error::invalid_argument(format!(
                "invalid preamble longs for non-empty sketch: expected {PREAMBLE_LONGS_NONEMPTY}, got {preamble_longs}"
            )));
        }
        if data.len() < PAYLOAD_START_BYTE {
            return Err(Error::truncated("FI payload header", PAYLOAD_START_BYTE, data.len()));
        }

        let mut slice = SketchSlice::new(&data[NUM_ITEMS_INT_BYTE..]);
        let num_items = slice
            .read_u32_le()
            .map_err(|e| Error::deserial(e.to_string()))? as usize;
        let _reserved = slice
            .read_u32_le()
            .map_err(|e| Error::deserial(e.to_string()))?;

        let mut slice = SketchSlice::new(&data[STREAM_WEIGHT_LONG_BYTE..]);
        let stream_weight = slice
            .read_u64_le()
            .map_err(|e| Error::deserial(e.to_string()))?;
        let mut slice = SketchSlice::new(&data[OFFSET_LONG_BYTE..]);
        let offset = slice
            .read_u64_le()
            .map_err(|e| Error::deserial(e.to_string()))?;

        let weights_start = PAYLOAD_START_BYTE;
        let weights_bytes = num_items * 8;
        let items_start = weights_start + weights_bytes;
        if data.len() < items_start {
            return Err(Error::truncated("FI weights", items_start, data.len()));
        }

        let mut weights = Vec::with_capacity(num_items);
        let mut slice = SketchSlice::new(&data[weights_start..items_start]);
        for _ in 0..num_items {
            weights.push(slice.read_u64_le().map_err(|e| Error::deserial(e.to_string()))?);
        }

        let (items, _consumed) = serde.deserialize_items(&data[items_start..], num_items)?;

        let mut sketch = Self::with_lg_map_sizes(lg_max_map_size, lg_cur_map_size)?;
        for (item, w) in items.into_iter().zip(weights.into_iter()) {
            sketch.hash_map.adjust_or_put_value(item, w as i64);
        }
        sketch.offset = offset;
        sketch.stream_weight = stream_weight;
        Ok(sketch)
    }
}

impl<T: Eq + Hash + Clone> std::fmt::Display for FrequentItemsSketch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "### Frequent items sketch summary:")?;
        writeln!(f, "   lg cur map size  : {}", self.get_lg_cur_map_size())?;
        writeln!(f, "   lg max map size  : {}", self.get_lg_max_map_size())?;
        writeln!(f, "   num active items : {}", self.get_num_active_items())?;
        writeln!(f, "   total weight     : {}", self.get_total_weight())?;
        writeln!(f, "   max error        : {}", self.get_maximum_error())?;
        write!(f, "### End sketch summary")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_heavy_hitters_in_order() {
        let mut sketch = FrequentLongsSketch::new(16).unwrap();
        for _ in 0..3 {
            sketch.update_with_count(1, 1000);
            sketch.update_with_count(2, 10);
            sketch.update_with_count(3, 1);
        }
        assert_eq!(sketch.get_total_weight(), 3033);
        assert_eq!(sketch.get_maximum_error(), 0);
        let rows = sketch.get_frequent_items(ErrorType::NoFalsePositives);
        let items: Vec<i64> = rows.iter().map(|r| *r.item()).collect();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn purges_when_small_map_overflows() {
        let mut sketch = FrequentLongsSketch::new(8).unwrap();
        for i in 0..20 {
            sketch.update(i);
        }
        sketch.update_with_count(999, 100);
        assert_eq!(sketch.get_total_weight(), 120);
        assert!(sketch.get_maximum_error() > 0);
        let rows = sketch.get_frequent_items_with_threshold(ErrorType::NoFalsePositives, 0);
        assert!(rows.iter().any(|r| *r.item() == 999));
    }

    #[test]
    fn serialize_round_trips_nonempty() {
        let mut sketch = FrequentLongsSketch::new(16).unwrap();
        sketch.update_with_count(7, 50);
        sketch.update_with_count(8, 3);
        let bytes = sketch.serialize();
        let restored = FrequentLongsSketch::deserialize(&bytes).unwrap();
        assert_eq!(restored.get_estimate(7), sketch.get_estimate(7));
        assert_eq!(restored.get_total_weight(), sketch.get_total_weight());
        assert_eq!(restored.get_num_active_items(), sketch.get_num_active_items());
    }

    #[test]
    fn serialize_round_trips_empty() {
        let sketch = FrequentLongsSketch::new(16).unwrap();
        let bytes = sketch.serialize();
        let restored = FrequentLongsSketch::deserialize(&bytes).unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn merge_is_associative_on_estimates() {
        let mut a = FrequentLongsSketch::new(16).unwrap();
        let mut b = FrequentLongsSketch::new(16).unwrap();
        let mut c = FrequentLongsSketch::new(16).unwrap();
        a.update_with_count(1, 5);
        b.update_with_count(1, 7);
        b.update_with_count(2, 2);
        c.update_with_count(1, 3);
        c.update_with_count(3, 9);

        let mut bc = b.clone();
        bc.merge(&c);
        let mut left = a.clone();
        left.merge(&bc);

        let mut ab = a.clone();
        ab.merge(&b);
        let mut right = ab;
        right.merge(&c);

        assert_eq!(left.get_estimate(1), right.get_estimate(1));
        assert_eq!(left.get_estimate(2), right.get_estimate(2));
        assert_eq!(left.get_estimate(3), right.get_estimate(3));
    }

    #[test]
    fn generic_sketch_with_string_items() {
        let serde = crate::frequencies::StringSerde;
        let mut sketch: FrequentItemsSketch<String> = FrequentItemsSketch::new(16).unwrap();
        sketch.update_with_count("hot".to_string(), 40);
        sketch.update_with_count("cold".to_string(), 1);
        let bytes = sketch.serialize_with(&serde);
        let restored = FrequentItemsSketch::deserialize_with(&bytes, &serde).unwrap();
        assert_eq!(
            restored.get_estimate(&"hot".to_string()),
            sketch.get_estimate(&"hot".to_string())
        );
    }

    #[test]
    fn display_summary_mentions_active_items_and_max_error() {
        let mut sketch = FrequentLongsSketch::new(16).unwrap();
        sketch.update_with_count(1, 1000);
        let summary = sketch.to_string();
        assert!(summary.contains("num active items : 1"));
        assert!(summary.contains("max error"));
    }
}
