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

//! Hashing primitives shared by the frequent-items and HLL sketches.
//!
//! Both components hash arbitrary `Hash` items down to bit patterns they can
//! distribute over a table: the frequent-items map needs a single 64-bit
//! slot index, the HLL sketch needs a 128-bit value it splits into a slot
//! address and a leading-zero count. Both go through `mur3::Hasher128`,
//! seeded so that repeated runs of the same process are reproducible.

use std::hash::{Hash, Hasher};

/// Seed used by the frequent-items reverse-purge maps.
pub(crate) const ITEM_MAP_SEED: u32 = 0;

/// Hash a single item down to a 64-bit value using MurmurHash3_x64_128,
/// keeping only the low 64 bits (`Hasher::finish`).
#[inline]
pub(crate) fn hash_item<T: Hash>(item: &T, seed: u32) -> u64 {
    let mut hasher = mur3::Hasher128::with_seed(seed);
    item.hash(&mut hasher);
    hasher.finish()
}
