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

//! Frequent-items (heavy-hitters) sketch based on the Misra-Gries /
//! space-saving algorithm with a reverse-purge hash map.
//!
//! Two flavors are provided: [`FrequentLongsSketch`] specialized for `i64`
//! keys, and the generic [`FrequentItemsSketch`] for any `Eq + Hash` item
//! with a pluggable [`ItemsSerde`] for serialization.

mod reverse_purge_item_hash_map;
mod reverse_purge_long_hash_map;
mod serde;
mod serialization;
mod sketch;

pub use serde::{I64Serde, ItemsSerde, StringSerde};
pub use sketch::{ErrorType, FrequentItemsSketch, FrequentLongsSketch, Row};
