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

//! A library of sublinear-memory sketches for summarising unbounded data
//! streams.
//!
//! Two independent components are provided:
//!
//! - [`frequencies`]: weighted heavy-hitter queries over a stream, via the
//!   Misra-Gries / space-saving algorithm ([`frequencies::FrequentLongsSketch`],
//!   [`frequencies::FrequentItemsSketch`]).
//! - [`hll`]: cardinality estimation via HyperLogLog ([`hll::HllSketch`],
//!   [`hll::HllUnion`]).
//!
//! Both convert to and from a stable little-endian binary layout compatible
//! across implementations of the same family; see each module's
//! `serialize`/`deserialize` pair.

mod codec;
pub mod error;
mod hash;
pub mod frequencies;
pub mod hll;
