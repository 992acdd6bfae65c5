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

//! Binary layout constants for the frequent-items preamble and payload.
//!
//! Layout (little-endian):
//! byte 0: preamble longs (1 empty, 4 non-empty)
//! byte 1: serial version
//! byte 2: family id
//! byte 3: lg_max_map_size
//! byte 4: lg_cur_map_size
//! byte 5: flags (bit 0 = is_empty)
//! byte 6: unused
//! byte 7: unused
//! bytes 8..12: num_items (u32)
//! bytes 12..16: reserved (u32, always 0)
//! bytes 16..24: total_weight (u64)
//! bytes 24..32: offset (u64)
//! bytes 32..: num_items weights (u64 each), then item bytes via the element codec

pub(crate) const SER_VER: u8 = 1;
pub(crate) const FAMILY_ID: u8 = 10;

pub(crate) const PREAMBLE_LONGS_EMPTY: u8 = 1;
pub(crate) const PREAMBLE_LONGS_NONEMPTY: u8 = 4;

pub(crate) const PREAMBLE_LONGS_BYTE: usize = 0;
pub(crate) const SER_VER_BYTE: usize = 1;
pub(crate) const FAMILY_BYTE: usize = 2;
pub(crate) const LG_MAX_MAP_SIZE_BYTE: usize = 3;
pub(crate) const LG_CUR_MAP_SIZE_BYTE: usize = 4;
pub(crate) const FLAGS_BYTE: usize = 5;

pub(crate) const EMPTY_FLAG_MASK: u8 = 0x01;

pub(crate) const PREAMBLE_BYTES: usize = 8;
pub(crate) const NUM_ITEMS_INT_BYTE: usize = 8;
pub(crate) const STREAM_WEIGHT_LONG_BYTE: usize = 16;
pub(crate) const OFFSET_LONG_BYTE: usize = 24;
pub(crate) const PAYLOAD_START_BYTE: usize = 32;
