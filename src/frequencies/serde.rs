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

//! Pluggable item (de)serialization for [`crate::frequencies::FrequentItemsSketch`].

use crate::error::Error;

/// Serializes and deserializes the item payload of a frequent-items sketch.
///
/// Implementations mirror the wire format of a particular item type so that
/// sketches built on different platforms can interoperate.
pub trait ItemsSerde<T> {
    /// Encode `items` into a flat byte buffer, in order.
    fn serialize_items(&self, items: &[T]) -> Vec<u8>;

    /// Decode exactly `num_items` items from the front of `bytes`.
    ///
    /// Returns the decoded items and the number of bytes consumed.
    fn deserialize_items(&self, bytes: &[u8], num_items: usize) -> Result<(Vec<T>, usize), Error>;
}

/// Serde for UTF-8 strings: a 32-bit little-endian length prefix followed by
/// the raw UTF-8 bytes, repeated per item.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringSerde;

impl ItemsSerde<String> for StringSerde {
    fn serialize_items(&self, items: &[String]) -> Vec<u8> {
        let mut out = Vec::new();
        for item in items {
            let bytes = item.as_bytes();
            out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            out.extend_from_slice(bytes);
        }
        out
    }

    fn deserialize_items(
        &self,
        bytes: &[u8],
        num_items: usize,
    ) -> Result<(Vec<String>, usize), Error> {
        let mut items = Vec::with_capacity(num_items);
        let mut offset = 0usize;
        for _ in 0..num_items {
            if bytes.len() < offset + 4 {
                return Err(Error::truncated("string length prefix", 4, bytes.len() - offset));
            }
            let len =
                u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap()) as usize;
            offset += 4;
            if bytes.len() < offset + len {
                return Err(Error::truncated("string bytes", len, bytes.len() - offset));
            }
            let s = std::str::from_utf8(&bytes[offset..offset + len])
                .map_err(|e| Error::deserial(format!("invalid utf-8 in item: {e}")))?
                .to_owned();
            offset += len;
            items.push(s);
        }
        Ok((items, offset))
    }
}

/// Serde for `i64` items: raw 8-byte little-endian encoding, no length prefix.
#[derive(Debug, Default, Clone, Copy)]
pub struct I64Serde;

impl ItemsSerde<i64> for I64Serde {
    fn serialize_items(&self, items: &[i64]) -> Vec<u8> {
        let mut out = Vec::with_capacity(items.len() * 8);
        for item in items {
            out.extend_from_slice(&item.to_le_bytes());
        }
        out
    }

    fn deserialize_items(
        &self,
        bytes: &[u8],
        num_items: usize,
    ) -> Result<(Vec<i64>, usize), Error> {
        let needed = num_items * 8;
        if bytes.len() < needed {
            return Err(Error::truncated("i64 items", needed, bytes.len()));
        }
        let items = bytes[..needed]
            .chunks_exact(8)
            .map(|chunk| i64::from_le_bytes(chunk.try_into().unwrap()))
            .collect();
        Ok((items, needed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_serde_round_trips() {
        let serde = StringSerde;
        let items = vec!["alpha".to_string(), "".to_string(), "beta".to_string()];
        let bytes = serde.serialize_items(&items);
        let (decoded, consumed) = serde.deserialize_items(&bytes, items.len()).unwrap();
        assert_eq!(decoded, items);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn i64_serde_round_trips() {
        let serde = I64Serde;
        let items = vec![1i64, -2, i64::MAX, i64::MIN];
        let bytes = serde.serialize_items(&items);
        let (decoded, consumed) = serde.deserialize_items(&bytes, items.len()).unwrap();
        assert_eq!(decoded, items);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn truncated_buffer_errors() {
        let serde = I64Serde;
        let err = serde.deserialize_items(&[0u8; 3], 1).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Truncated);
    }
}
