//! HyperLogLog Array8 mode - 8-bit (1 byte per slot) representation
//!
//! Array8 is the simplest HLL array implementation, storing one byte per slot.
//! This provides the maximum value range (0-255) with no bit-packing complexity.
//! It also doubles as the internal gadget representation the union operator
//! always merges into, regardless of the source sketches' own modes.

use crate::error::Error;
use crate::hll::estimator::{HipEstimator, inv_pow2};
use crate::hll::{get_slot, get_value};

/// Core Array8 data structure - one byte per slot, no packing
#[derive(Debug, Clone)]
pub struct Array8 {
    lg_config_k: u8,
    /// Direct byte array: bytes[slot] = value
    bytes: Box<[u8]>,
    /// Count of slots with value 0
    num_zeros: u32,
    /// HIP estimator for cardinality estimation
    estimator: HipEstimator,
}

impl Array8 {
    pub fn new(lg_config_k: u8) -> Self {
        let k = 1 << lg_config_k;

        Self {
            lg_config_k,
            bytes: vec![0u8; k as usize].into_boxed_slice(),
            num_zeros: k,
            estimator: HipEstimator::new(lg_config_k),
        }
    }

    /// Get value from a slot
    ///
    /// Direct array access - no bit manipulation required.
    #[inline]
    pub fn get(&self, slot: u32) -> u8 {
        self.bytes[slot as usize]
    }

    /// Set value in a slot
    ///
    /// Direct array write - no bit manipulation required.
    #[inline]
    fn put(&mut self, slot: u32, value: u8) {
        self.bytes[slot as usize] = value;
    }

    /// Update with a coupon
    pub fn update(&mut self, coupon: u32) {
        let mask = (1 << self.lg_config_k) - 1;
        let slot = get_slot(coupon) & mask;
        let new_value = get_value(coupon);

        let old_value = self.get(slot);

        if new_value > old_value {
            // Update HIP and KxQ registers via estimator
            self.estimator
                .update(self.lg_config_k, old_value, new_value);

            // Update the slot
            self.put(slot, new_value);

            // Track num_zeros (count of slots with value 0)
            if old_value == 0 {
                self.num_zeros -= 1;
            }
        }
    }

    /// Force a register to an exact value, bypassing the monotonic `update`
    /// check and HIP bookkeeping. Used by the union gadget, which rebuilds
    /// the estimator from scratch afterwards via `rebuild_estimator_from_registers`.
    pub fn set_register(&mut self, slot: usize, value: u8) {
        if value > self.bytes[slot] {
            if self.bytes[slot] == 0 {
                self.num_zeros -= 1;
            }
            self.bytes[slot] = value;
        }
    }

    /// Register values in slot order.
    pub fn values(&self) -> &[u8] {
        &self.bytes
    }

    /// Recompute kxq0/kxq1 (and num_zeros) from the current register
    /// contents. Always leaves the estimator out-of-order, since a rebuilt
    /// sum carries no valid HIP history.
    pub fn rebuild_estimator_from_registers(&mut self) {
        let mut kxq0 = 0.0;
        let mut kxq1 = 0.0;
        let mut num_zeros = 0u32;
        for &value in self.bytes.iter() {
            if value == 0 {
                num_zeros += 1;
            }
            if value < 32 {
                kxq0 += inv_pow2(value);
            } else {
                kxq1 += inv_pow2(value);
            }
        }
        self.num_zeros = num_zeros;
        self.estimator.set_kxq0(kxq0);
        self.estimator.set_kxq1(kxq1);
        self.estimator.set_out_of_order(true);
    }

    /// Merge another array's registers (same `lg_config_k` as this one) in
    /// via slot-wise max. Leaves the estimator out-of-order.
    pub fn merge_array_same_lgk(&mut self, other_values: &[u8]) {
        debug_assert_eq!(self.bytes.len(), other_values.len());
        for (slot, &value) in other_values.iter().enumerate() {
            if value > self.bytes[slot] {
                self.bytes[slot] = value;
            }
        }
        self.rebuild_estimator_from_registers();
    }

    /// Merge a higher-resolution source (`src_lg_k` > this array's
    /// `lg_config_k`) into this lower-resolution array, folding each source
    /// slot down to its corresponding destination slot and adjusting its
    /// value upward by the number of address bits folded in, to preserve
    /// the leading-zero-run interpretation of the register value.
    pub fn merge_array_with_downsample(&mut self, src_values: &[u8], src_lg_k: u8) {
        debug_assert!(src_lg_k > self.lg_config_k);
        let dst_lg_k = self.lg_config_k;
        let dst_mask = (1u32 << dst_lg_k) - 1;

        for (src_slot, &value) in src_values.iter().enumerate() {
            if value == 0 {
                continue;
            }
            let src_slot = src_slot as u32;
            let dst_slot = (src_slot & dst_mask) as usize;
            let p = src_slot >> dst_lg_k;
            let extra_bits = if p == 0 { 0 } else { 32 - p.leading_zeros() };
            let adjusted = ((value as u32) + extra_bits).min(62) as u8;
            if adjusted > self.bytes[dst_slot] {
                self.bytes[dst_slot] = adjusted;
            }
        }
        self.rebuild_estimator_from_registers();
    }

    /// Get the current cardinality estimate using HIP estimator
    pub fn estimate(&self) -> f64 {
        // Array8 doesn't use cur_min (always 0), so num_at_cur_min = num_zeros
        self.estimator.estimate(self.lg_config_k, 0, self.num_zeros)
    }

    /// Get the number of zero-valued slots
    pub fn num_zeros(&self) -> u32 {
        self.num_zeros
    }

    /// Get the total number of bytes used
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn num_registers(&self) -> usize {
        1usize << self.lg_config_k
    }

    pub fn hip_accum(&self) -> f64 {
        self.estimator.hip_accum()
    }

    pub fn is_out_of_order(&self) -> bool {
        self.estimator.is_out_of_order()
    }

    pub fn set_hip_accum(&mut self, value: f64) {
        self.estimator.set_hip_accum(value);
    }

    /// Deserialize Array8 from HLL mode bytes
    ///
    /// Expects full HLL preamble (40 bytes) followed by one byte per register.
    pub(crate) fn deserialize(
        bytes: &[u8],
        lg_config_k: u8,
        compact: bool,
        ooo: bool,
    ) -> Result<Self, Error> {
        let k = 1usize << lg_config_k;
        let expected_len = if compact { 40 } else { 40 + k };

        if bytes.len() < expected_len {
            return Err(Error::truncated("Array8 payload", expected_len, bytes.len()));
        }

        let hip_accum = f64::from_le_bytes([
            bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
        ]);
        let kxq0 = f64::from_le_bytes([
            bytes[16], bytes[17], bytes[18], bytes[19], bytes[20], bytes[21], bytes[22],
            bytes[23],
        ]);
        let kxq1 = f64::from_le_bytes([
            bytes[24], bytes[25], bytes[26], bytes[27], bytes[28], bytes[29], bytes[30],
            bytes[31],
        ]);
        let num_zeros_field = u32::from_le_bytes([bytes[32], bytes[33], bytes[34], bytes[35]]);

        let mut data = vec![0u8; k];
        if !compact {
            data.copy_from_slice(&bytes[40..40 + k]);
        }

        let num_zeros = if compact {
            num_zeros_field
        } else {
            data.iter().filter(|&&v| v == 0).count() as u32
        };

        let mut estimator = HipEstimator::new(lg_config_k);
        estimator.set_hip_accum(hip_accum);
        estimator.set_kxq0(kxq0);
        estimator.set_kxq1(kxq1);
        estimator.set_out_of_order(ooo);

        Ok(Self {
            lg_config_k,
            bytes: data.into_boxed_slice(),
            num_zeros,
            estimator,
        })
    }

    /// Serialize Array8 to bytes
    ///
    /// Produces full HLL preamble (40 bytes) followed by one byte per register.
    pub(crate) fn serialize(&self, lg_config_k: u8) -> Vec<u8> {
        let k = 1usize << lg_config_k;
        let total_size = 40 + k;
        let mut bytes = vec![0u8; total_size];

        use crate::hll::serialization::*;

        bytes[PREAMBLE_INTS_BYTE] = PREAMBLE_INTS_HLL;
        bytes[SER_VER_BYTE] = SER_VER;
        bytes[FAMILY_BYTE] = FAMILY_ID;
        bytes[LG_K_BYTE] = lg_config_k;
        bytes[LG_ARR_BYTE] = 0;

        let mut flags = 0u8;
        if self.estimator.is_out_of_order() {
            flags |= OUT_OF_ORDER_FLAG_MASK;
        }
        bytes[FLAGS_BYTE] = flags;
        bytes[CUR_MIN_BYTE] = 0;

        // Mode byte: low 2 bits = HLL (2), bits 2-3 = HLL8 (2)
        bytes[MODE_BYTE] = 2 | (2 << 2);

        bytes[8..16].copy_from_slice(&self.estimator.hip_accum().to_le_bytes());
        bytes[16..24].copy_from_slice(&self.estimator.kxq0().to_le_bytes());
        bytes[24..32].copy_from_slice(&self.estimator.kxq1().to_le_bytes());
        bytes[32..36].copy_from_slice(&self.num_zeros.to_le_bytes());
        bytes[36..40].copy_from_slice(&0u32.to_le_bytes());

        bytes[40..].copy_from_slice(&self.bytes);

        bytes
    }
}
