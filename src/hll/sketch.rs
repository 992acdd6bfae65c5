//! The `HllSketch` facade: owns the LIST -> SET -> HLL mode state machine
//! and the HLL serialization format.

use std::hash::Hash;

use crate::error::Error;
use crate::hll::array4::Array4;
use crate::hll::array6::Array6;
use crate::hll::array8::Array8;
use crate::hll::hash_set::HashSet;
use crate::hll::list::List;
use crate::hll::mode::Mode;
use crate::hll::serialization::*;
use crate::hll::{HllType, coupon, relative_standard_error};

const LG_INIT_LIST_SIZE: usize = 3;
const LG_INIT_SET_SIZE: usize = 5;
/// Below this lg_k, a full List promotes straight to a target array,
/// skipping the Set stage entirely.
const LG_K_SET_THRESHOLD: u8 = 7;

/// A HyperLogLog sketch for cardinality estimation.
///
/// Starts in LIST mode (a small array of distinct coupons), promotes to
/// SET mode (an open-addressed coupon hash set) once the list fills up,
/// and finally promotes to dense HLL register storage (Array4/6/8,
/// depending on the configured [`HllType`]) once the set grows past
/// three quarters of `2^lg_config_k`.
#[derive(Debug, Clone)]
pub struct HllSketch {
    lg_config_k: u8,
    mode: Mode,
}

impl HllSketch {
    /// Create an empty sketch with the given precision and target HLL type.
    ///
    /// `lg_config_k` must be in `[4, 21]`.
    pub fn new(lg_config_k: u8, hll_type: HllType) -> Self {
        assert!(
            (4..=21).contains(&lg_config_k),
            "lg_config_k must be in [4, 21], got {}",
            lg_config_k
        );
        Self {
            lg_config_k,
            mode: Mode::List {
                list: List::new(LG_INIT_LIST_SIZE),
                hll_type,
            },
        }
    }

    /// Wrap an existing mode, inferring `lg_config_k` is already known by
    /// the caller (used by the union operator and deserialization).
    pub(crate) fn from_mode(lg_config_k: u8, mode: Mode) -> Self {
        Self { lg_config_k, mode }
    }

    pub fn lg_config_k(&self) -> u8 {
        self.lg_config_k
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub(crate) fn mode_mut(&mut self) -> &mut Mode {
        &mut self.mode
    }

    /// The HLL type this sketch will serialize/convert to when promoted to
    /// dense register storage.
    pub fn target_type(&self) -> HllType {
        match &self.mode {
            Mode::List { hll_type, .. } => *hll_type,
            Mode::Set { hll_type, .. } => *hll_type,
            Mode::Array4(_) => HllType::Hll4,
            Mode::Array6(_) => HllType::Hll6,
            Mode::Array8(_) => HllType::Hll8,
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.mode {
            Mode::List { list, .. } => list.container().is_empty(),
            Mode::Set { set, .. } => set.len() == 0,
            Mode::Array4(arr) => arr.estimate() == 0.0,
            Mode::Array6(arr) => arr.estimate() == 0.0,
            Mode::Array8(arr) => arr.estimate() == 0.0,
        }
    }

    /// Discard all accumulated state, returning to an empty LIST-mode sketch
    /// at the same `lg_config_k` and target type.
    pub fn reset(&mut self) {
        let hll_type = self.target_type();
        self.mode = Mode::List {
            list: List::new(LG_INIT_LIST_SIZE),
            hll_type,
        };
    }

    /// Add one item to the sketch.
    pub fn update<H: Hash>(&mut self, value: H) {
        self.update_with_coupon(coupon(value));
    }

    /// Add a raw coupon, driving the LIST -> SET -> HLL state machine.
    pub(crate) fn update_with_coupon(&mut self, coupon: u32) {
        let lg_config_k = self.lg_config_k;

        match &mut self.mode {
            Mode::Array4(arr) => {
                arr.update(coupon);
                return;
            }
            Mode::Array6(arr) => {
                arr.update(coupon);
                return;
            }
            Mode::Array8(arr) => {
                arr.update(coupon);
                return;
            }
            Mode::List { list, .. } if list.contains(coupon) => return,
            Mode::Set { set, .. } if set.contains(coupon) => return,
            _ => {}
        }

        match &mut self.mode {
            Mode::List { list, hll_type } => {
                if list.container().len < LIST_MAX_COUPONS {
                    list.update(coupon);
                    return;
                }

                let hll_type = *hll_type;
                let existing: Vec<u32> = list.container().iter().collect();
                if lg_config_k > LG_K_SET_THRESHOLD {
                    let mut set = HashSet::new(LG_INIT_SET_SIZE);
                    for c in existing {
                        set.update(c);
                    }
                    set.update(coupon);
                    self.mode = Mode::Set { set, hll_type };
                } else {
                    let mut array = new_target_array(hll_type, lg_config_k);
                    for c in existing {
                        update_array(&mut array, c);
                    }
                    update_array(&mut array, coupon);
                    self.mode = array;
                }
            }
            Mode::Set { set, hll_type } => {
                let k = 1u32 << lg_config_k;
                let promote_threshold = (3 * k) / 4;
                if set.len() as u32 + 1 > promote_threshold {
                    let hll_type = *hll_type;
                    let existing: Vec<u32> = set.container().iter().collect();
                    let mut array = new_target_array(hll_type, lg_config_k);
                    for c in existing {
                        update_array(&mut array, c);
                    }
                    update_array(&mut array, coupon);
                    self.mode = array;
                } else {
                    let capacity = 1usize << set.lg_size();
                    if (set.len() + 1) * RESIZE_DENOM_SET as usize
                        > capacity * RESIZE_NUMER_SET as usize
                    {
                        set.grow(set.lg_size() + 1);
                    }
                    set.update(coupon);
                }
            }
            Mode::Array4(_) | Mode::Array6(_) | Mode::Array8(_) => {
                unreachable!("array modes handled in the lookup pass above")
            }
        }
    }

    pub fn estimate(&self) -> f64 {
        match &self.mode {
            Mode::List { list, .. } => list.container().estimate(),
            Mode::Set { set, .. } => set.container().estimate(),
            Mode::Array4(arr) => arr.estimate(),
            Mode::Array6(arr) => arr.estimate(),
            Mode::Array8(arr) => arr.estimate(),
        }
    }

    /// Upper confidence bound on the cardinality estimate, `n_std_dev`
    /// standard deviations out. `n_std_dev` must be in `{1, 2, 3}`.
    pub fn upper_bound(&self, n_std_dev: u8) -> f64 {
        match &self.mode {
            Mode::List { list, .. } => list.container().upper_bound(n_std_dev as f64),
            Mode::Set { set, .. } => set.container().upper_bound(n_std_dev as f64),
            Mode::Array4(arr) => {
                let rse = relative_standard_error(self.lg_config_k, arr.is_out_of_order());
                arr.estimate() / (1.0 - n_std_dev as f64 * rse)
            }
            Mode::Array6(arr) => {
                let rse = relative_standard_error(self.lg_config_k, arr.is_out_of_order());
                arr.estimate() / (1.0 - n_std_dev as f64 * rse)
            }
            Mode::Array8(arr) => {
                let rse = relative_standard_error(self.lg_config_k, arr.is_out_of_order());
                arr.estimate() / (1.0 - n_std_dev as f64 * rse)
            }
        }
    }

    /// Lower confidence bound on the cardinality estimate, `n_std_dev`
    /// standard deviations out. `n_std_dev` must be in `{1, 2, 3}`.
    pub fn lower_bound(&self, n_std_dev: u8) -> f64 {
        match &self.mode {
            Mode::List { list, .. } => list.container().lower_bound(n_std_dev as f64),
            Mode::Set { set, .. } => set.container().lower_bound(n_std_dev as f64),
            Mode::Array4(arr) => {
                let rse = relative_standard_error(self.lg_config_k, arr.is_out_of_order());
                arr.estimate() / (1.0 + n_std_dev as f64 * rse)
            }
            Mode::Array6(arr) => {
                let rse = relative_standard_error(self.lg_config_k, arr.is_out_of_order());
                arr.estimate() / (1.0 + n_std_dev as f64 * rse)
            }
            Mode::Array8(arr) => {
                let rse = relative_standard_error(self.lg_config_k, arr.is_out_of_order());
                arr.estimate() / (1.0 + n_std_dev as f64 * rse)
            }
        }
    }

    /// Serialize to the on-wire HLL format: an 8-byte shared header
    /// followed by a mode-specific payload. `compact` elides padding
    /// (unused list/set slots) at the cost of a variable-length encoding.
    pub fn serialize(&self, compact: bool) -> Vec<u8> {
        match &self.mode {
            Mode::List { list, hll_type } => {
                let container = list.container();
                let count = container.len;
                let coupons: Vec<u32> = container.iter().collect();
                let payload_count = if compact { count } else { LIST_MAX_COUPONS };
                let mut bytes = vec![0u8; HEADER_BYTES + payload_count * 4];

                bytes[PREAMBLE_INTS_BYTE] = PREAMBLE_INTS_LIST_SET;
                bytes[SER_VER_BYTE] = SER_VER;
                bytes[FAMILY_BYTE] = FAMILY_ID;
                bytes[LG_K_BYTE] = self.lg_config_k;
                bytes[LG_ARR_BYTE] = LG_INIT_LIST_SIZE as u8;
                bytes[FLAGS_BYTE] = list_set_flags(count == 0, compact);
                bytes[LIST_COUNT_BYTE] = count as u8;
                bytes[MODE_BYTE] = CUR_MODE_LIST | ((*hll_type as u8) << 2);

                for (i, c) in coupons.iter().enumerate() {
                    let off = HEADER_BYTES + i * 4;
                    bytes[off..off + 4].copy_from_slice(&c.to_le_bytes());
                }
                bytes
            }
            Mode::Set { set, hll_type } => {
                let container = set.container();
                let count = container.len;
                let lg_arr = container.lg_size;
                let slot_count = if compact { count } else { 1usize << lg_arr };
                let mut bytes = vec![0u8; HEADER_BYTES + 4 + slot_count * 4];

                bytes[PREAMBLE_INTS_BYTE] = PREAMBLE_INTS_LIST_SET;
                bytes[SER_VER_BYTE] = SER_VER;
                bytes[FAMILY_BYTE] = FAMILY_ID;
                bytes[LG_K_BYTE] = self.lg_config_k;
                bytes[LG_ARR_BYTE] = lg_arr as u8;
                bytes[FLAGS_BYTE] = list_set_flags(count == 0, compact);
                bytes[LIST_COUNT_BYTE] = 0;
                bytes[MODE_BYTE] = CUR_MODE_SET | ((*hll_type as u8) << 2);

                bytes[HEADER_BYTES..HEADER_BYTES + 4].copy_from_slice(&(count as u32).to_le_bytes());

                let coupons: Vec<u32> = if compact {
                    container.iter().collect()
                } else {
                    container.coupons.to_vec()
                };
                for (i, c) in coupons.iter().enumerate() {
                    let off = HEADER_BYTES + 4 + i * 4;
                    bytes[off..off + 4].copy_from_slice(&c.to_le_bytes());
                }
                bytes
            }
            Mode::Array4(arr) => arr.serialize(self.lg_config_k),
            Mode::Array6(arr) => arr.serialize(self.lg_config_k),
            Mode::Array8(arr) => arr.serialize(self.lg_config_k),
        }
    }

    /// Parse a sketch from the format written by [`Self::serialize`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < HEADER_BYTES {
            return Err(Error::truncated("HLL header", HEADER_BYTES, bytes.len()));
        }
        if bytes[SER_VER_BYTE] != SER_VER {
            return Err(Error::invalid_argument(format!(
                "unsupported HLL serial version {}",
                bytes[SER_VER_BYTE]
            )));
        }
        if bytes[FAMILY_BYTE] != FAMILY_ID {
            return Err(Error::invalid_argument(format!(
                "byte at family offset ({}) is not an HLL family id",
                bytes[FAMILY_BYTE]
            )));
        }

        let lg_config_k = bytes[LG_K_BYTE];
        if !(4..=21).contains(&lg_config_k) {
            return Err(Error::invalid_argument(format!(
                "lg_config_k {} out of range [4, 21]",
                lg_config_k
            )));
        }

        let flags = bytes[FLAGS_BYTE];
        let compact = flags & COMPACT_FLAG_MASK != 0;
        let ooo = flags & OUT_OF_ORDER_FLAG_MASK != 0;
        let mode_byte = bytes[MODE_BYTE];
        let cur_mode = mode_byte & 0x03;
        let hll_type = match (mode_byte >> 2) & 0x03 {
            0 => HllType::Hll4,
            1 => HllType::Hll6,
            2 => HllType::Hll8,
            other => {
                return Err(Error::invalid_argument(format!(
                    "invalid HLL type tag {}",
                    other
                )));
            }
        };

        let preamble_ints = bytes[PREAMBLE_INTS_BYTE];

        match cur_mode {
            CUR_MODE_LIST => {
                if preamble_ints != PREAMBLE_INTS_LIST_SET {
                    return Err(Error::invalid_argument(
                        "preamble-ints inconsistent with LIST mode",
                    ));
                }
                let count = bytes[LIST_COUNT_BYTE] as usize;
                let payload_count = if compact { count } else { LIST_MAX_COUPONS };
                let expected = HEADER_BYTES + payload_count * 4;
                if bytes.len() < expected {
                    return Err(Error::truncated("HLL LIST payload", expected, bytes.len()));
                }
                let mut list = List::new(LG_INIT_LIST_SIZE);
                for i in 0..count {
                    let off = HEADER_BYTES + i * 4;
                    let c = u32::from_le_bytes(bytes[off..off + 4].try_into().unwrap());
                    list.update(c);
                }
                Ok(Self::from_mode(lg_config_k, Mode::List { list, hll_type }))
            }
            CUR_MODE_SET => {
                if preamble_ints != PREAMBLE_INTS_LIST_SET {
                    return Err(Error::invalid_argument(
                        "preamble-ints inconsistent with SET mode",
                    ));
                }
                if lg_config_k < 7 {
                    return Err(Error::invalid_argument(
                        "SET mode requires lg_config_k >= 7",
                    ));
                }
                if bytes.len() < HEADER_BYTES + 4 {
                    return Err(Error::truncated("HLL SET count", HEADER_BYTES + 4, bytes.len()));
                }
                let count = u32::from_le_bytes(
                    bytes[HEADER_BYTES..HEADER_BYTES + 4].try_into().unwrap(),
                ) as usize;
                let lg_arr = bytes[LG_ARR_BYTE] as usize;
                let slot_count = if compact { count } else { 1usize << lg_arr };
                let expected = HEADER_BYTES + 4 + slot_count * 4;
                if bytes.len() < expected {
                    return Err(Error::truncated("HLL SET payload", expected, bytes.len()));
                }
                let mut set = HashSet::new(lg_arr);
                for i in 0..slot_count {
                    let off = HEADER_BYTES + 4 + i * 4;
                    let c = u32::from_le_bytes(bytes[off..off + 4].try_into().unwrap());
                    if c != 0 {
                        set.update(c);
                    }
                }
                Ok(Self::from_mode(lg_config_k, Mode::Set { set, hll_type }))
            }
            CUR_MODE_HLL => {
                if preamble_ints != PREAMBLE_INTS_HLL {
                    return Err(Error::invalid_argument(
                        "preamble-ints inconsistent with HLL mode",
                    ));
                }
                let mode = match hll_type {
                    HllType::Hll4 => {
                        Mode::Array4(Array4::deserialize(bytes, lg_config_k, compact, ooo)?)
                    }
                    HllType::Hll6 => {
                        Mode::Array6(Array6::deserialize(bytes, lg_config_k, compact, ooo)?)
                    }
                    HllType::Hll8 => {
                        Mode::Array8(Array8::deserialize(bytes, lg_config_k, compact, ooo)?)
                    }
                };
                Ok(Self::from_mode(lg_config_k, mode))
            }
            other => Err(Error::invalid_argument(format!(
                "invalid HLL mode tag {}",
                other
            ))),
        }
    }
}

const RESIZE_NUMER_SET: u32 = 3;
const RESIZE_DENOM_SET: u32 = 4;

fn list_set_flags(empty: bool, compact: bool) -> u8 {
    let mut flags = 0u8;
    if empty {
        flags |= EMPTY_FLAG_MASK;
    }
    if compact {
        flags |= COMPACT_FLAG_MASK;
    }
    flags
}

fn new_target_array(hll_type: HllType, lg_config_k: u8) -> Mode {
    match hll_type {
        HllType::Hll4 => Mode::Array4(Array4::new(lg_config_k)),
        HllType::Hll6 => Mode::Array6(Array6::new(lg_config_k)),
        HllType::Hll8 => Mode::Array8(Array8::new(lg_config_k)),
    }
}

fn update_array(mode: &mut Mode, coupon: u32) {
    match mode {
        Mode::Array4(arr) => arr.update(coupon),
        Mode::Array6(arr) => arr.update(coupon),
        Mode::Array8(arr) => arr.update(coupon),
        Mode::List { .. } | Mode::Set { .. } => {
            unreachable!("update_array called with non-array mode")
        }
    }
}
