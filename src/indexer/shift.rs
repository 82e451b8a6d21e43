use log::debug;

use super::{check_fp_bits, check_positions, fingerprint_mask, SlotIndexer};
use crate::error::Result;

/// Indexer for power-of-two capacities.
///
/// The slot is the `log2(positions)` bits directly below the reserved ones, so no
/// multiplication or division is involved and large capacities cannot overflow.
///
/// NOTE: `positions` must be a power of two. This is only checked in debug builds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ShiftIndexer {
    positions: u64,
    fp_bits: u32,
    mask: u64,
    /// `positions - 1`
    slot_mask: u64,
    shift: u32,
}

impl ShiftIndexer {
    /// Create an indexer over a power-of-two number of slots.
    pub fn new(positions: u64, fp_bits: u32) -> Result<Self> {
        check_fp_bits(fp_bits)?;
        check_positions(positions)?;
        debug_assert!(
            positions.is_power_of_two(),
            "{positions} is not a power of 2"
        );

        let log_pos = positions.trailing_zeros();
        let shift = u64::BITS.saturating_sub(log_pos + fp_bits);
        debug!(
            "Shift indexer: positions=2^{} fp_bits={} shift={}",
            log_pos, fp_bits, shift
        );

        Ok(Self {
            positions,
            fp_bits,
            mask: fingerprint_mask(fp_bits),
            slot_mask: positions - 1,
            shift,
        })
    }

    /// Number of bits the masked fingerprint is shifted right by.
    pub fn shift(&self) -> u32 {
        self.shift
    }

    #[inline]
    fn base(&self, fp: u64) -> u64 {
        // A shift of 64 only happens for a single slot without reserved bits.
        (fp & self.mask).checked_shr(self.shift).unwrap_or(0) & self.slot_mask
    }
}

impl SlotIndexer for ShiftIndexer {
    #[inline]
    fn index(&self, fp: u64) -> usize {
        self.base(fp) as usize
    }

    #[inline]
    fn index_with_probe(&self, fp: u64, probe: u32) -> usize {
        (self.base(fp).wrapping_add(probe as u64) & self.slot_mask) as usize
    }

    fn positions(&self) -> u64 {
        self.positions
    }

    fn fp_bits(&self) -> u32 {
        self.fp_bits
    }
}
