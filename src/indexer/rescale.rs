//! General-purpose indexer for arbitrary capacities.
//!
//! The information-bearing magnitude of a fingerprint is treated as a fraction of
//! its domain and stretched linearly onto `[0, positions)`. The product is formed
//! in 128-bit arithmetic so that capacities close to `2^31` cannot overflow.

use log::{debug, warn};

use super::{check_fp_bits, check_positions, fingerprint_mask, SlotIndexer};
use crate::error::{IndexError, Result};

/// Largest capacity whose slots still fit a non-negative 32-bit signed index.
pub const MAX_RESCALING_POSITIONS: u64 = i32::MAX as u64;

/// Smallest fingerprint magnitude that is mapped, it lands on slot 0.
const MIN_FINGERPRINT: u64 = 1;

/// Rescaling indexer.
///
/// Maps `fp & (u64::MAX >> fp_bits)` onto the slot range with round-half-up
/// linear interpolation between `1 -> 0` and `max_value -> positions - 1`.
/// While `positions <= max_value` the slope is at most one slot per fingerprint,
/// so every slot is reachable.
///
/// Works for any `positions` in `[1, 2^31)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RescalingIndexer {
    positions: u64,
    fp_bits: u32,
    mask: u64,
    max_value: u64,
    explicit_max: bool,
    /// `max_value - MIN_FINGERPRINT`, never zero.
    span: u64,
}

impl RescalingIndexer {
    /// Create an indexer whose domain is the full `64 - fp_bits` remaining bits.
    pub fn new(positions: u64, fp_bits: u32) -> Result<Self> {
        check_fp_bits(fp_bits)?;
        Self::build(positions, fp_bits, fingerprint_mask(fp_bits), false)
    }

    /// Create an indexer whose rescaling domain ends at `max_value` instead of
    /// `u64::MAX >> fp_bits`.
    ///
    /// A `max_value` above `u64::MAX >> fp_bits` is clamped to it, since masked
    /// fingerprints never exceed that bound.
    pub fn with_max_value(positions: u64, fp_bits: u32, max_value: u64) -> Result<Self> {
        check_fp_bits(fp_bits)?;
        let mask = fingerprint_mask(fp_bits);
        if max_value > mask {
            debug!(
                "Clamping max_value {:#x} to the {}-bit fingerprint domain",
                max_value,
                u64::BITS - fp_bits
            );
        }
        Self::build(positions, fp_bits, max_value.min(mask), true)
    }

    fn build(positions: u64, fp_bits: u32, max_value: u64, explicit_max: bool) -> Result<Self> {
        check_positions(positions)?;
        if positions > MAX_RESCALING_POSITIONS {
            warn!(
                "Rejecting rescaling indexer: {} slots exceed the limit of {}",
                positions, MAX_RESCALING_POSITIONS
            );
            return Err(IndexError::CapacityOverflow { positions });
        }

        let span = max_value.saturating_sub(MIN_FINGERPRINT).max(1);
        debug!(
            "Rescaling indexer: positions={} fp_bits={} max_value={:#x}",
            positions, fp_bits, max_value
        );

        Ok(Self {
            positions,
            fp_bits,
            mask: fingerprint_mask(fp_bits),
            max_value,
            explicit_max,
            span,
        })
    }

    /// Upper end of the rescaling domain.
    pub fn max_value(&self) -> u64 {
        self.max_value
    }

    /// The domain bound if it was supplied at construction.
    pub fn explicit_max_value(&self) -> Option<u64> {
        self.explicit_max.then_some(self.max_value)
    }

    /// Slot of `fp` before wrapping, in `[0, positions)` for fingerprints
    /// within the domain.
    #[inline]
    fn scaled(&self, fp: u64) -> u64 {
        let magnitude = (fp & self.mask).saturating_sub(MIN_FINGERPRINT) as u128;
        let span = self.span as u128;
        let num = magnitude * (self.positions - 1) as u128;
        // Round half up. Values within 2^-32 of a half count as ties, so the
        // integer midpoint `max_value / 2` of an odd domain rounds like 1/2.
        ((2 * num + span + (span >> 31)) / (2 * span)) as u64
    }
}

impl SlotIndexer for RescalingIndexer {
    #[inline]
    fn index(&self, fp: u64) -> usize {
        (self.scaled(fp) % self.positions) as usize
    }

    #[inline]
    fn index_with_probe(&self, fp: u64, probe: u32) -> usize {
        let base = self.scaled(fp) % self.positions;
        ((base + probe as u64) % self.positions) as usize
    }

    fn positions(&self) -> u64 {
        self.positions
    }

    fn fp_bits(&self) -> u32 {
        self.fp_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midpoints() {
        for (fp_bits, positions, mid) in [(1, 96, 48), (1, 99, 49), (2, 96, 48), (2, 99, 49)] {
            let max_fp = u64::MAX >> fp_bits;
            let indexer = RescalingIndexer::new(positions, fp_bits).unwrap();
            assert_eq!(indexer.index(1), 0);
            assert_eq!(indexer.index(max_fp / 2), mid);
            assert_eq!(indexer.index(max_fp), positions as usize - 1);
        }
    }

    #[test]
    fn test_reserved_bits_are_ignored() {
        let indexer = RescalingIndexer::new(96, 1).unwrap();
        let fp = 0x1234_5678_9abc_def0;
        assert_eq!(indexer.index(fp), indexer.index(fp | (1 << 63)));
    }

    #[test]
    fn test_zero_fingerprint() {
        let indexer = RescalingIndexer::new(7, 3).unwrap();
        assert_eq!(indexer.index(0), 0);
    }

    #[test]
    fn test_single_slot() {
        let indexer = RescalingIndexer::new(1, 0).unwrap();
        assert_eq!(indexer.index(u64::MAX), 0);
        assert_eq!(indexer.index_with_probe(u64::MAX, u32::MAX), 0);
    }

    #[test]
    fn test_explicit_max_value() {
        let indexer = RescalingIndexer::with_max_value(11, 1, 11).unwrap();
        assert_eq!(indexer.index(1), 0);
        assert_eq!(indexer.index(11), 10);
        assert_eq!(indexer.index_with_probe(11, 1), 0);
        assert_eq!(indexer.explicit_max_value(), Some(11));
    }

    #[test]
    fn test_explicit_max_value_covers_every_slot() {
        let indexer = RescalingIndexer::with_max_value(11, 1, 11).unwrap();
        let slots: Vec<_> = (1..=11).map(|fp| indexer.index(fp)).collect();
        assert_eq!(slots, (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn test_degenerate_max_value() {
        let indexer = RescalingIndexer::with_max_value(5, 0, 1).unwrap();
        assert_eq!(indexer.index(1), 0);
        assert!(indexer.index(u64::MAX) < 5);
    }

    #[test]
    fn test_max_value_clamped_to_domain() {
        let indexer = RescalingIndexer::with_max_value(10, 4, u64::MAX).unwrap();
        assert_eq!(indexer.max_value(), u64::MAX >> 4);
        assert_eq!(indexer.explicit_max_value(), Some(u64::MAX >> 4));
        assert_eq!(indexer.index(u64::MAX), 9);

        let full = RescalingIndexer::new(10, 4).unwrap();
        for fp in [1, u64::MAX / 3, u64::MAX >> 5, u64::MAX] {
            assert_eq!(indexer.index(fp), full.index(fp));
        }
    }

    #[test]
    fn test_capacity_boundary() {
        assert!(RescalingIndexer::new(MAX_RESCALING_POSITIONS, 1).is_ok());
        assert!(matches!(
            RescalingIndexer::new(MAX_RESCALING_POSITIONS + 1, 1),
            Err(IndexError::CapacityOverflow { positions }) if positions == 1 << 31
        ));
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(matches!(
            RescalingIndexer::new(0, 1),
            Err(IndexError::EmptyCapacity)
        ));
        assert!(matches!(
            RescalingIndexer::new(10, 63),
            Err(IndexError::ReservedBits { fp_bits: 63 })
        ));
    }
}
