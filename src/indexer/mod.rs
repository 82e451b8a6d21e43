//! Fingerprint-to-slot indexing strategies.
//!
//! A shard picks one strategy when it is opened and keeps it for its lifetime:
//!
//! - [`RescalingIndexer`] handles any capacity below `2^31`, including
//!   capacities that are not a power of two.
//! - [`ShiftIndexer`] handles power-of-two capacities with a single shift and
//!   has no capacity limit tied to multiplication overflow.
//!
//! Both implement [`SlotIndexer`]. [`AnyIndexer`] wraps either one and forwards
//! calls without dynamic dispatch.

use enum_dispatch::enum_dispatch;
use log::{trace, warn};

use crate::error::{IndexError, Result};

mod rescale;
mod shift;

pub use rescale::{RescalingIndexer, MAX_RESCALING_POSITIONS};
pub use shift::ShiftIndexer;

/// Reserved fingerprint bits must be strictly below this.
pub const MAX_FP_BITS: u32 = 63;

/// Maps a 64-bit fingerprint to a slot in `[0, positions)`.
#[enum_dispatch]
pub trait SlotIndexer: Copy + Send + Sync + std::fmt::Debug {
    /// Home slot of `fp`.
    fn index(&self, fp: u64) -> usize;

    /// Slot visited by the `probe`-th step of the open-addressing sequence of
    /// `fp`, i.e. `(index(fp) + probe) mod positions`.
    fn index_with_probe(&self, fp: u64, probe: u32) -> usize;

    /// Number of addressable slots.
    fn positions(&self) -> u64;

    /// Leading fingerprint bits ignored by this indexer.
    fn fp_bits(&self) -> u32;
}

/// Either indexing strategy, fixed at construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[enum_dispatch(SlotIndexer)]
pub enum AnyIndexer {
    /// See [`RescalingIndexer`]
    Rescaling(RescalingIndexer),

    /// See [`ShiftIndexer`]
    Shift(ShiftIndexer),
}

impl AnyIndexer {
    /// Pick the strategy for a shard of `positions` slots: the shift fast path
    /// for exact powers of two, rescaling otherwise.
    pub fn for_capacity(positions: u64, fp_bits: u32) -> Result<Self> {
        if positions.is_power_of_two() {
            trace!("{} slots is a power of two, using shift indexer", positions);
            Ok(ShiftIndexer::new(positions, fp_bits)?.into())
        } else {
            trace!("{} slots is not a power of two, using rescaling indexer", positions);
            Ok(RescalingIndexer::new(positions, fp_bits)?.into())
        }
    }

    /// Whether this indexer uses the power-of-two shift strategy.
    pub fn is_shift(&self) -> bool {
        matches!(self, Self::Shift(_))
    }
}

/// Iterator over the open-addressing probe sequence of one fingerprint.
///
/// Yields `index_with_probe(fp, 0)`, `index_with_probe(fp, 1)`, ... for
/// `budget` steps.
#[derive(Clone, Debug)]
pub struct ProbeSeq<I: SlotIndexer> {
    indexer: I,
    fp: u64,
    next: u32,
    budget: u32,
}

impl<I: SlotIndexer> ProbeSeq<I> {
    pub fn new(indexer: I, fp: u64, budget: u32) -> Self {
        Self {
            indexer,
            fp,
            next: 0,
            budget,
        }
    }

    /// Probe sequence visiting every slot exactly once.
    ///
    /// Capacities beyond `u32::MAX` slots are capped at `u32::MAX` probes.
    pub fn full(indexer: I, fp: u64) -> Self {
        let budget = u32::try_from(indexer.positions()).unwrap_or(u32::MAX);
        Self::new(indexer, fp, budget)
    }

    /// Number of probes already handed out.
    pub fn probes(&self) -> u32 {
        self.next
    }
}

impl<I: SlotIndexer> Iterator for ProbeSeq<I> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next >= self.budget {
            return None;
        }
        let slot = self.indexer.index_with_probe(self.fp, self.next);
        self.next += 1;
        Some(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.budget - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl<I: SlotIndexer> ExactSizeIterator for ProbeSeq<I> {}

/// Mask keeping the `64 - fp_bits` information-bearing bits.
#[inline]
pub(crate) fn fingerprint_mask(fp_bits: u32) -> u64 {
    u64::MAX >> fp_bits
}

pub(crate) fn check_fp_bits(fp_bits: u32) -> Result<()> {
    if fp_bits >= MAX_FP_BITS {
        warn!("Rejecting indexer: {} reserved fingerprint bits", fp_bits);
        return Err(IndexError::ReservedBits { fp_bits });
    }
    Ok(())
}

pub(crate) fn check_positions(positions: u64) -> Result<()> {
    if positions == 0 {
        warn!("Rejecting indexer without slots");
        return Err(IndexError::EmptyCapacity);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_capacity_selects_strategy() {
        assert!(AnyIndexer::for_capacity(128, 1).unwrap().is_shift());
        assert!(!AnyIndexer::for_capacity(96, 1).unwrap().is_shift());
        assert!(AnyIndexer::for_capacity(1, 0).unwrap().is_shift());
    }

    #[test]
    fn test_for_capacity_large_power_of_two() {
        let indexer = AnyIndexer::for_capacity(1 << 31, 1).unwrap();
        assert!(indexer.is_shift());
        assert_eq!(indexer.positions(), 1 << 31);
    }

    #[test]
    fn test_for_capacity_rejects_large_odd_capacity() {
        assert!(matches!(
            AnyIndexer::for_capacity((1 << 31) + 1, 1),
            Err(IndexError::CapacityOverflow { .. })
        ));
    }

    #[test]
    fn test_any_indexer_forwards() {
        let inner = RescalingIndexer::new(99, 2).unwrap();
        let any: AnyIndexer = inner.into();
        let max_fp = u64::MAX >> 2;
        assert_eq!(any.index(max_fp / 2), inner.index(max_fp / 2));
        assert_eq!(any.index_with_probe(max_fp, 100), 0);
        assert_eq!(any.fp_bits(), 2);
    }

    #[test]
    fn test_probe_seq_wraps() {
        let indexer = RescalingIndexer::new(5, 1).unwrap();
        let slots: Vec<_> = ProbeSeq::new(indexer, u64::MAX >> 1, 7).collect();
        assert_eq!(slots, vec![4, 0, 1, 2, 3, 4, 0]);
    }

    #[test]
    fn test_probe_seq_full_visits_every_slot_once() {
        let indexer = AnyIndexer::for_capacity(16, 1).unwrap();
        let mut slots: Vec<_> = ProbeSeq::full(indexer, 0x0123_4567_89ab_cdef).collect();
        assert_eq!(slots.len(), 16);
        slots.sort_unstable();
        assert_eq!(slots, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_probe_seq_counts_probes() {
        let indexer = ShiftIndexer::new(8, 0).unwrap();
        let mut seq = ProbeSeq::new(indexer, 42, 3);
        assert_eq!(seq.len(), 3);
        seq.next();
        seq.next();
        assert_eq!(seq.probes(), 2);
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn test_fingerprint_mask() {
        assert_eq!(fingerprint_mask(0), u64::MAX);
        assert_eq!(fingerprint_mask(1), 0x7FFF_FFFF_FFFF_FFFF);
        assert_eq!(fingerprint_mask(62), 0b11);
    }
}
