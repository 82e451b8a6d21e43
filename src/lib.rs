//! # fp-index
//!
//! Maps 64-bit state fingerprints onto the slots of a bounded, open-addressed
//! fingerprint set.
//!
//! ## Features
//!
//! - **Any capacity** - [`RescalingIndexer`] spreads fingerprints evenly over capacities
//!   that are not a power of two
//! - **Shift fast path** - [`ShiftIndexer`] for power-of-two capacities, no multiply or divide
//! - **Overflow free** - capacities up to `2^31 - 1` (rescaling) and `2^31` (shift)
//! - **Probing** - `(index + probe) mod positions` with correct wraparound
//! - **Reserved bits** - the leading `fp_bits` bits used for sharding are ignored
//! - **Immutable** - built once per shard, shared read-only across threads
//! - **Persistable** - [`IndexerConfig`] descriptors rebuild the same indexer on reopen
//!
//! ## Quick Start
//!
//! ```rust
//! use fp_index::{AnyIndexer, ProbeSeq, SlotIndexer};
//!
//! // One shard of 96 slots, the top fingerprint bit already picked the shard.
//! let indexer = AnyIndexer::for_capacity(96, 1).unwrap();
//!
//! let fp = 0x2545_F491_4F6C_DD1D;
//! let home = indexer.index(fp);
//! assert!(home < 96);
//!
//! // Probe sequence on collision
//! assert_eq!(indexer.index_with_probe(fp, 1), (home + 1) % 96);
//! for slot in ProbeSeq::new(indexer, fp, 4) {
//!     assert!(slot < 96);
//! }
//!
//! // Store the descriptor with the shard, rebuild it on reopen
//! let bytes = indexer.config().to_bytes().unwrap();
//! let reopened = fp_index::IndexerConfig::from_bytes(&bytes).unwrap().build().unwrap();
//! assert_eq!(reopened.index(fp), home);
//! ```

pub mod config;
pub mod error;
pub mod indexer;

pub use config::{IndexerConfig, Strategy};
pub use error::{IndexError, Result};
pub use indexer::{
    AnyIndexer, ProbeSeq, RescalingIndexer, ShiftIndexer, SlotIndexer, MAX_FP_BITS,
    MAX_RESCALING_POSITIONS,
};
