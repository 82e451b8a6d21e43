use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Capacity of {positions} slots does not fit a 31-bit slot index")]
    CapacityOverflow { positions: u64 },

    #[error("Indexer needs at least one slot")]
    EmptyCapacity,

    #[error("Reserved fingerprint bits must be below 63, got {fp_bits}")]
    ReservedBits { fp_bits: u32 },

    #[error("Shift indexing needs a power-of-two capacity without a domain bound, got {positions} slots")]
    StrategyMismatch { positions: u64 },

    #[error("Corrupt indexer descriptor: {reason}")]
    CorruptDescriptor { reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] bincode::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
