//! Persistable description of a shard's indexer.
//!
//! A storage layer keeps the [`IndexerConfig`] next to its slots so that a
//! reopened shard rebuilds exactly the indexer it was written with. Encoded
//! descriptors carry:
//! - A magic number and format version
//! - A CRC32 checksum of the encoded parameters
//!
//! Files are written through a temp file and renamed into place.

use crate::error::{IndexError, Result};
use crate::indexer::{AnyIndexer, RescalingIndexer, ShiftIndexer, SlotIndexer};
use log::debug;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Current format version - increment when format changes
const FORMAT_VERSION: u32 = 1;

/// Magic number to identify our descriptor format
const MAGIC: &[u8; 8] = b"FPINDEX1";

/// Which indexing strategy a descriptor asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Strategy {
    /// Shift for power-of-two capacities without a domain bound, rescaling otherwise
    #[default]
    Auto,
    Rescaling,
    Shift,
}

/// Parameters needed to rebuild an indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerConfig {
    pub positions: u64,
    pub fp_bits: u32,
    pub max_value: Option<u64>,
    pub strategy: Strategy,
}

/// Descriptor header
#[derive(Debug, Serialize, Deserialize)]
struct DescriptorHeader {
    magic: [u8; 8],
    version: u32,
    /// CRC32 checksum of the encoded config
    checksum: u32,
}

impl DescriptorHeader {
    fn validate(&self) -> Result<()> {
        if &self.magic != MAGIC {
            return Err(IndexError::CorruptDescriptor {
                reason: format!("expected magic {:?}, got {:?}", MAGIC, self.magic),
            });
        }

        if self.version != FORMAT_VERSION {
            return Err(IndexError::CorruptDescriptor {
                reason: format!(
                    "incompatible format version: expected {}, got {}",
                    FORMAT_VERSION, self.version
                ),
            });
        }

        Ok(())
    }
}

impl IndexerConfig {
    pub fn new(positions: u64, fp_bits: u32) -> Self {
        Self {
            positions,
            fp_bits,
            max_value: None,
            strategy: Strategy::Auto,
        }
    }

    /// Bound the rescaling domain at `max_value`. Only valid with rescaling.
    pub fn with_max_value(mut self, max_value: u64) -> Self {
        self.max_value = Some(max_value);
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Build the indexer this config describes.
    pub fn build(&self) -> Result<AnyIndexer> {
        let use_shift = match self.strategy {
            Strategy::Auto => self.max_value.is_none() && self.positions.is_power_of_two(),
            Strategy::Rescaling => false,
            Strategy::Shift => {
                if self.max_value.is_some() || !self.positions.is_power_of_two() {
                    return Err(IndexError::StrategyMismatch {
                        positions: self.positions,
                    });
                }
                true
            }
        };

        if use_shift {
            return Ok(ShiftIndexer::new(self.positions, self.fp_bits)?.into());
        }

        let indexer = match self.max_value {
            Some(max_value) => {
                RescalingIndexer::with_max_value(self.positions, self.fp_bits, max_value)?
            }
            None => RescalingIndexer::new(self.positions, self.fp_bits)?,
        };
        Ok(indexer.into())
    }

    /// Encode as header + config bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let config_bytes = bincode::serialize(self)?;
        let header = DescriptorHeader {
            magic: *MAGIC,
            version: FORMAT_VERSION,
            checksum: crc32fast::hash(&config_bytes),
        };

        let mut bytes = bincode::serialize(&header)?;
        bytes.extend_from_slice(&config_bytes);
        Ok(bytes)
    }

    /// Decode bytes produced by [`IndexerConfig::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = bytes;
        let header: DescriptorHeader = bincode::deserialize_from(&mut reader)?;
        header.validate()?;

        // `reader` now points past the header
        let actual = crc32fast::hash(reader);
        if actual != header.checksum {
            return Err(IndexError::CorruptDescriptor {
                reason: format!(
                    "checksum mismatch: expected {}, got {}",
                    header.checksum, actual
                ),
            });
        }

        Ok(bincode::deserialize(reader)?)
    }

    /// Write the descriptor atomically to `path`.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        StagedDescriptor::create(path.as_ref())?.commit(&bytes)?;
        debug!("Saved indexer descriptor to {:?}", path.as_ref());
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut bytes = Vec::new();
        File::open(path)?.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }
}

impl AnyIndexer {
    /// Descriptor that rebuilds an identical indexer.
    pub fn config(&self) -> IndexerConfig {
        let config = IndexerConfig::new(self.positions(), self.fp_bits());
        match self {
            Self::Shift(_) => config.with_strategy(Strategy::Shift),
            Self::Rescaling(inner) => {
                let config = config.with_strategy(Strategy::Rescaling);
                match inner.explicit_max_value() {
                    Some(max_value) => config.with_max_value(max_value),
                    None => config,
                }
            }
        }
    }
}

/// Descriptor bytes staged in a sibling file until `commit` renames them over
/// the target.
///
/// The staging name appends `.tmp` to the whole file name, so a target that
/// already ends in `.tmp` is never its own staging file.
struct StagedDescriptor {
    staging_path: PathBuf,
    target: PathBuf,
    file: BufWriter<File>,
    committed: bool,
}

impl StagedDescriptor {
    fn create(target: &Path) -> Result<Self> {
        let staging_path = staging_path_for(target);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&staging_path)?;

        Ok(Self {
            staging_path,
            target: target.to_path_buf(),
            file: BufWriter::new(file),
            committed: false,
        })
    }

    fn commit(mut self, bytes: &[u8]) -> Result<()> {
        self.file.write_all(bytes)?;
        self.file.flush()?;
        self.file.get_ref().sync_all()?;
        std::fs::rename(&self.staging_path, &self.target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedDescriptor {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.staging_path);
        }
    }
}

fn staging_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}
