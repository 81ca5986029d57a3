use serde::{Deserialize, Serialize};

use streamfs_protocol::MAX_CHUNK_SIZE;

/// Errors from loading or validating transfer configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("chunk_size {0} exceeds the maximum of {max} bytes", max = MAX_CHUNK_SIZE)]
    ChunkTooLarge(usize),
}

/// Sizing shared by both ends of a transfer.
///
/// Both fields are required: a config table missing either one fails to
/// deserialize, and zero values fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTransferConfig")]
pub struct TransferConfig {
    /// Bytes per data frame.
    pub chunk_size: usize,
    /// Data frames buffered before a flush to the sink.
    pub chunk_buffer_count: usize,
}

#[derive(Deserialize)]
struct RawTransferConfig {
    chunk_size: usize,
    chunk_buffer_count: usize,
}

impl TryFrom<RawTransferConfig> for TransferConfig {
    type Error = ConfigError;

    fn try_from(raw: RawTransferConfig) -> Result<Self, Self::Error> {
        TransferConfig::new(raw.chunk_size, raw.chunk_buffer_count)
    }
}

impl TransferConfig {
    pub fn new(chunk_size: usize, chunk_buffer_count: usize) -> Result<Self, ConfigError> {
        let config = Self {
            chunk_size,
            chunk_buffer_count,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Zero {
                field: "chunk_size",
            });
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::ChunkTooLarge(self.chunk_size));
        }
        if self.chunk_buffer_count == 0 {
            return Err(ConfigError::Zero {
                field: "chunk_buffer_count",
            });
        }
        Ok(())
    }
}
