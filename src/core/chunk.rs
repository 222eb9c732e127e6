use serde::{Deserialize, Serialize};
use thiserror::Error;

mod sliding;

pub use sliding::SlidingWindow;

/// Default amount of characters in a chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default amount of characters shared by two consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

pub trait DocumentChunker {
    fn chunk<'a>(&self, input: &'a str) -> Result<Vec<&'a str>, ChunkerError>;
}

#[derive(Debug, Error)]
pub enum ChunkerError {
    #[error("{0}")]
    Config(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ChunkBaseConfig {
    /// Chunk size in characters.
    pub size: usize,

    /// The amount of characters consecutive chunks share.
    pub overlap: usize,
}

impl ChunkBaseConfig {
    pub fn new(size: usize, overlap: usize) -> Self {
        Self { size, overlap }
    }

    pub fn validate(&self) -> Result<(), ChunkerError> {
        if self.size == 0 {
            return Err(ChunkerError::Config("size must be greater than 0".to_string()));
        }

        if self.overlap >= self.size {
            return Err(ChunkerError::Config(format!(
                "overlap ({}) must be smaller than size ({})",
                self.overlap, self.size
            )));
        }

        Ok(())
    }
}

impl Default for ChunkBaseConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}
