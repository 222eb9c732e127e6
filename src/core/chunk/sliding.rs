use super::{ChunkBaseConfig, ChunkerError, DocumentChunker};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The most basic of chunkers.
///
/// Moves a window of `size` characters over the input in steps of `size - overlap`,
/// so every chunk shares its last `overlap` characters with the start of the next one.
/// Sizes are counted in characters, not bytes or tokens, which means boundaries can
/// fall in the middle of a word.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SlidingWindow {
    pub config: ChunkBaseConfig,
}

impl SlidingWindow {
    pub fn from_config(config: ChunkBaseConfig) -> Result<Self, ChunkerError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn new(size: usize, overlap: usize) -> Self {
        Self {
            config: ChunkBaseConfig::new(size, overlap),
        }
    }
}

impl DocumentChunker for SlidingWindow {
    fn chunk<'a>(&self, input: &'a str) -> Result<Vec<&'a str>, ChunkerError> {
        self.config.validate()?;

        let ChunkBaseConfig { size, overlap } = self.config;

        let input = input.trim();

        if input.is_empty() {
            return Ok(vec![]);
        }

        // Byte offset of every character plus the end of input,
        // so that `bounds[n]` is where the n-th character starts.
        let bounds = input
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(input.len()))
            .collect::<Vec<_>>();

        let total = bounds.len() - 1;

        // Return whole input if it fits
        if total <= size {
            return Ok(vec![input]);
        }

        let step = size - overlap;
        let mut chunks = vec![];
        let mut start = 0;

        loop {
            let end = (start + size).min(total);

            chunks.push(&input[bounds[start]..bounds[end]]);

            if end == total {
                break;
            }

            start += step;
        }

        debug!(
            "Chunked {} chunks, avg chunk size: {}",
            chunks.len(),
            chunks.iter().fold(0, |acc, el| acc + el.chars().count()) / chunks.len()
        );

        Ok(chunks)
    }
}
