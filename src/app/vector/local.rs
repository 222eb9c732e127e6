use crate::{
    core::{
        model::{IndexEntry, ScoredChunk},
        vector::VectorIndex,
    },
    err,
    error::DocqaError,
    map_err,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};
use tokio::sync::RwLock;
use tracing::{debug, info};

pub const INDEX_FILE: &str = "index.json";

const TMP_FILE: &str = "index.json.tmp";

/// The persisted form of the index.
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    /// The embedding model all vectors were obtained with.
    model: String,
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

/// Exact cosine similarity index persisted as a single JSON file in `dir`.
///
/// The file is read once when the index is opened and the in memory copy is
/// authoritative afterwards. Every write replaces the file atomically.
pub struct LocalIndex {
    dir: PathBuf,
    index: RwLock<Option<IndexFile>>,
}

impl LocalIndex {
    /// Open the index in `dir`. A missing directory or file is not an error,
    /// the index gets created on the first insert.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, DocqaError> {
        let dir = dir.into();

        match tokio::fs::metadata(&dir).await {
            Ok(meta) if !meta.is_dir() => {
                return err!(Config, "index path '{}' is not a directory", dir.display());
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(DocqaError::new(file!(), line!(), column!(), e.into())),
        }

        let index = Self::read(&dir.join(INDEX_FILE)).await?;

        match index {
            Some(ref index) => info!(
                "Loaded index at {} ({} entries, model '{}', {} dimensions)",
                dir.display(),
                index.entries.len(),
                index.model,
                index.dimensions
            ),
            None => info!("No index at {}, one will be created on ingestion", dir.display()),
        }

        Ok(Self {
            dir,
            index: RwLock::new(index),
        })
    }

    async fn read(path: &Path) -> Result<Option<IndexFile>, DocqaError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DocqaError::new(file!(), line!(), column!(), e.into())),
        };

        match serde_json::from_slice::<IndexFile>(&bytes) {
            Ok(index) => {
                if let Some(entry) = index
                    .entries
                    .iter()
                    .find(|e| e.vector.len() != index.dimensions)
                {
                    return err!(
                        CorruptIndex,
                        "entry '{}' has {} dimensions, expected {}",
                        entry.id,
                        entry.vector.len(),
                        index.dimensions
                    );
                }
                Ok(Some(index))
            }
            Err(e) => err!(CorruptIndex, "{}: {e}", path.display()),
        }
    }

    /// Write the index to a temporary file and move it over the current one.
    async fn persist(&self, index: &IndexFile) -> Result<(), DocqaError> {
        map_err!(tokio::fs::create_dir_all(&self.dir).await);

        let tmp = self.dir.join(TMP_FILE);
        let bytes = map_err!(serde_json::to_vec(index));

        map_err!(tokio::fs::write(&tmp, bytes).await);
        map_err!(tokio::fs::rename(&tmp, self.dir.join(INDEX_FILE)).await);

        debug!(
            "Persisted {} entries to {}",
            index.entries.len(),
            self.dir.display()
        );

        Ok(())
    }
}

#[async_trait::async_trait]
impl VectorIndex for LocalIndex {
    fn id(&self) -> &'static str {
        "local"
    }

    async fn count(&self) -> Result<usize, DocqaError> {
        Ok(self
            .index
            .read()
            .await
            .as_ref()
            .map_or(0, |index| index.entries.len()))
    }

    async fn insert(&self, model: &str, entries: Vec<IndexEntry>) -> Result<usize, DocqaError> {
        let Some(first) = entries.first() else {
            return Ok(0);
        };

        let mut guard = self.index.write().await;

        let (expected_model, dimensions) = match guard.as_ref() {
            Some(index) => (index.model.as_str(), index.dimensions),
            None => (model, first.vector.len()),
        };

        if expected_model != model {
            return err!(
                IncompatibleIndex,
                "index was built with '{expected_model}', got vectors from '{model}'"
            );
        }

        if dimensions == 0 {
            return err!(MalformedResponse, "received empty embedding vectors");
        }

        if let Some(entry) = entries.iter().find(|e| e.vector.len() != dimensions) {
            return err!(
                IncompatibleIndex,
                "index has {dimensions} dimensions, got a vector with {}",
                entry.vector.len()
            );
        }

        let created = guard.is_none();
        let index = guard.get_or_insert_with(|| IndexFile {
            model: model.to_string(),
            dimensions,
            entries: vec![],
        });

        let previous = index.entries.len();
        let mut ids = index
            .entries
            .iter()
            .map(|e| e.id.clone())
            .collect::<HashSet<_>>();

        for entry in entries {
            if ids.insert(entry.id.clone()) {
                index.entries.push(entry);
            }
        }

        let inserted = index.entries.len() - previous;

        if inserted == 0 && !created {
            debug!("All entries already present in {}", self.dir.display());
            return Ok(0);
        }

        if let Err(e) = self.persist(index).await {
            // Keep memory in line with what is on disk.
            if created {
                *guard = None;
            } else {
                index.entries.truncate(previous);
            }
            return Err(e);
        }

        Ok(inserted)
    }

    async fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>, DocqaError> {
        let guard = self.index.read().await;

        let Some(index) = guard.as_ref().filter(|index| !index.entries.is_empty()) else {
            return err!(IndexMissing);
        };

        if vector.len() != index.dimensions {
            return err!(
                IncompatibleIndex,
                "index has {} dimensions, query vector has {}",
                index.dimensions,
                vector.len()
            );
        }

        let mut scored = index
            .entries
            .iter()
            .map(|entry| (cosine_similarity(vector, &entry.vector), entry))
            .collect::<Vec<_>>();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(score, entry)| ScoredChunk {
                content: entry.content.clone(),
                source: entry.source.clone(),
                score,
            })
            .collect())
    }
}

/// Cosine similarity of two vectors of equal length, 0 if either has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}
