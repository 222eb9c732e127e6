use crate::{
    core::{
        chunk::{DocumentChunker, SlidingWindow},
        document::{
            loader::UrlLoader,
            parser::parse_blocking,
            store::{sha256, DocumentStore},
        },
        embedder::{Embedder, EmbeddingTask},
        model::{Document, DocumentType, IndexEntry},
        vector::VectorIndex,
    },
    err,
    error::DocqaError,
    map_err,
};
use serde::Serialize;
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, info};
use validify::Validate;

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub name: String,
    pub file: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(name: impl Into<String>, file: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
        }
    }
}

/// A location to load a document from.
#[derive(Debug, Clone, Validate)]
pub struct UrlSource {
    #[validate(url)]
    pub url: String,
}

/// Outcome of a single ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Amount of documents processed.
    pub documents: usize,

    /// Amount of distinct chunks embedded.
    pub chunks: usize,

    /// Amount of chunks that were not in the index before.
    pub inserted: usize,
}

/// Extracts, chunks and embeds documents into the vector index.
#[derive(Clone)]
pub struct IngestService {
    chunker: SlidingWindow,
    embedder: Arc<dyn Embedder + Send + Sync>,
    index: Arc<dyn VectorIndex + Send + Sync>,
    loader: Arc<dyn UrlLoader + Send + Sync>,
    store: Arc<dyn DocumentStore + Send + Sync>,
}

impl IngestService {
    pub fn new(
        chunker: SlidingWindow,
        embedder: Arc<dyn Embedder + Send + Sync>,
        index: Arc<dyn VectorIndex + Send + Sync>,
        loader: Arc<dyn UrlLoader + Send + Sync>,
        store: Arc<dyn DocumentStore + Send + Sync>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
            loader,
            store,
        }
    }

    /// Store the uploaded files, extract their text and index it.
    ///
    /// Every file is validated before anything is written, so an unsupported
    /// file in the batch leaves both the store and the index untouched.
    ///
    /// * `uploads`: The received files.
    pub async fn upload(&self, uploads: Vec<DocumentUpload>) -> Result<IngestReport, DocqaError> {
        if uploads.is_empty() {
            return err!(NoSelectedFiles);
        }

        let typed = uploads
            .into_iter()
            .map(|upload| Ok((DocumentType::try_from_file_name(&upload.name)?, upload)))
            .collect::<Result<Vec<_>, DocqaError>>()?;

        let mut documents = Vec::with_capacity(typed.len());

        for (ty, DocumentUpload { name, file }) in typed {
            let stored = self.store.write(&name, &file).await?;
            debug!("Stored '{name}' at {} ({})", stored.path.display(), stored.hash);

            let content = parse_blocking(ty, file).await?;
            documents.push(Document::new(content, name));
        }

        self.ingest(documents).await
    }

    /// Load the given URLs and index their contents.
    /// Every URL must be syntactically valid before any is fetched.
    ///
    /// * `urls`: Locations to load.
    pub async fn ingest_urls(&self, urls: &[String]) -> Result<IngestReport, DocqaError> {
        if urls.is_empty() {
            return err!(MissingUrl);
        }

        for url in urls {
            let source = UrlSource { url: url.clone() };
            map_err!(source.validate());
        }

        let documents = self.loader.load(urls).await?;
        self.ingest(documents).await
    }

    /// Chunk, embed and merge the documents into the index.
    ///
    /// * `documents`: Documents with already extracted text.
    pub async fn ingest(&self, documents: Vec<Document>) -> Result<IngestReport, DocqaError> {
        let mut seen = HashSet::new();
        let mut pending = vec![];

        for document in documents.iter() {
            let chunks = map_err!(self.chunker.chunk(&document.content));

            for chunk in chunks {
                let id = sha256(chunk.as_bytes());
                if seen.insert(id.clone()) {
                    pending.push((id, chunk, document.source.as_str()));
                }
            }
        }

        if pending.is_empty() {
            return err!(
                EmptyDocument,
                "no text could be extracted from {} document(s)",
                documents.len()
            );
        }

        let content = pending.iter().map(|(_, chunk, _)| *chunk).collect::<Vec<_>>();
        let chunk_count = content.len();

        let vectors = self
            .embedder
            .embed(&content, EmbeddingTask::Document)
            .await?;

        if vectors.len() != chunk_count {
            return err!(
                MalformedResponse,
                "{} returned {} embeddings for {} chunks",
                self.embedder.id(),
                vectors.len(),
                chunk_count
            );
        }

        let entries = pending
            .into_iter()
            .zip(vectors)
            .map(|((id, content, source), vector)| IndexEntry {
                id,
                content: content.to_string(),
                source: source.to_string(),
                vector,
            })
            .collect();

        let inserted = self.index.insert(self.embedder.model(), entries).await?;

        info!(
            "Ingested {} document(s), {chunk_count} chunk(s), {inserted} new in '{}'",
            documents.len(),
            self.index.id()
        );

        Ok(IngestReport {
            documents: documents.len(),
            chunks: chunk_count,
            inserted,
        })
    }
}
