/// Turning documents into index entries.
pub mod ingest;

/// Answering questions from the index.
pub mod query;
