use crate::{
    core::document::store::{sanitize_file_name, sha256, DocumentStore, StoredFile},
    error::DocqaError,
    map_err,
};
use std::path::PathBuf;
use tracing::debug;

/// Simple FS based implementation of a [DocumentStore](crate::core::document::store::DocumentStore).
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    /// The base directory to store the documents in.
    base: PathBuf,
}

impl FsDocumentStore {
    /// Create the store, creating `path` if it does not exist.
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self, DocqaError> {
        let base = path.into();
        map_err!(tokio::fs::create_dir_all(&base).await);
        Ok(Self { base })
    }
}

#[async_trait::async_trait]
impl DocumentStore for FsDocumentStore {
    fn id(&self) -> &'static str {
        "fs"
    }

    async fn write(&self, name: &str, file: &[u8]) -> Result<StoredFile, DocqaError> {
        let path = self.base.join(sanitize_file_name(name)?);
        debug!("Writing {}", path.display());

        let hash = sha256(file);
        map_err!(tokio::fs::write(&path, file).await);

        Ok(StoredFile { path, hash })
    }
}

#[cfg(test)]
mod tests {
    use super::{DocumentStore, FsDocumentStore};
    use crate::{core::document::store::sha256, error::DocqaErr};

    const CONTENT: &str = "Hello world.";

    #[tokio::test]
    async fn works() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("uploads");

        let store = FsDocumentStore::new(&base).await.unwrap();
        assert!(base.is_dir());

        let stored = store.write("foo.txt", CONTENT.as_bytes()).await.unwrap();
        assert_eq!(base.join("foo.txt"), stored.path);
        assert_eq!(sha256(CONTENT.as_bytes()), stored.hash);

        let file = tokio::fs::read_to_string(&stored.path).await.unwrap();
        assert_eq!(CONTENT, file);
    }

    #[tokio::test]
    async fn overwrites_and_stays_in_base() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path()).await.unwrap();

        store.write("doc.txt", b"first").await.unwrap();
        let stored = store.write("../../doc.txt", b"second").await.unwrap();

        assert_eq!(dir.path().join("doc.txt"), stored.path);
        let file = tokio::fs::read_to_string(&stored.path).await.unwrap();
        assert_eq!("second", file);
    }

    #[tokio::test]
    async fn rejects_empty_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path()).await.unwrap();

        let error = store.write("..", b"nothing").await.unwrap_err();
        assert!(matches!(error.error, DocqaErr::InvalidFileName(_)));
    }
}
