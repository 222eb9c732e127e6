use crate::{err, error::DocqaError};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// A file written to a document store.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub path: PathBuf,

    /// Hex encoded SHA-256 of the file contents.
    pub hash: String,
}

/// Keeps the raw bytes of uploaded documents.
#[async_trait::async_trait]
pub trait DocumentStore {
    fn id(&self) -> &'static str;

    /// Write the file, replacing any previous file of the same name.
    ///
    /// * `name`: The name of the file as received from the client.
    /// * `file`: The file contents.
    async fn write(&self, name: &str, file: &[u8]) -> Result<StoredFile, DocqaError>;
}

pub fn sha256(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

/// Reduce a client supplied name to a plain file name that cannot
/// escape the store's directory.
pub fn sanitize_file_name(name: &str) -> Result<String, DocqaError> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let sanitized = base
        .trim_start_matches('.')
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();

    if sanitized.is_empty() {
        return err!(InvalidFileName, "'{name}'");
    }

    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_hex_encoded() {
        assert_eq!(
            "a591a6d40bf420404a011733cfb7b190d62c65bf0bcda32b57b277d9ad9f146e",
            sha256(b"Hello World")
        );
    }

    #[test]
    fn sanitizes_path_components() {
        assert_eq!("passwd", sanitize_file_name("../../etc/passwd").unwrap());
        assert_eq!("report.pdf", sanitize_file_name("C:\\docs\\report.pdf").unwrap());
        assert_eq!("bashrc", sanitize_file_name(".bashrc").unwrap());
        assert_eq!("my_file_1_.pdf", sanitize_file_name("my file(1).pdf").unwrap());
    }

    #[test]
    fn rejects_names_without_content() {
        assert!(sanitize_file_name("").is_err());
        assert!(sanitize_file_name("..").is_err());
        assert!(sanitize_file_name("uploads/").is_err());
    }
}
