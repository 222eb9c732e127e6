use crate::core::chunk::ChunkerError;
use std::error::Error as _;
use thiserror::Error;
use tracing::error;
use validify::ValidationErrors;

pub mod http;

#[derive(Debug, Error)]
pub enum DocqaErr {
    #[error("No file part")]
    NoFilePart,

    #[error("No selected files")]
    NoSelectedFiles,

    #[error("No search query provided")]
    MissingQuery,

    #[error("No URL provided")]
    MissingUrl,

    #[error("No vector index found; ingest documents first")]
    IndexMissing,

    #[error("Incompatible index; {0}")]
    IncompatibleIndex(String),

    #[error("Malformed request body; {0}")]
    MalformedBody(String),

    #[error("Invalid file name; {0}")]
    InvalidFileName(String),

    #[error("Unsupported file type; {0}")]
    UnsupportedFileType(String),

    #[error("Empty document; {0}")]
    EmptyDocument(String),

    #[error("Invalid provider; {0}")]
    InvalidProvider(String),

    #[error("Configuration; {0}")]
    Config(String),

    #[error("Upstream responded with {status}; {message}")]
    Upstream { status: u16, message: String },

    #[error("Malformed upstream response; {0}")]
    MalformedResponse(String),

    #[error("Corrupt index; {0}")]
    CorruptIndex(String),

    #[error("IO; {0}")]
    IO(#[from] std::io::Error),

    #[error("JSON error; {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("chunker: {0}")]
    Chunker(#[from] ChunkerError),

    #[error("Parse pdf; {0}")]
    ParsePdf(#[from] pdfium_render::prelude::PdfiumError),

    #[error("Validation; {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Http client; {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Multipart; {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("Blocking task; {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl DocqaErr {
    /// Whether retrying the same call can succeed without the caller changing anything.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Upstream { status, .. } => *status == 429 || *status >= 500,
            Self::Reqwest(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status()
                        .is_some_and(|s| s.as_u16() == 429 || s.is_server_error())
            }
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
#[error("{error}")]
pub struct DocqaError {
    file: &'static str,
    line: u32,
    column: u32,
    pub error: DocqaErr,
}

impl DocqaError {
    pub fn new(file: &'static str, line: u32, column: u32, error: DocqaErr) -> DocqaError {
        DocqaError {
            file,
            line,
            column,
            error,
        }
    }

    /// Construct an error for a non-success response of a remote service.
    #[track_caller]
    pub fn upstream(status: u16, message: impl Into<String>) -> DocqaError {
        let location = std::panic::Location::caller();
        DocqaError::new(
            location.file(),
            location.line(),
            location.column(),
            DocqaErr::Upstream {
                status,
                message: message.into(),
            },
        )
    }

    pub fn is_transient(&self) -> bool {
        self.error.is_transient()
    }

    pub fn location(&self) -> String {
        format!("{}:{}:{}", self.file, self.line, self.column)
    }

    pub fn print(&self) {
        let location = self.location();

        error!("{location} | {self}");

        if self.error.source().is_some() {
            error!("Causes:");
        }

        let mut src = self.error.source();
        while let Some(source) = src {
            error!(" - {source}");
            src = source.source();
        }
    }
}

#[macro_export]
macro_rules! err {
    ($ty:ident $(, $l:literal $(,)? $($args:expr),* )?) => {
        Err($crate::error::DocqaError::new(
            file!(),
            line!(),
            column!(),
            $crate::error::DocqaErr::$ty $( (format!($l, $( $args, )*)) )?,
        ))
    };
}

#[macro_export]
macro_rules! map_err {
    ($ex:expr) => {
        $ex.map_err(|e| $crate::error::DocqaError::new(file!(), line!(), column!(), e.into()))?
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing() -> Result<(), DocqaError> {
        err!(IndexMissing)
    }

    fn unsupported(ext: &str) -> Result<(), DocqaError> {
        err!(UnsupportedFileType, "extension '{ext}'")
    }

    #[test]
    fn err_macro_records_location() {
        let error = missing().unwrap_err();
        assert!(matches!(error.error, DocqaErr::IndexMissing));
        assert!(error.location().starts_with(file!()));
    }

    #[test]
    fn err_macro_formats_message() {
        let error = unsupported("exe").unwrap_err();
        assert_eq!("Unsupported file type; extension 'exe'", error.to_string());
    }

    #[test]
    fn upstream_classification() {
        assert!(DocqaError::upstream(429, "slow down").is_transient());
        assert!(DocqaError::upstream(503, "unavailable").is_transient());
        assert!(!DocqaError::upstream(400, "bad key").is_transient());
        assert!(!DocqaError::upstream(404, "gone").is_transient());
    }

    #[test]
    fn input_errors_are_fatal() {
        assert!(!DocqaErr::MissingQuery.is_transient());
        assert!(!DocqaErr::IndexMissing.is_transient());
        assert!(!DocqaErr::MalformedResponse("no candidates".to_string()).is_transient());
    }
}
