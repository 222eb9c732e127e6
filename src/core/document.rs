/// Fetching documents from remote locations.
pub mod loader;

/// Extracting text from document bytes.
pub mod parser;

/// Keeping raw uploads around.
pub mod store;
