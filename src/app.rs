//! Module containing concrete implementations from the [core](crate::core) module.

pub mod document;
pub mod embedder;
pub mod llm;
pub mod loader;
pub mod remote;
pub mod server;
pub mod state;
pub mod vector;

#[cfg(test)]
pub mod test;
