//! Vector index implementations.

pub mod local;
