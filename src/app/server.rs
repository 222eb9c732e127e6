//! HTTP surface of the application.

pub mod api;
pub mod dto;
pub mod router;
