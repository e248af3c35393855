//! Shared domain types, the error taxonomy, and media-assembly helpers.

pub mod assembly;
pub mod error;
pub mod types;
