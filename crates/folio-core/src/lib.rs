//! # folio-core
//!
//! Core types, traits, and abstractions for folio.
//!
//! This crate provides the document model, the type factory, search and
//! pagination helpers, and the storage traits the other folio crates build on.

pub mod defaults;
pub mod document;
pub mod error;
pub mod models;
pub mod search;
pub mod traits;

// Re-export commonly used types at crate root
pub use document::{doc_type_of, Document, DocumentConstructor, DocumentFactory, Notes};
pub use error::{Error, Result};
pub use models::*;
pub use search::*;
pub use traits::*;
