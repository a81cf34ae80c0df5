//! Polymorphic document model and the type factory.
//!
//! Every variant owns exactly one [`Metadata`] value, which is what the store
//! persists. The [`DocumentFactory`] maps a wire-level type tag (`DocType`) to
//! a constructor so request payloads can be decoded into the right variant at
//! request time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{json_type_name, Metadata};

/// Capability contract every document variant satisfies.
pub trait Document: fmt::Debug + Send + Sync {
    /// Type tag this variant is registered under.
    fn doc_type(&self) -> &str;

    fn title(&self) -> &str;

    fn set_title(&mut self, title: String) -> Result<()>;

    fn metadata(&self) -> &Metadata;

    fn set_metadata(&mut self, metadata: Metadata) -> Result<()>;

    /// Unique id, derived from the owned metadata.
    fn id(&self) -> Option<Uuid> {
        self.metadata().id
    }

    /// Merge a decoded wire payload into this instance.
    ///
    /// Implementations must leave the metadata id and type untouched.
    fn merge_payload(&mut self, payload: &Map<String, JsonValue>) -> Result<()>;

    /// Generic structured representation of the whole document.
    fn to_value(&self) -> Result<JsonValue>;
}

// =============================================================================
// NOTES
// =============================================================================

/// Plain-text note; the reference variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Notes {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub content: String,
}

impl Notes {
    pub const TYPE: &'static str = "Notes";

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Set content from a wire value. Only strings are accepted.
    pub fn set_content(&mut self, content: &JsonValue) -> Result<()> {
        match content {
            JsonValue::String(s) => {
                self.content = s.clone();
                Ok(())
            }
            other => Err(Error::Validation(format!(
                "error setting content, expected string but got {}",
                json_type_name(other)
            ))),
        }
    }
}

impl Document for Notes {
    fn doc_type(&self) -> &str {
        Self::TYPE
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn set_title(&mut self, title: String) -> Result<()> {
        self.title = title;
        Ok(())
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn set_metadata(&mut self, metadata: Metadata) -> Result<()> {
        self.metadata = metadata;
        Ok(())
    }

    fn merge_payload(&mut self, payload: &Map<String, JsonValue>) -> Result<()> {
        self.metadata.merge_from(payload)?;

        if let Some(nested) = payload.get("Metadata") {
            let nested = nested.as_object().ok_or_else(|| {
                Error::Validation(format!(
                    "field Metadata must be an object, got {}",
                    json_type_name(nested)
                ))
            })?;
            self.metadata.merge_from(nested)?;
        }

        if payload.contains_key("Title") || payload.contains_key("title") {
            self.title = self.metadata.title.clone();
        }

        if let Some(content) = payload.get("Content").or_else(|| payload.get("content")) {
            self.set_content(content)?;
        }

        Ok(())
    }

    fn to_value(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }
}

// =============================================================================
// FACTORY
// =============================================================================

/// Constructor producing a fresh, empty document variant.
pub type DocumentConstructor = Arc<dyn Fn() -> Box<dyn Document> + Send + Sync>;

/// Registry mapping type tags to document constructors.
///
/// Populated once at startup and shared read-only (behind `Arc`) afterwards.
#[derive(Clone, Default)]
pub struct DocumentFactory {
    registry: HashMap<String, DocumentConstructor>,
}

impl DocumentFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory with the built-in variants registered.
    pub fn with_builtin_types() -> Self {
        let mut factory = Self::new();
        factory.register_type(Notes::TYPE, || Box::new(Notes::default()));
        factory
    }

    /// Register a constructor. Replaces any existing one for the same tag.
    pub fn register_type<F>(&mut self, tag: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn Document> + Send + Sync + 'static,
    {
        let tag = tag.into();
        debug!(doc_type = %tag, "document_factory: register_type");
        self.registry.insert(tag, Arc::new(constructor));
    }

    /// Instantiate a fresh document of the given type.
    pub fn new_document(&self, tag: &str) -> Result<Box<dyn Document>> {
        let constructor = self
            .registry
            .get(tag)
            .ok_or_else(|| Error::UnknownDocumentType(tag.to_string()))?;
        Ok(constructor())
    }

    /// Check if a constructor is registered for the tag.
    pub fn is_registered(&self, tag: &str) -> bool {
        self.registry.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn registered_types(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.registry.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Decode an untyped payload into the variant its `DocType` selects.
    ///
    /// The constructor is chosen before the rest of the payload is merged, and
    /// the resulting metadata carries the requested type tag. The id is left
    /// as the constructor produced it (normally unassigned).
    pub fn decode(&self, payload: &JsonValue) -> Result<Box<dyn Document>> {
        let map = payload.as_object().ok_or_else(|| {
            Error::Validation(format!(
                "payload must be a JSON object, got {}",
                json_type_name(payload)
            ))
        })?;

        let doc_type = doc_type_of(map)?;
        let mut doc = self.new_document(doc_type)?;

        let mut metadata = doc.metadata().clone();
        metadata.doc_type = doc_type.to_string();
        doc.set_metadata(metadata)?;

        doc.merge_payload(map)?;
        Ok(doc)
    }
}

impl fmt::Debug for DocumentFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentFactory")
            .field("types", &self.registered_types())
            .finish()
    }
}

/// Extract the non-empty `DocType` (or `docType`) tag from a payload.
pub fn doc_type_of(payload: &Map<String, JsonValue>) -> Result<&str> {
    match payload.get("DocType").or_else(|| payload.get("docType")) {
        Some(JsonValue::String(tag)) if !tag.is_empty() => Ok(tag),
        _ => Err(Error::Validation(
            "missing or invalid document type".to_string(),
        )),
    }
}
