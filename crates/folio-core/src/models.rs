//! Core data models for folio.
//!
//! [`Metadata`] is the persisted projection of every document variant. Its
//! serialized form (PascalCase JSON) is both the stored record value and the
//! wire shape returned to clients.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Descriptive record for a stored document.
///
/// `id` is assigned once at creation and never regenerated. `path` stays
/// empty until a file is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Metadata {
    #[serde(default, alias = "title")]
    pub title: String,
    #[serde(default, alias = "author")]
    pub author: String,
    #[serde(default, alias = "publishDate")]
    pub publish_date: String,
    #[serde(default, alias = "lastUpdated")]
    pub last_updated: String,
    #[serde(default, alias = "fileType")]
    pub file_type: String,
    #[serde(default, alias = "docType")]
    pub doc_type: String,
    #[serde(default, alias = "path")]
    pub path: String,
    #[serde(
        rename = "Uuid",
        alias = "uuid",
        alias = "id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Uuid>,
}

/// Searchable field names, in declaration order.
///
/// Every field is string-typed on the wire, so every name here can match.
pub const METADATA_FIELDS: &[&str] = &[
    "Title",
    "Author",
    "PublishDate",
    "LastUpdated",
    "FileType",
    "DocType",
    "Path",
    "Uuid",
];

impl Metadata {
    /// Create metadata for a new document of the given type with a fresh id.
    pub fn new(doc_type: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            id: Some(Uuid::new_v4()),
            ..Default::default()
        }
    }

    /// Look up a field by its exact (case-sensitive) wire name.
    ///
    /// Returns `None` for unknown names and for an unassigned `Uuid`.
    pub fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let value = match name {
            "Title" => &self.title,
            "Author" => &self.author,
            "PublishDate" => &self.publish_date,
            "LastUpdated" => &self.last_updated,
            "FileType" => &self.file_type,
            "DocType" => &self.doc_type,
            "Path" => &self.path,
            "Uuid" => return self.id.map(|id| Cow::Owned(id.to_string())),
            _ => return None,
        };
        Some(Cow::Borrowed(value.as_str()))
    }

    /// Overwrite string fields present in a decoded payload.
    ///
    /// `Uuid` and `DocType` are never taken from a payload: the id is assigned
    /// by the caller and the type is fixed by the factory.
    pub fn merge_from(&mut self, payload: &Map<String, JsonValue>) -> Result<()> {
        let slots: [(&str, &str, &mut String); 6] = [
            ("Title", "title", &mut self.title),
            ("Author", "author", &mut self.author),
            ("PublishDate", "publishDate", &mut self.publish_date),
            ("LastUpdated", "lastUpdated", &mut self.last_updated),
            ("FileType", "fileType", &mut self.file_type),
            ("Path", "path", &mut self.path),
        ];
        for (pascal, camel, slot) in slots {
            let Some(value) = payload.get(pascal).or_else(|| payload.get(camel)) else {
                continue;
            };
            *slot = match value {
                JsonValue::String(s) => s.clone(),
                JsonValue::Null => String::new(),
                other => {
                    return Err(Error::Validation(format!(
                        "field {} must be a string, got {}",
                        pascal,
                        json_type_name(other)
                    )))
                }
            };
        }
        Ok(())
    }

    /// Stamp `LastUpdated` with the current time (RFC 3339, UTC).
    pub fn touch(&mut self) {
        self.last_updated = chrono::Utc::now().to_rfc3339();
    }

    /// Serialize to the stored record value.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize a stored record value.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Human-readable JSON type name for validation messages.
pub fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
