//! HTTP handlers for folio-api.

pub mod convert;
pub mod documents;
pub mod files;
pub mod health;

use uuid::Uuid;

use crate::ApiError;

/// Parse a path or body uuid, reporting the offending text on failure.
pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(format!("Invalid UUID: {}", raw)))
}
