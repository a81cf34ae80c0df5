//! Error types for folio.

use thiserror::Error;

/// Result type alias using folio's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for folio operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Store could not be opened, or an operation ran against a closed store
    #[error("Connection error: {0}")]
    Connection(String),

    /// Resource not found (document, collection, or file)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller supplied something malformed (id, pagination bounds, payload)
    #[error("Validation error: {0}")]
    Validation(String),

    /// No constructor registered for the requested document type
    #[error("Unknown document type: {0}")]
    UnknownDocumentType(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Store-level failure that is not a driver error (e.g. missing collection)
    #[error("Store error: {0}")]
    Store(String),

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed or unexpected frame on the transfer protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors caused by the caller rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::UnknownDocumentType(_) | Error::NotFound(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<uuid::Error> for Error {
    fn from(e: uuid::Error) -> Self {
        Error::Validation(format!("invalid uuid: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("document".to_string());
        assert_eq!(err.to_string(), "Not found: document");
    }

    #[test]
    fn test_error_display_unknown_document_type() {
        let err = Error::UnknownDocumentType("Spreadsheet".to_string());
        assert_eq!(err.to_string(), "Unknown document type: Spreadsheet");
    }

    #[test]
    fn test_error_display_store() {
        let err = Error::Store("documents collection does not exist".to_string());
        assert_eq!(
            err.to_string(),
            "Store error: documents collection does not exist"
        );
    }

    #[test]
    fn test_error_display_connection() {
        let err = Error::Connection("store is not connected".to_string());
        assert_eq!(err.to_string(), "Connection error: store is not connected");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_uuid_error_is_validation() {
        let uuid_err = uuid::Uuid::parse_str("not-a-uuid").unwrap_err();
        let err: Error = uuid_err.into();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("invalid uuid"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::Validation("x".into()).is_client_error());
        assert!(Error::UnknownDocumentType("x".into()).is_client_error());
        assert!(Error::NotFound("x".into()).is_client_error());
        assert!(!Error::Store("x".into()).is_client_error());
        assert!(!Error::Internal("x".into()).is_client_error());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
