//! Wire messages exchanged on a transfer connection.
//!
//! A connection carries one operation at a time. An upload is a run of
//! [`ClientMessage::Upload`] frames (the first naming the target file)
//! closed by [`ClientMessage::UploadDone`], answered by a single
//! [`ServerMessage::UploadComplete`] or [`ServerMessage::Failed`]. A download
//! is one [`ClientMessage::Download`] answered by zero or more
//! [`ServerMessage::Chunk`] frames and a closing [`ServerMessage::DownloadDone`].

use serde::{Deserialize, Serialize};

use folio_core::Error;

/// Message sent upstream, client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    Upload(FileChunk),
    UploadDone,
    Download(FileRequest),
}

/// Message sent downstream, server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    Chunk(FileChunk),
    DownloadDone,
    UploadComplete(UploadResponse),
    Failed(TransferFailure),
}

/// A piece of file content. Only the first upload chunk needs a filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChunk {
    pub filename: Option<String>,
    pub data: Vec<u8>,
}

impl FileChunk {
    pub fn named(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: Some(filename.into()),
            data,
        }
    }

    pub fn data(data: Vec<u8>) -> Self {
        Self {
            filename: None,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRequest {
    pub filename: String,
}

/// Acknowledgement of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub bytes_written: u64,
}

impl UploadResponse {
    pub fn complete(bytes_written: u64) -> Self {
        Self {
            message: "Upload complete".to_string(),
            bytes_written,
        }
    }
}

/// Classification of a failed operation, carried over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    NotFound,
    Validation,
    Io,
    Protocol,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TransferFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&Error> for TransferFailure {
    fn from(err: &Error) -> Self {
        let (kind, message) = match err {
            Error::NotFound(m) => (FailureKind::NotFound, m.clone()),
            Error::Validation(m) => (FailureKind::Validation, m.clone()),
            Error::Io(e) => (FailureKind::Io, e.to_string()),
            Error::Protocol(m) => (FailureKind::Protocol, m.clone()),
            other => (FailureKind::Internal, other.to_string()),
        };
        Self { kind, message }
    }
}

impl From<TransferFailure> for Error {
    fn from(failure: TransferFailure) -> Self {
        match failure.kind {
            FailureKind::NotFound => Error::NotFound(failure.message),
            FailureKind::Validation => Error::Validation(failure.message),
            FailureKind::Io => Error::Io(std::io::Error::other(failure.message)),
            FailureKind::Protocol => Error::Protocol(failure.message),
            FailureKind::Internal => Error::Internal(failure.message),
        }
    }
}
