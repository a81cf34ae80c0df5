//! # folio-transfer
//!
//! Streaming file transfer for folio: a length-prefixed, bincode-framed
//! protocol over TCP that moves file content in fixed 4 KiB chunks.
//!
//! ## Example
//!
//! ```rust,ignore
//! use folio_transfer::TransferClient;
//!
//! let client = TransferClient::new("127.0.0.1:5001");
//! let ack = client.upload("report.pdf", tokio::fs::File::open("report.pdf").await?).await?;
//! assert_eq!(ack.message, "Upload complete");
//! ```

mod chunk;
pub mod client;
pub mod codec;
pub mod messages;
pub mod server;

pub use client::{DownloadStream, TransferClient};
pub use codec::{ClientCodec, MessageCodec, ServerCodec};
pub use messages::{
    ClientMessage, FailureKind, FileChunk, FileRequest, ServerMessage, TransferFailure,
    UploadResponse,
};
pub use server::TransferServer;
