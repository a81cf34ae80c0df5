//! Transfer protocol client.
//!
//! Each call opens its own connection, performs one operation, and closes it.

use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

use folio_core::defaults::TRANSFER_CHUNK_SIZE;
use folio_core::{Error, Result};

use crate::chunk::fill_chunk;
use crate::codec::ClientCodec;
use crate::messages::{ClientMessage, FileChunk, FileRequest, ServerMessage, UploadResponse};

type ClientFramed = Framed<TcpStream, ClientCodec>;

/// Stream of downloaded file content.
pub type DownloadStream = BoxStream<'static, Result<Bytes>>;

#[derive(Debug, Clone)]
pub struct TransferClient {
    addr: String,
}

impl TransferClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    async fn connect(&self) -> Result<ClientFramed> {
        let socket = TcpStream::connect(&self.addr).await.map_err(|e| {
            Error::Connection(format!("cannot reach transfer server {}: {}", self.addr, e))
        })?;
        Ok(Framed::new(socket, ClientCodec::new()))
    }

    /// Upload everything `reader` yields under `filename`.
    ///
    /// At least one chunk is always sent, so empty files are stored too.
    pub async fn upload<R>(&self, filename: &str, mut reader: R) -> Result<UploadResponse>
    where
        R: AsyncRead + Unpin,
    {
        let mut framed = self.connect().await?;
        let mut buf = vec![0u8; TRANSFER_CHUNK_SIZE];
        let mut first = true;
        let mut sent = 0u64;

        loop {
            let n = fill_chunk(&mut reader, &mut buf).await?;
            if n == 0 && !first {
                break;
            }
            let chunk = if first {
                FileChunk::named(filename, buf[..n].to_vec())
            } else {
                FileChunk::data(buf[..n].to_vec())
            };
            first = false;
            sent += n as u64;

            if let Err(e) = framed.send(ClientMessage::Upload(chunk)).await {
                // The server may have refused the upload and closed; prefer its reason.
                return Err(pending_failure(&mut framed).await.unwrap_or(e));
            }
            if n == 0 {
                break;
            }
        }

        if let Err(e) = framed.send(ClientMessage::UploadDone).await {
            return Err(pending_failure(&mut framed).await.unwrap_or(e));
        }
        debug!(subsystem = "transfer", op = "upload", filename = %filename, bytes = sent, "Upload sent, awaiting ack");

        match framed.next().await {
            Some(Ok(ServerMessage::UploadComplete(resp))) => Ok(resp),
            Some(Ok(ServerMessage::Failed(failure))) => Err(failure.into()),
            Some(Ok(other)) => Err(Error::Protocol(format!(
                "unexpected reply to upload: {:?}",
                other
            ))),
            Some(Err(e)) => Err(e),
            None => Err(Error::Protocol(
                "connection closed before upload was acknowledged".to_string(),
            )),
        }
    }

    /// Start downloading `filename`.
    ///
    /// The first reply is read before returning, so a missing file surfaces
    /// here as [`Error::NotFound`] rather than mid-stream.
    pub async fn download(&self, filename: &str) -> Result<DownloadStream> {
        let mut framed = self.connect().await?;
        framed
            .send(ClientMessage::Download(FileRequest {
                filename: filename.to_string(),
            }))
            .await?;

        let first = match framed.next().await {
            Some(Ok(ServerMessage::Chunk(chunk))) => Bytes::from(chunk.data),
            Some(Ok(ServerMessage::DownloadDone)) => return Ok(stream::empty().boxed()),
            Some(Ok(ServerMessage::Failed(failure))) => return Err(failure.into()),
            Some(Ok(other)) => {
                return Err(Error::Protocol(format!(
                    "unexpected reply to download: {:?}",
                    other
                )))
            }
            Some(Err(e)) => return Err(e),
            None => {
                return Err(Error::Protocol(
                    "connection closed before download started".to_string(),
                ))
            }
        };

        let rest = stream::unfold(Some(framed), |state| async move {
            let mut framed = state?;
            match framed.next().await {
                Some(Ok(ServerMessage::Chunk(chunk))) => {
                    Some((Ok(Bytes::from(chunk.data)), Some(framed)))
                }
                Some(Ok(ServerMessage::DownloadDone)) => None,
                Some(Ok(ServerMessage::Failed(failure))) => Some((Err(failure.into()), None)),
                Some(Ok(other)) => Some((
                    Err(Error::Protocol(format!(
                        "unexpected frame during download: {:?}",
                        other
                    ))),
                    None,
                )),
                Some(Err(e)) => Some((Err(e), None)),
                None => Some((
                    Err(Error::Protocol(
                        "connection closed before download completed".to_string(),
                    )),
                    None,
                )),
            }
        });

        Ok(stream::once(async move { Ok(first) }).chain(rest).boxed())
    }

    /// Download `filename` into `writer`, returning the byte count.
    pub async fn download_to<W>(&self, filename: &str, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut chunks = self.download(filename).await?;
        let mut total = 0u64;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            total += chunk.len() as u64;
        }
        writer.flush().await?;
        Ok(total)
    }
}

/// A failure the server already queued before closing, if any.
async fn pending_failure(framed: &mut ClientFramed) -> Option<Error> {
    match framed.next().await {
        Some(Ok(ServerMessage::Failed(failure))) => Some(failure.into()),
        _ => None,
    }
}
