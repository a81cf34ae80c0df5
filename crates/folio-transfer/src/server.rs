//! Transfer protocol server.
//!
//! Uploads are bridged into the file store through a bounded channel: the
//! receive loop pushes chunks while a writer task drains them into
//! [`FileStore::save_file`]. An upload that ends without `UploadDone` is
//! treated as aborted and its partial file is discarded.

use std::future::Future;
use std::io;
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::codec::Framed;
use tokio_util::io::StreamReader;
use tracing::{debug, error, info, warn};

use folio_core::defaults::{TRANSFER_CHUNK_SIZE, UPLOAD_CHANNEL_CAPACITY};
use folio_core::{validate_storage_path, Error, FileStore, Result};

use crate::chunk::fill_chunk;
use crate::codec::ServerCodec;
use crate::messages::{
    ClientMessage, FailureKind, FileChunk, FileRequest, ServerMessage, TransferFailure,
    UploadResponse,
};

type ServerFramed = Framed<TcpStream, ServerCodec>;

/// How the upstream side of an upload ended.
enum UploadEnd {
    Done,
    Aborted(String),
    WriterStopped,
}

/// Transfer protocol server.
pub struct TransferServer {
    files: Arc<dyn FileStore>,
}

impl TransferServer {
    pub fn new(files: Arc<dyn FileStore>) -> Self {
        Self { files }
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Each connection is served on its own task. In-flight connections are
    /// not awaited on shutdown.
    pub async fn run<F>(self: Arc<Self>, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let local = listener.local_addr()?;
        info!(
            subsystem = "transfer",
            component = "server",
            addr = %local,
            "Transfer server listening"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(subsystem = "transfer", component = "server", "Transfer server shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        debug!(subsystem = "transfer", peer = %peer, "New transfer connection");
                        let server = Arc::clone(&self);
                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(socket).await {
                                warn!(subsystem = "transfer", peer = %peer, error = %e, "Transfer connection error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(subsystem = "transfer", error = %e, "Accept error");
                    }
                }
            }
        }
    }

    /// Serve operations on one connection until the client hangs up.
    pub async fn handle_connection(&self, socket: TcpStream) -> Result<()> {
        let mut framed = Framed::new(socket, ServerCodec::new());

        while let Some(frame) = framed.next().await {
            match frame? {
                ClientMessage::Upload(first) => {
                    if !self.handle_upload(&mut framed, first).await? {
                        break;
                    }
                }
                ClientMessage::Download(request) => self.handle_download(&mut framed, request).await?,
                ClientMessage::UploadDone => {
                    send_failure(
                        &mut framed,
                        &Error::Validation("no file data received".to_string()),
                    )
                    .await?;
                }
            }
        }

        debug!(subsystem = "transfer", "Transfer connection closed");
        Ok(())
    }

    /// Receive one upload. Returns `false` when the connection must close.
    async fn handle_upload(&self, framed: &mut ServerFramed, first: FileChunk) -> Result<bool> {
        let filename = match first.filename.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                send_failure(
                    framed,
                    &Error::Validation("first upload chunk must carry a filename".to_string()),
                )
                .await?;
                return Ok(drain_upload(framed).await);
            }
        };
        if let Err(e) = validate_storage_path(&filename) {
            send_failure(framed, &e).await?;
            return Ok(drain_upload(framed).await);
        }

        let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(UPLOAD_CHANNEL_CAPACITY);
        let files = Arc::clone(&self.files);
        let target = filename.clone();
        let writer = tokio::spawn(async move {
            let mut reader = StreamReader::new(ReceiverStream::new(rx));
            files.save_file(&target, &mut reader).await
        });

        let mut chunks = 1usize;
        let end = if tx.send(Ok(Bytes::from(first.data))).await.is_err() {
            UploadEnd::WriterStopped
        } else {
            loop {
                match framed.next().await {
                    Some(Ok(ClientMessage::Upload(chunk))) => {
                        chunks += 1;
                        if tx.send(Ok(Bytes::from(chunk.data))).await.is_err() {
                            break UploadEnd::WriterStopped;
                        }
                    }
                    Some(Ok(ClientMessage::UploadDone)) => break UploadEnd::Done,
                    Some(Ok(ClientMessage::Download(_))) => {
                        break UploadEnd::Aborted("download requested mid-upload".to_string())
                    }
                    Some(Err(e)) => break UploadEnd::Aborted(e.to_string()),
                    None => {
                        break UploadEnd::Aborted(
                            "connection closed before upload completed".to_string(),
                        )
                    }
                }
            }
        };

        if let UploadEnd::Aborted(reason) = &end {
            let _ = tx
                .send(Err(io::Error::new(
                    io::ErrorKind::ConnectionAborted,
                    reason.clone(),
                )))
                .await;
        }
        drop(tx);

        let written = match writer.await {
            Ok(result) => result,
            Err(e) => Err(Error::Internal(format!("upload writer task failed: {}", e))),
        };

        match (end, written) {
            (UploadEnd::Done, Ok(bytes_written)) => {
                info!(
                    subsystem = "transfer",
                    op = "upload",
                    filename = %filename,
                    chunks = chunks,
                    bytes_written = bytes_written,
                    "Upload complete"
                );
                framed
                    .send(ServerMessage::UploadComplete(UploadResponse::complete(
                        bytes_written,
                    )))
                    .await?;
                Ok(true)
            }
            (UploadEnd::Aborted(reason), _) => {
                warn!(
                    subsystem = "transfer",
                    op = "upload",
                    filename = %filename,
                    chunks = chunks,
                    reason = %reason,
                    "Upload aborted, partial file discarded"
                );
                Ok(false)
            }
            (UploadEnd::Done, Err(e)) => {
                error!(
                    subsystem = "transfer",
                    op = "upload",
                    filename = %filename,
                    error = %e,
                    "Upload write failed"
                );
                send_failure(framed, &e).await?;
                Ok(true)
            }
            (UploadEnd::WriterStopped, result) => {
                let e = result
                    .err()
                    .unwrap_or_else(|| Error::Internal("upload writer stopped early".to_string()));
                error!(
                    subsystem = "transfer",
                    op = "upload",
                    filename = %filename,
                    error = %e,
                    "Upload write failed"
                );
                send_failure(framed, &e).await?;
                Ok(drain_upload(framed).await)
            }
        }
    }

    async fn handle_download(&self, framed: &mut ServerFramed, request: FileRequest) -> Result<()> {
        let filename = request.filename;
        if let Err(e) = validate_storage_path(&filename) {
            return send_failure(framed, &e).await;
        }

        let mut reader = match self.files.get_file(&filename).await {
            Ok(reader) => reader,
            Err(e) => {
                debug!(subsystem = "transfer", op = "download", filename = %filename, error = %e, "Download refused");
                return send_failure(framed, &e).await;
            }
        };

        let mut buf = vec![0u8; TRANSFER_CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            let n = match fill_chunk(&mut reader, &mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    error!(subsystem = "transfer", op = "download", filename = %filename, error = %e, "Read failed mid-download");
                    return send_failure(framed, &Error::Io(e)).await;
                }
            };
            total += n as u64;
            framed
                .send(ServerMessage::Chunk(FileChunk::data(buf[..n].to_vec())))
                .await?;
        }
        framed.send(ServerMessage::DownloadDone).await?;

        info!(
            subsystem = "transfer",
            op = "download",
            filename = %filename,
            bytes = total,
            "Download complete"
        );
        Ok(())
    }
}

/// Skip the rest of a refused upload. Returns `false` if the connection ended
/// before `UploadDone`.
async fn drain_upload(framed: &mut ServerFramed) -> bool {
    loop {
        match framed.next().await {
            Some(Ok(ClientMessage::Upload(_))) => continue,
            Some(Ok(ClientMessage::UploadDone)) => return true,
            _ => return false,
        }
    }
}

async fn send_failure(framed: &mut ServerFramed, err: &Error) -> Result<()> {
    let failure = TransferFailure::from(err);
    if failure.kind == FailureKind::Internal {
        error!(subsystem = "transfer", error = %err, "Reporting internal failure to client");
    }
    framed.send(ServerMessage::Failed(failure)).await
}
