//! Chunking shared by both ends of a transfer.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

/// Read until `buf` is full or the reader is exhausted.
///
/// Short reads from the underlying source are coalesced, so every chunk but
/// the last is exactly `buf.len()` bytes.
pub(crate) async fn fill_chunk<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
