//! Frame codec for the transfer protocol.
//!
//! Each message is bincode-encoded and wrapped in a 4-byte big-endian length
//! prefix. Frames above [`MAX_FRAME_BYTES`] are rejected on both ends.

use std::fmt;
use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use folio_core::defaults::MAX_FRAME_BYTES;
use folio_core::Error;

use crate::messages::{ClientMessage, ServerMessage};

/// Codec decoding `In` frames and encoding `Out` frames.
pub struct MessageCodec<In, Out> {
    inner: LengthDelimitedCodec,
    _marker: PhantomData<fn(Out) -> In>,
}

/// Codec used by the server side of a connection.
pub type ServerCodec = MessageCodec<ClientMessage, ServerMessage>;

/// Codec used by the client side of a connection.
pub type ClientCodec = MessageCodec<ServerMessage, ClientMessage>;

impl<In, Out> MessageCodec<In, Out> {
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_BYTES)
    }

    /// Create a codec with custom max frame size
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            inner: LengthDelimitedCodec::builder()
                .max_frame_length(max_frame_size)
                .new_codec(),
            _marker: PhantomData,
        }
    }
}

impl<In, Out> Default for MessageCodec<In, Out> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In, Out> fmt::Debug for MessageCodec<In, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageCodec")
            .field("max_frame_length", &self.inner.max_frame_length())
            .finish()
    }
}

impl<In: DeserializeOwned, Out> Decoder for MessageCodec<In, Out> {
    type Item = In;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.inner.decode(src)? {
            Some(frame) => bincode::deserialize(&frame)
                .map(Some)
                .map_err(|e| Error::Protocol(format!("malformed frame: {}", e))),
            None => Ok(None), // Need more data
        }
    }
}

impl<In, Out: Serialize> Encoder<Out> for MessageCodec<In, Out> {
    type Error = Error;

    fn encode(&mut self, item: Out, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = bincode::serialize(&item)
            .map_err(|e| Error::Protocol(format!("cannot encode frame: {}", e)))?;
        self.inner.encode(Bytes::from(payload), dst)?;
        Ok(())
    }
}
