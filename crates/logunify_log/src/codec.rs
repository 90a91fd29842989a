//! Record framing for files and sockets.
//!
//! Each record is a big-endian `u32` length followed by the postcard encoding
//! of the record. The decoder leaves the buffer untouched until a whole frame
//! is available, so any bytes left over at end of stream mean the stream was
//! cut mid-record.

use crate::record::{Record, RecordRef};
use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Length prefix size in bytes
const HEADER_LEN: usize = 4;

/// Largest accepted frame; anything larger is treated as corruption
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// Codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Underlying stream failed, or ended inside a frame
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Length prefix above [`MAX_FRAME_LEN`]
    #[error("Frame of {len} bytes exceeds limit of {limit}")]
    FrameTooLarge {
        /// Announced frame length
        len: usize,
        /// Configured limit
        limit: usize,
    },

    /// Frame payload is not a valid record
    #[error("Malformed record: {0}")]
    Malformed(#[source] postcard::Error),

    /// Record could not be serialized
    #[error("Encoding failed: {0}")]
    Encode(#[source] postcard::Error),
}

/// Length-prefixed postcard codec for [`Record`]s
#[derive(Debug, Clone, Copy)]
pub struct RecordCodec {
    max_frame_len: usize,
}

impl RecordCodec {
    /// Create a codec with the default frame limit
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_frame_len: MAX_FRAME_LEN,
        }
    }

    /// Override the frame limit
    #[must_use]
    pub const fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    fn check_len(&self, len: usize) -> Result<(), CodecError> {
        if len > self.max_frame_len {
            return Err(CodecError::FrameTooLarge {
                len,
                limit: self.max_frame_len,
            });
        }
        Ok(())
    }
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder<RecordRef<'_>> for RecordCodec {
    type Error = CodecError;

    fn encode(&mut self, item: RecordRef<'_>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = postcard::to_allocvec(&item).map_err(CodecError::Encode)?;
        self.check_len(payload.len())?;

        dst.reserve(HEADER_LEN + payload.len());
        dst.put_u32(payload.len() as u32);
        dst.extend_from_slice(&payload);
        Ok(())
    }
}

impl Decoder for RecordCodec {
    type Item = Record;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&src[..HEADER_LEN]);
        let len = u32::from_be_bytes(header) as usize;
        self.check_len(len)?;

        if src.len() < HEADER_LEN + len {
            src.reserve(HEADER_LEN + len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let frame = src.split_to(len);
        postcard::from_bytes(&frame)
            .map(Some)
            .map_err(CodecError::Malformed)
    }
}
