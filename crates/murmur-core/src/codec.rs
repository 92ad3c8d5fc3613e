//! Envelope codec: JSON, then a zlib stream.
//!
//! Encoding writes the JSON form through a zlib encoder and must call
//! `finish()` before the buffer is taken; a failed finish is an error, never
//! a silently truncated payload. Decoding inflates the whole payload first
//! and only then parses JSON, so the two failure modes stay distinct.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::message::MessageEnvelope;

/// Largest inflated envelope `decode` accepts.
pub const MAX_ENVELOPE: usize = 256 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to serialize envelope: {0}")]
    Serialize(serde_json::Error),
    #[error("failed to compress envelope: {0}")]
    Compress(std::io::Error),
    #[error("failed to finalize compressed stream: {0}")]
    Finalize(std::io::Error),
    #[error("failed to decompress message: {0}")]
    Decompress(std::io::Error),
    #[error("failed to decode message: {0}")]
    Decode(serde_json::Error),
    #[error("message inflates past {} bytes", MAX_ENVELOPE)]
    TooLarge,
}

/// Serialize and compress an envelope for broadcast.
pub fn encode(envelope: &MessageEnvelope) -> Result<Vec<u8>, CodecError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    serde_json::to_writer(&mut encoder, envelope).map_err(CodecError::Serialize)?;
    // Trailing newline keeps the stream identical to a line-oriented JSON encoder.
    encoder.write_all(b"\n").map_err(CodecError::Compress)?;
    encoder.finish().map_err(CodecError::Finalize)
}

/// Decompress and parse a received broadcast payload. Inflation stops one
/// byte past [`MAX_ENVELOPE`].
pub fn decode(data: &[u8]) -> Result<MessageEnvelope, CodecError> {
    let mut json = Vec::new();
    ZlibDecoder::new(data)
        .take(MAX_ENVELOPE as u64 + 1)
        .read_to_end(&mut json)
        .map_err(CodecError::Decompress)?;
    if json.len() > MAX_ENVELOPE {
        return Err(CodecError::TooLarge);
    }
    serde_json::from_slice(&json).map_err(CodecError::Decode)
}
