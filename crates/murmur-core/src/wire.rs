//! Substrate frame format: the UDP datagrams exchanged by murmurd's gossip
//! layer.
//!
//! A datagram is a fixed `FrameHeader` followed by the origin address
//! (UTF-8, `origin_len` bytes) and the payload (`payload_len` bytes).
//! Multi-byte header fields are little-endian.
//!
//! The header is `#[repr(C, packed)]` with zerocopy derives, so reading and
//! writing it needs no unsafe code.

use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::peer::PeerAddress;

/// First two bytes of every frame.
pub const FRAME_MAGIC: [u8; 2] = *b"MR";

/// Current frame version. Frames with another version are dropped.
pub const FRAME_VERSION: u8 = 1;

/// Largest datagram we will build or accept.
pub const MAX_DATAGRAM: usize = 65_000;

/// Frame kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// Liveness ping. Payload: the sender's member addresses, one per line.
    Heartbeat = 1,
    /// Application broadcast. Payload: an encoded envelope.
    Broadcast = 2,
}

impl TryFrom<u8> for FrameKind {
    type Error = FrameError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Self::Heartbeat),
            2 => Ok(Self::Broadcast),
            other => Err(FrameError::UnknownKind(other)),
        }
    }
}

/// Wire size: 10 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct FrameHeader {
    pub magic: [u8; 2],
    pub version: u8,
    pub kind: u8,
    pub origin_len: u16,
    pub payload_len: u32,
}

assert_eq_size!(FrameHeader, [u8; 10]);

pub const HEADER_LEN: usize = std::mem::size_of::<FrameHeader>();

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("datagram shorter than frame header ({0} bytes)")]
    Truncated(usize),
    #[error("bad frame magic")]
    BadMagic,
    #[error("unsupported frame version {0}")]
    BadVersion(u8),
    #[error("unknown frame kind {0}")]
    UnknownKind(u8),
    #[error("frame lengths do not match datagram size")]
    LengthMismatch,
    #[error("origin address is not valid UTF-8")]
    BadOrigin,
    #[error("frame of {0} bytes exceeds the datagram limit")]
    TooLarge(usize),
}

/// A parsed frame, borrowing its payload from the receive buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct Frame<'a> {
    pub kind: FrameKind,
    pub origin: PeerAddress,
    pub payload: &'a [u8],
}

/// Build a datagram.
pub fn encode_frame(
    kind: FrameKind,
    origin: &PeerAddress,
    payload: &[u8],
) -> Result<Vec<u8>, FrameError> {
    let origin = origin.as_str().as_bytes();
    let total = HEADER_LEN + origin.len() + payload.len();
    if total > MAX_DATAGRAM || origin.len() > u16::MAX as usize {
        return Err(FrameError::TooLarge(total));
    }

    let header = FrameHeader {
        magic: FRAME_MAGIC,
        version: FRAME_VERSION,
        kind: kind as u8,
        origin_len: (origin.len() as u16).to_le(),
        payload_len: (payload.len() as u32).to_le(),
    };

    let mut buf = Vec::with_capacity(total);
    buf.extend_from_slice(header.as_bytes());
    buf.extend_from_slice(origin);
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Parse a datagram. Anything malformed is an error; the caller drops it.
pub fn decode_frame(datagram: &[u8]) -> Result<Frame<'_>, FrameError> {
    let header =
        FrameHeader::read_from_prefix(datagram).ok_or(FrameError::Truncated(datagram.len()))?;

    if header.magic != FRAME_MAGIC {
        return Err(FrameError::BadMagic);
    }
    if header.version != FRAME_VERSION {
        return Err(FrameError::BadVersion(header.version));
    }
    let kind = FrameKind::try_from(header.kind)?;

    // copy out of the packed struct before use
    let origin_len = u16::from_le(header.origin_len) as usize;
    let payload_len = u32::from_le(header.payload_len) as usize;

    let body = &datagram[HEADER_LEN..];
    if body.len() != origin_len + payload_len {
        return Err(FrameError::LengthMismatch);
    }

    let origin = std::str::from_utf8(&body[..origin_len]).map_err(|_| FrameError::BadOrigin)?;

    Ok(Frame {
        kind,
        origin: PeerAddress::from(origin),
        payload: &body[origin_len..],
    })
}

/// Heartbeat payload: member addresses, newline separated.
pub fn encode_member_list<'a>(members: impl IntoIterator<Item = &'a PeerAddress>) -> Vec<u8> {
    members
        .into_iter()
        .map(PeerAddress::as_str)
        .collect::<Vec<_>>()
        .join("\n")
        .into_bytes()
}

/// Inverse of [`encode_member_list`]. Blank and non-UTF-8 input yields nothing.
pub fn decode_member_list(payload: &[u8]) -> Vec<PeerAddress> {
    std::str::from_utf8(payload)
        .map(|s| {
            s.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(PeerAddress::from)
                .collect()
        })
        .unwrap_or_default()
}
