//! murmur-core — shared types, envelope codec, substrate frame format and
//! configuration. All other murmur crates depend on this one.

pub mod codec;
pub mod config;
pub mod message;
pub mod peer;
pub mod wire;

pub use codec::CodecError;
pub use message::{MessageEnvelope, MessageKind};
pub use peer::{Peer, PeerAddress};
