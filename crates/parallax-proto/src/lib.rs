//! Wire model and codec for the parallax remoting server.
//!
//! This crate defines the envelope model used between remoting clients and
//! the dispatch server:
//!
//! - [`Value`]: dynamic wire values (nulls, numbers, strings, arrays,
//!   optionally class-tagged objects)
//! - [`Packet`] / [`Message`]: the decoded runtime envelope, an ordered
//!   message sequence plus a scratch map for middleware, with per-message
//!   one-shot response slots
//! - [`TargetUri`]: the typed `namespace.method` addressing key
//! - [`PacketCodec`]: the codec seam the dispatch server consumes, with
//!   [`WireCodec`] as the default framed binary implementation
//! - [`ClassAliasRegistry`]: wire type aliases for class-tagged objects
//!
//! # Wire Format
//!
//! Frames carry an 8-byte header followed by an rkyv-serialised
//! [`WirePacket`]:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Frame Header (8 bytes, fixed)              │
//! ├──────────────┬──────────────┬───────────────────────────┤
//! │  Version (2) │ Frame Ty (2) │    Payload Length (4)     │
//! ├──────────────┴──────────────┴───────────────────────────┤
//! │                rkyv-serialised WirePacket               │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod alias;
pub mod codec;
mod error;
mod message;
mod packet;
mod value;

pub use alias::ClassAliasRegistry;
pub use codec::{
    FrameHeader, FrameType, PacketCodec, WireCodec, FRAME_HEADER_SIZE, MAX_PACKET_SIZE,
};
pub use error::ProtocolError;
pub use message::{Message, TargetUri};
pub use packet::{Packet, WireMessage, WirePacket};
pub use value::Value;

/// Protocol version constants.
pub mod version {
    /// Current protocol version.
    pub const CURRENT: u16 = 1;

    /// Minimum supported protocol version.
    pub const MIN_SUPPORTED: u16 = 1;
}
