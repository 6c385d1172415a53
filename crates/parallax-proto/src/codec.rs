//! Frame encoding and decoding.

use std::sync::Arc;

use rkyv::rancor::Error as RkyvError;

use crate::alias::ClassAliasRegistry;
use crate::error::ProtocolError;
use crate::packet::{Packet, WirePacket};

/// Frame header size in bytes.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Maximum packet size (10 MB).
pub const MAX_PACKET_SIZE: usize = 10 * 1024 * 1024;

/// Frame type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum FrameType {
    /// Request envelope (client → server).
    Request = 0x01,
    /// Reply envelope (server → client).
    Reply = 0x02,
}

impl FrameType {
    /// Creates a frame type from a numeric value.
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x01 => Some(Self::Request),
            0x02 => Some(Self::Reply),
            _ => None,
        }
    }

    /// Returns the numeric value of this frame type.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Frame header for envelope frames.
///
/// Wire format (8 bytes, big-endian):
/// - Bytes 0-1: Protocol version (u16)
/// - Bytes 2-3: Frame type (u16)
/// - Bytes 4-7: Payload length (u32)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Protocol version.
    pub version: u16,
    /// Frame type discriminant.
    pub frame_type: FrameType,
    /// Length of the payload in bytes.
    pub payload_len: u32,
}

impl FrameHeader {
    /// Creates a new frame header at the current protocol version.
    #[must_use]
    pub const fn new(frame_type: FrameType, payload_len: u32) -> Self {
        Self {
            version: crate::version::CURRENT,
            frame_type,
            payload_len,
        }
    }

    /// Encodes the frame header to bytes.
    #[must_use]
    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut buf = [0u8; FRAME_HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.version.to_be_bytes());
        buf[2..4].copy_from_slice(&self.frame_type.as_u16().to_be_bytes());
        buf[4..8].copy_from_slice(&self.payload_len.to_be_bytes());
        buf
    }

    /// Decodes a frame header from bytes.
    pub fn decode(bytes: &[u8; FRAME_HEADER_SIZE]) -> Result<Self, ProtocolError> {
        let version = u16::from_be_bytes([bytes[0], bytes[1]]);
        let frame_type_raw = u16::from_be_bytes([bytes[2], bytes[3]]);
        let payload_len = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

        let frame_type = FrameType::from_u16(frame_type_raw)
            .ok_or(ProtocolError::UnknownFrameType(frame_type_raw))?;

        Ok(Self {
            version,
            frame_type,
            payload_len,
        })
    }

    /// Checks if this header's version is supported.
    #[must_use]
    pub const fn is_version_supported(&self) -> bool {
        self.version >= crate::version::MIN_SUPPORTED && self.version <= crate::version::CURRENT
    }
}

/// The codec seam consumed by the dispatch server.
///
/// Decoding turns raw request bytes into a runtime [`Packet`]; encoding
/// turns a dispatched packet's recorded responses into reply bytes.
pub trait PacketCodec: Send + Sync {
    /// Decodes an envelope frame into a runtime packet. The frame type is
    /// informational; request and reply envelopes share the packet shape.
    fn decode(&self, bytes: &[u8]) -> Result<Packet, ProtocolError>;

    /// Encodes the reply envelope for a dispatched packet.
    fn encode_reply(&self, packet: &Packet) -> Result<Vec<u8>, ProtocolError>;
}

/// Default framed binary codec (rkyv payload behind a [`FrameHeader`]).
#[derive(Debug, Default)]
pub struct WireCodec {
    aliases: Arc<ClassAliasRegistry>,
}

impl WireCodec {
    /// Creates a codec sharing the given alias registry.
    #[must_use]
    pub fn new(aliases: Arc<ClassAliasRegistry>) -> Self {
        Self { aliases }
    }

    /// The alias registry this codec validates against.
    #[must_use]
    pub fn aliases(&self) -> &Arc<ClassAliasRegistry> {
        &self.aliases
    }

    /// Encodes a request frame. Used by clients and test fixtures.
    pub fn encode_request(&self, wire: &WirePacket) -> Result<Vec<u8>, ProtocolError> {
        Self::encode_frame(wire, FrameType::Request)
    }

    fn encode_frame(wire: &WirePacket, frame_type: FrameType) -> Result<Vec<u8>, ProtocolError> {
        let payload = rkyv::to_bytes::<RkyvError>(wire)
            .map_err(|e| ProtocolError::Serialisation(e.to_string()))?;

        if payload.len() > MAX_PACKET_SIZE {
            return Err(ProtocolError::PacketTooLarge {
                size: payload.len(),
                max: MAX_PACKET_SIZE,
            });
        }

        let header = FrameHeader::new(frame_type, payload.len() as u32);
        let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
        buf.extend_from_slice(&header.encode());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    fn decode_frame(bytes: &[u8]) -> Result<(FrameHeader, WirePacket), ProtocolError> {
        if bytes.len() < FRAME_HEADER_SIZE {
            return Err(ProtocolError::InvalidFrameHeader(format!(
                "frame shorter than header: {} bytes",
                bytes.len()
            )));
        }

        let header_bytes: [u8; FRAME_HEADER_SIZE] = bytes[..FRAME_HEADER_SIZE]
            .try_into()
            .map_err(|_| ProtocolError::InvalidFrameHeader("truncated header".to_owned()))?;
        let header = FrameHeader::decode(&header_bytes)?;

        if !header.is_version_supported() {
            return Err(ProtocolError::UnsupportedVersion(header.version));
        }

        let payload_len = header.payload_len as usize;
        if payload_len > MAX_PACKET_SIZE {
            return Err(ProtocolError::PacketTooLarge {
                size: payload_len,
                max: MAX_PACKET_SIZE,
            });
        }

        let payload = &bytes[FRAME_HEADER_SIZE..];
        if payload.len() != payload_len {
            return Err(ProtocolError::InvalidFrameHeader(format!(
                "payload length mismatch: header says {payload_len}, got {}",
                payload.len()
            )));
        }

        let wire = rkyv::from_bytes::<WirePacket, RkyvError>(payload)
            .map_err(|e| ProtocolError::Deserialisation(e.to_string()))?;

        Ok((header, wire))
    }
}

impl PacketCodec for WireCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Packet, ProtocolError> {
        let (_, wire) = Self::decode_frame(bytes)?;

        for message in &wire.messages {
            for argument in &message.arguments {
                self.aliases.validate(argument)?;
            }
        }

        Ok(Packet::from(wire))
    }

    fn encode_reply(&self, packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
        Self::encode_frame(&packet.reply(), FrameType::Reply)
    }
}
