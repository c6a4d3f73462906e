//! Minimal RTP packet model
//!
//! The adapter never repacketizes media; this type exists so routed packets
//! carry their header fields alongside the payload. Payload types are left as
//! raw bytes because negotiated types are dynamic.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// RTP decode errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RtpDecodeError {
    /// Buffer shorter than the fixed header
    #[error("buffer too small: needed {needed}, have {have}")]
    BufferTooSmall {
        /// Bytes required
        needed: usize,
        /// Bytes available
        have: usize,
    },
    /// Version field was not 2
    #[error("invalid RTP version: {0}")]
    InvalidVersion(u8),
}

/// RTP header (12 bytes, no CSRC list)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpHeader {
    /// Version (2 bits, always 2)
    pub version: u8,
    /// Padding flag
    pub padding: bool,
    /// Extension flag
    pub extension: bool,
    /// Marker bit
    pub marker: bool,
    /// Payload type (7 bits)
    pub payload_type: u8,
    /// Sequence number (16 bits)
    pub sequence: u16,
    /// Timestamp (32 bits)
    pub timestamp: u32,
    /// Synchronization source ID (32 bits)
    pub ssrc: u32,
}

impl RtpHeader {
    /// Fixed RTP header size
    pub const SIZE: usize = 12;

    /// Encode header to bytes
    #[must_use]
    pub fn encode(&self) -> [u8; 12] {
        let mut buf = [0u8; 12];

        // Byte 0: V(2) | P(1) | X(1) | CC(4)
        buf[0] = (self.version << 6)
            | (u8::from(self.padding) << 5)
            | (u8::from(self.extension) << 4);

        // Byte 1: M(1) | PT(7)
        buf[1] = (u8::from(self.marker) << 7) | (self.payload_type & 0x7F);

        buf[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        buf[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[8..12].copy_from_slice(&self.ssrc.to_be_bytes());

        buf
    }

    /// Decode header from bytes
    ///
    /// # Errors
    ///
    /// Returns `RtpDecodeError` if the buffer is too small or the version is
    /// invalid.
    pub fn decode(buf: &[u8]) -> Result<Self, RtpDecodeError> {
        if buf.len() < Self::SIZE {
            return Err(RtpDecodeError::BufferTooSmall {
                needed: Self::SIZE,
                have: buf.len(),
            });
        }

        let version = (buf[0] >> 6) & 0x03;
        if version != 2 {
            return Err(RtpDecodeError::InvalidVersion(version));
        }

        Ok(Self {
            version,
            padding: (buf[0] >> 5) & 0x01 != 0,
            extension: (buf[0] >> 4) & 0x01 != 0,
            marker: (buf[1] >> 7) & 0x01 != 0,
            payload_type: buf[1] & 0x7F,
            sequence: u16::from_be_bytes([buf[2], buf[3]]),
            timestamp: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            ssrc: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
        })
    }
}

/// A complete RTP packet: header plus opaque payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    /// Packet header
    pub header: RtpHeader,
    /// Payload bytes, untouched by the router
    pub payload: Bytes,
}

impl RtpPacket {
    /// Build a packet with the given payload type and payload
    #[must_use]
    pub fn new(payload_type: u8, sequence: u16, timestamp: u32, ssrc: u32, payload: Bytes) -> Self {
        Self {
            header: RtpHeader {
                version: 2,
                padding: false,
                extension: false,
                marker: false,
                payload_type,
                sequence,
                timestamp,
                ssrc,
            },
            payload,
        }
    }

    /// Encode to wire bytes
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(RtpHeader::SIZE + self.payload.len());
        buf.put_slice(&self.header.encode());
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Decode from wire bytes
    ///
    /// # Errors
    ///
    /// Returns `RtpDecodeError` if the header cannot be decoded.
    pub fn decode(buf: &[u8]) -> Result<Self, RtpDecodeError> {
        let header = RtpHeader::decode(buf)?;
        Ok(Self {
            header,
            payload: Bytes::copy_from_slice(&buf[RtpHeader::SIZE..]),
        })
    }
}
