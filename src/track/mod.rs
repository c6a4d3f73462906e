//! Track and stream-registry collaborator boundary
//!
//! The host engine owns the byte-level codec writers; this adapter only
//! constructs tracks through the registry and feeds them out-of-band
//! configuration and raw packets.

use std::sync::Arc;

use bytes::Bytes;

use crate::rtp::RtpPacket;

/// Coarse codec kind of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// Video track
    Video,
    /// Audio track
    Audio,
}

/// Video codec of a video track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    /// H.264 / AVC
    H264,
    /// H.265 / HEVC
    H265,
    /// AV1
    Av1,
}

/// Construction parameters for a video track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTrackSpec {
    /// Codec the track decodes
    pub codec: VideoCodec,
    /// Negotiated RTP payload type
    pub payload_type: u8,
}

/// Construction parameters for an AAC audio track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AacTrackSpec {
    /// Negotiated RTP payload type
    pub payload_type: u8,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u8,
    /// AU-header size length in bits, verbatim from the format
    pub size_length: u32,
    /// AU-header index length in bits, verbatim from the format
    pub index_length: u32,
    /// AU-header index-delta length in bits, verbatim from the format
    pub index_delta_length: u32,
    /// Decoder mode flag for low-complexity AAC
    pub low_complexity: bool,
}

/// Construction parameters for a G.711 audio track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct G711TrackSpec {
    /// True for a-law, false for mu-law
    pub a_law: bool,
    /// Negotiated RTP payload type
    pub payload_type: u8,
    /// RTP clock rate
    pub clock_rate: u32,
}

/// Construction parameters for an Opus audio track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpusTrackSpec {
    /// Negotiated RTP payload type
    pub payload_type: u8,
    /// RTP clock rate
    pub clock_rate: u32,
}

/// Track construction request handed to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackSpec {
    /// Video track
    Video(VideoTrackSpec),
    /// AAC audio track
    Aac(AacTrackSpec),
    /// G.711 audio track
    G711(G711TrackSpec),
    /// Opus audio track
    Opus(OpusTrackSpec),
}

impl TrackSpec {
    /// Coarse kind this spec constructs
    #[must_use]
    pub fn kind(&self) -> TrackKind {
        match self {
            Self::Video(_) => TrackKind::Video,
            Self::Aac(_) | Self::G711(_) | Self::Opus(_) => TrackKind::Audio,
        }
    }
}

/// A codec-specific media sink/source owned by the host engine
///
/// At most one video and one audio track exist per session; handles are
/// shared read-only with the packet router for the session's duration.
pub trait MediaTrack: Send + Sync {
    /// Coarse codec kind
    fn kind(&self) -> TrackKind;

    /// Human-readable track name for diagnostics
    fn name(&self) -> &str;

    /// Write out-of-band codec configuration (parameter sets, sequence
    /// headers) to the track
    fn write_config(&self, config: Bytes);

    /// Write one media packet to the track
    fn write_packet(&self, packet: &RtpPacket);
}

/// Track-construction collaborator exposed by the host engine
pub trait StreamRegistry: Send + Sync {
    /// Create a track for the given spec
    fn create_track(&self, spec: TrackSpec) -> Arc<dyn MediaTrack>;
}
