//! Session and media descriptions
//!
//! The shapes produced by the transport collaborator's DESCRIBE exchange (or
//! supplied by the upstream subscription on the push side). Everything here is
//! immutable once received from the peer.

mod aac;

pub use aac::{AudioObjectType, AudioSpecificConfig};

use bytes::Bytes;
use url::Url;

/// Identity of a media description within its session
///
/// Descriptions are immutable after DESCRIBE/ANNOUNCE, so the position in the
/// session's media list is a stable key for the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaIndex(pub usize);

impl std::fmt::Display for MediaIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "media#{}", self.0)
    }
}

/// Coarse media kind advertised by the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Video stream
    Video,
    /// Audio stream
    Audio,
    /// Anything else (application data, metadata)
    Other,
}

/// A negotiated protocol session: base address plus advertised media
#[derive(Debug, Clone, Default)]
pub struct SessionDescription {
    /// Base URL the peer resolved for this session
    pub base_url: Option<Url>,
    /// Advertised media, in peer order
    pub medias: Vec<MediaDescription>,
}

impl SessionDescription {
    /// Iterate media descriptions with their stable indices
    pub fn indexed(&self) -> impl Iterator<Item = (MediaIndex, &MediaDescription)> {
        self.medias
            .iter()
            .enumerate()
            .map(|(i, m)| (MediaIndex(i), m))
    }
}

/// One advertised media unit and its format alternatives
#[derive(Debug, Clone)]
pub struct MediaDescription {
    /// Media kind
    pub kind: MediaKind,
    /// Format alternatives, in peer order
    pub formats: Vec<FormatDescriptor>,
}

/// H.264 format parameters
#[derive(Debug, Clone, Default)]
pub struct H264Format {
    /// Negotiated RTP payload type
    pub payload_type: u8,
    /// Out-of-band sequence parameter set
    pub sps: Option<Bytes>,
    /// Out-of-band picture parameter set
    pub pps: Option<Bytes>,
}

/// H.265 format parameters
#[derive(Debug, Clone, Default)]
pub struct H265Format {
    /// Negotiated RTP payload type
    pub payload_type: u8,
    /// Out-of-band video parameter set
    pub vps: Option<Bytes>,
    /// Out-of-band sequence parameter set
    pub sps: Option<Bytes>,
    /// Out-of-band picture parameter set
    pub pps: Option<Bytes>,
}

/// AV1 format parameters (configuration arrives in-band)
#[derive(Debug, Clone, Default)]
pub struct Av1Format {
    /// Negotiated RTP payload type
    pub payload_type: u8,
}

/// MPEG-4 audio (AAC) format parameters
#[derive(Debug, Clone)]
pub struct Mpeg4AudioFormat {
    /// Negotiated RTP payload type
    pub payload_type: u8,
    /// Out-of-band audio specific configuration
    pub config: AudioSpecificConfig,
    /// AU-header size length in bits
    pub size_length: u32,
    /// AU-header index length in bits
    pub index_length: u32,
    /// AU-header index-delta length in bits
    pub index_delta_length: u32,
}

/// G.711 format parameters
#[derive(Debug, Clone)]
pub struct G711Format {
    /// Negotiated RTP payload type
    pub payload_type: u8,
    /// True for mu-law (PCMU), false for a-law (PCMA)
    pub mu_law: bool,
}

impl G711Format {
    /// G.711 RTP clock rate
    #[must_use]
    pub fn clock_rate(&self) -> u32 {
        8000
    }
}

/// Opus format parameters
#[derive(Debug, Clone)]
pub struct OpusFormat {
    /// Negotiated RTP payload type
    pub payload_type: u8,
    /// Channel count
    pub channels: u8,
}

impl OpusFormat {
    /// Opus RTP clock rate
    #[must_use]
    pub fn clock_rate(&self) -> u32 {
        48000
    }
}

/// A format this adapter has no dedicated variant for
#[derive(Debug, Clone)]
pub struct OtherFormat {
    /// Negotiated RTP payload type
    pub payload_type: u8,
    /// Raw RTP map string as advertised (e.g. `PCMU/8000/1`)
    pub rtp_map: String,
    /// Advertised clock rate
    pub clock_rate: u32,
}

/// Codec identity and parameters for one advertised format
///
/// A closed set of recognized codec variants plus an explicit fallback; the
/// heuristic handling for `Other` lives in the negotiator, not here.
#[derive(Debug, Clone)]
pub enum FormatDescriptor {
    /// H.264 video
    H264(H264Format),
    /// H.265 video
    H265(H265Format),
    /// AV1 video
    Av1(Av1Format),
    /// MPEG-4 audio (AAC)
    Mpeg4Audio(Mpeg4AudioFormat),
    /// G.711 audio
    G711(G711Format),
    /// Opus audio
    Opus(OpusFormat),
    /// Unrecognized format
    Other(OtherFormat),
}

impl FormatDescriptor {
    /// Negotiated RTP payload type
    #[must_use]
    pub fn payload_type(&self) -> u8 {
        match self {
            Self::H264(f) => f.payload_type,
            Self::H265(f) => f.payload_type,
            Self::Av1(f) => f.payload_type,
            Self::Mpeg4Audio(f) => f.payload_type,
            Self::G711(f) => f.payload_type,
            Self::Opus(f) => f.payload_type,
            Self::Other(f) => f.payload_type,
        }
    }

    /// RTP clock rate for this format
    #[must_use]
    pub fn clock_rate(&self) -> u32 {
        match self {
            Self::H264(_) | Self::H265(_) | Self::Av1(_) => 90000,
            Self::Mpeg4Audio(f) => f.config.sample_rate,
            Self::G711(f) => f.clock_rate(),
            Self::Opus(f) => f.clock_rate(),
            Self::Other(f) => f.clock_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_index_display() {
        assert_eq!(MediaIndex(2).to_string(), "media#2");
    }

    #[test]
    fn test_indexed_iteration_preserves_order() {
        let description = SessionDescription {
            base_url: None,
            medias: vec![
                MediaDescription {
                    kind: MediaKind::Video,
                    formats: vec![],
                },
                MediaDescription {
                    kind: MediaKind::Audio,
                    formats: vec![],
                },
            ],
        };

        let kinds: Vec<_> = description.indexed().map(|(i, m)| (i, m.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (MediaIndex(0), MediaKind::Video),
                (MediaIndex(1), MediaKind::Audio)
            ]
        );
    }

    #[test]
    fn test_fixed_clock_rates() {
        let video = FormatDescriptor::H264(H264Format {
            payload_type: 96,
            ..H264Format::default()
        });
        assert_eq!(video.clock_rate(), 90000);
        assert_eq!(video.payload_type(), 96);

        let g711 = FormatDescriptor::G711(G711Format {
            payload_type: 0,
            mu_law: true,
        });
        assert_eq!(g711.clock_rate(), 8000);

        let opus = FormatDescriptor::Opus(OpusFormat {
            payload_type: 111,
            channels: 2,
        });
        assert_eq!(opus.clock_rate(), 48000);
    }
}
