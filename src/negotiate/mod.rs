//! Format negotiation
//!
//! Resolves the formats advertised in a session description into host-engine
//! tracks and builds the media-to-track mapping used for the session's
//! lifetime. Negotiation never fails: unsupported formats are skipped with a
//! warning and the caller decides whether an empty mapping is fatal.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{info, warn};

use crate::media::{
    AudioObjectType, FormatDescriptor, H264Format, H265Format, MediaIndex, Mpeg4AudioFormat,
    OtherFormat, SessionDescription,
};
use crate::track::{
    AacTrackSpec, G711TrackSpec, MediaTrack, OpusTrackSpec, StreamRegistry, TrackKind, TrackSpec,
    VideoCodec, VideoTrackSpec,
};


/// Legacy container tag prefixed to AAC sequence headers
const AAC_SEQUENCE_TAG: [u8; 2] = [0xAF, 0x00];

/// Read-only media-to-track mapping built by negotiation
///
/// Never mutated after the negotiation pass, so concurrent reads from the
/// packet callback need no synchronization.
#[derive(Clone, Default)]
pub struct TrackMap {
    entries: Vec<Option<Arc<dyn MediaTrack>>>,
    video: Option<Arc<dyn MediaTrack>>,
    audio: Option<Arc<dyn MediaTrack>>,
}

impl TrackMap {
    /// Track bound to the given media, if any
    #[must_use]
    pub fn track(&self, media: MediaIndex) -> Option<&Arc<dyn MediaTrack>> {
        self.entries.get(media.0).and_then(Option::as_ref)
    }

    /// The session's video track, if one was negotiated
    #[must_use]
    pub fn video(&self) -> Option<&Arc<dyn MediaTrack>> {
        self.video.as_ref()
    }

    /// The session's audio track, if one was negotiated
    #[must_use]
    pub fn audio(&self) -> Option<&Arc<dyn MediaTrack>> {
        self.audio.as_ref()
    }

    /// Whether a video track was negotiated
    #[must_use]
    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    /// Whether an audio track was negotiated
    #[must_use]
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Media indices with a bound track
    pub fn mapped(&self) -> impl Iterator<Item = MediaIndex> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_some())
            .map(|(i, _)| MediaIndex(i))
    }

    /// Number of mapped media descriptions
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// True when no media was successfully negotiated
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for TrackMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackMap")
            .field("mapped", &self.len())
            .field("has_video", &self.has_video())
            .field("has_audio", &self.has_audio())
            .finish()
    }
}

/// Per-session codec-kind to track bindings
///
/// Lazy idempotent construction: the first format of a coarse kind creates
/// the track through the registry; later formats of the same kind reuse it
/// and only contribute configuration seeding.
pub struct TrackBindings<'a> {
    registry: &'a dyn StreamRegistry,
    video: Option<Arc<dyn MediaTrack>>,
    audio: Option<Arc<dyn MediaTrack>>,
}

impl<'a> TrackBindings<'a> {
    /// Create empty bindings against a registry
    #[must_use]
    pub fn new(registry: &'a dyn StreamRegistry) -> Self {
        Self {
            registry,
            video: None,
            audio: None,
        }
    }

    /// Resolve one advertised format into a track
    ///
    /// Returns the bound track, creating and seeding it when this is the
    /// first format of its coarse kind. Unrecognized formats resolve to
    /// `None` after the heuristic fallback; no error is ever raised.
    pub fn resolve(&mut self, format: &FormatDescriptor) -> Option<Arc<dyn MediaTrack>> {
        match format {
            FormatDescriptor::H264(f) => Some(self.resolve_h264(f)),
            FormatDescriptor::H265(f) => Some(self.resolve_h265(f)),
            FormatDescriptor::Av1(f) => Some(self.video_or_create(|| {
                TrackSpec::Video(VideoTrackSpec {
                    codec: VideoCodec::Av1,
                    payload_type: f.payload_type,
                })
            })),
            FormatDescriptor::Mpeg4Audio(f) => Some(self.resolve_aac(f)),
            FormatDescriptor::G711(f) => Some(self.audio_or_create(|| {
                TrackSpec::G711(G711TrackSpec {
                    a_law: !f.mu_law,
                    payload_type: f.payload_type,
                    clock_rate: f.clock_rate(),
                })
            })),
            FormatDescriptor::Opus(f) => Some(self.audio_or_create(|| {
                TrackSpec::Opus(OpusTrackSpec {
                    payload_type: f.payload_type,
                    clock_rate: f.clock_rate(),
                })
            })),
            FormatDescriptor::Other(f) => self.resolve_other(f),
        }
    }

    fn resolve_h264(&mut self, f: &H264Format) -> Arc<dyn MediaTrack> {
        let track = self.video_or_create(|| {
            TrackSpec::Video(VideoTrackSpec {
                codec: VideoCodec::H264,
                payload_type: f.payload_type,
            })
        });
        // Parameter sets seed on every occurrence so later SPS/PPS updates
        // reach the already-constructed track
        if let Some(sps) = &f.sps {
            track.write_config(sps.clone());
        }
        if let Some(pps) = &f.pps {
            track.write_config(pps.clone());
        }
        track
    }

    fn resolve_h265(&mut self, f: &H265Format) -> Arc<dyn MediaTrack> {
        let track = self.video_or_create(|| {
            TrackSpec::Video(VideoTrackSpec {
                codec: VideoCodec::H265,
                payload_type: f.payload_type,
            })
        });
        if let Some(vps) = &f.vps {
            track.write_config(vps.clone());
        }
        if let Some(sps) = &f.sps {
            track.write_config(sps.clone());
        }
        if let Some(pps) = &f.pps {
            track.write_config(pps.clone());
        }
        track
    }

    fn resolve_aac(&mut self, f: &Mpeg4AudioFormat) -> Arc<dyn MediaTrack> {
        if let Some(track) = &self.audio {
            return Arc::clone(track);
        }

        let track = self.registry.create_track(TrackSpec::Aac(AacTrackSpec {
            payload_type: f.payload_type,
            sample_rate: f.config.sample_rate,
            channels: f.config.channel_count,
            size_length: f.size_length,
            index_length: f.index_length,
            index_delta_length: f.index_delta_length,
            low_complexity: f.config.object_type == AudioObjectType::AacLc,
        }));

        track.write_config(aac_sequence_header(&f.config));

        self.audio = Some(Arc::clone(&track));
        track
    }

    /// Heuristic fallback for formats with no dedicated variant
    fn resolve_other(&mut self, f: &OtherFormat) -> Option<Arc<dyn MediaTrack>> {
        let rtp_map = f.rtp_map.to_lowercase();
        if rtp_map.contains("pcm") {
            let mu_law = rtp_map.contains("pcmu");
            Some(self.audio_or_create(|| {
                TrackSpec::G711(G711TrackSpec {
                    a_law: !mu_law,
                    payload_type: f.payload_type,
                    clock_rate: f.clock_rate,
                })
            }))
        } else {
            warn!(rtp_map = %f.rtp_map, "unknown format");
            None
        }
    }

    fn video_or_create(&mut self, spec: impl FnOnce() -> TrackSpec) -> Arc<dyn MediaTrack> {
        self.bound_or_create(TrackKind::Video, spec)
    }

    fn audio_or_create(&mut self, spec: impl FnOnce() -> TrackSpec) -> Arc<dyn MediaTrack> {
        self.bound_or_create(TrackKind::Audio, spec)
    }

    fn bound_or_create(
        &mut self,
        kind: TrackKind,
        spec: impl FnOnce() -> TrackSpec,
    ) -> Arc<dyn MediaTrack> {
        let slot = match kind {
            TrackKind::Video => &mut self.video,
            TrackKind::Audio => &mut self.audio,
        };
        if let Some(track) = slot {
            return Arc::clone(track);
        }
        let track = self.registry.create_track(spec());
        *slot = Some(Arc::clone(&track));
        track
    }
}

/// Negotiate every media/format pair of a session into the track mapping
///
/// Iteration follows the peer's advertised order. The first format of a
/// coarse codec kind fixes the track's construction parameters; later
/// formats of the same kind only contribute seeding. Media with entirely
/// unrecognized formats are absent from the mapping.
#[must_use]
pub fn negotiate(description: &SessionDescription, registry: &dyn StreamRegistry) -> TrackMap {
    let mut bindings = TrackBindings::new(registry);
    let mut entries: Vec<Option<Arc<dyn MediaTrack>>> = vec![None; description.medias.len()];

    for (index, media) in description.indexed() {
        for format in &media.formats {
            if let Some(track) = bindings.resolve(format) {
                entries[index.0] = Some(track);
            }
        }
    }

    for (i, entry) in entries.iter().enumerate() {
        if let Some(track) = entry {
            info!(media = %MediaIndex(i), track = track.name(), "track bound");
        }
    }

    if bindings.video.is_none() {
        info!("no video track");
    }
    if bindings.audio.is_none() {
        info!("no audio track");
    }

    TrackMap {
        entries,
        video: bindings.video,
        audio: bindings.audio,
    }
}

/// Marshal an AAC sequence header with the legacy container tag
#[must_use]
pub fn aac_sequence_header(config: &crate::media::AudioSpecificConfig) -> Bytes {
    let asc = config.marshal();
    let mut header = BytesMut::with_capacity(AAC_SEQUENCE_TAG.len() + asc.len());
    header.put_slice(&AAC_SEQUENCE_TAG);
    header.put_slice(&asc);
    header.freeze()
}
