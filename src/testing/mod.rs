//! Test doubles for the collaborator boundaries
//!
//! A scripted transport, a recording registry, and description builders used
//! by the unit and integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;
use url::Url;

use crate::error::{ProtocolStep, Result, SessionError};
use crate::media::{
    AudioObjectType, AudioSpecificConfig, FormatDescriptor, H264Format, MediaDescription,
    MediaIndex, MediaKind, Mpeg4AudioFormat, SessionDescription,
};
use crate::rtp::RtpPacket;
use crate::track::{MediaTrack, StreamRegistry, TrackKind, TrackSpec, VideoCodec};
use crate::transport::{ConnectOptions, PacketHandler, RtspTransport, TransportResponse};

/// A track that records every write it receives
pub struct RecordingTrack {
    kind: TrackKind,
    name: String,
    configs: Mutex<Vec<Bytes>>,
    packets: Mutex<Vec<RtpPacket>>,
}

impl RecordingTrack {
    fn new(kind: TrackKind, name: String) -> Self {
        Self {
            kind,
            name,
            configs: Mutex::new(Vec::new()),
            packets: Mutex::new(Vec::new()),
        }
    }

    /// Configuration writes, in order
    #[must_use]
    pub fn configs(&self) -> Vec<Bytes> {
        self.configs.lock().unwrap().clone()
    }

    /// Packet writes, in order
    #[must_use]
    pub fn packets(&self) -> Vec<RtpPacket> {
        self.packets.lock().unwrap().clone()
    }
}

impl MediaTrack for RecordingTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn write_config(&self, config: Bytes) {
        self.configs.lock().unwrap().push(config);
    }

    fn write_packet(&self, packet: &RtpPacket) {
        self.packets.lock().unwrap().push(packet.clone());
    }
}

/// A registry that records construction requests and hands out
/// `RecordingTrack`s
#[derive(Default)]
pub struct RecordingRegistry {
    specs: Mutex<Vec<TrackSpec>>,
    tracks: Mutex<Vec<Arc<RecordingTrack>>>,
}

impl RecordingRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construction requests, in order
    #[must_use]
    pub fn specs(&self) -> Vec<TrackSpec> {
        self.specs.lock().unwrap().clone()
    }

    /// Tracks handed out, in creation order
    #[must_use]
    pub fn tracks(&self) -> Vec<Arc<RecordingTrack>> {
        self.tracks.lock().unwrap().clone()
    }

    /// Number of tracks created
    #[must_use]
    pub fn created(&self) -> usize {
        self.tracks.lock().unwrap().len()
    }
}

impl StreamRegistry for RecordingRegistry {
    fn create_track(&self, spec: TrackSpec) -> Arc<dyn MediaTrack> {
        let name = match &spec {
            TrackSpec::Video(v) => match v.codec {
                VideoCodec::H264 => "video:h264",
                VideoCodec::H265 => "video:h265",
                VideoCodec::Av1 => "video:av1",
            },
            TrackSpec::Aac(_) => "audio:aac",
            TrackSpec::G711(_) => "audio:g711",
            TrackSpec::Opus(_) => "audio:opus",
        };
        let track = Arc::new(RecordingTrack::new(spec.kind(), name.to_string()));
        self.specs.lock().unwrap().push(spec);
        self.tracks.lock().unwrap().push(Arc::clone(&track));
        track
    }
}

/// A transport whose protocol exchanges succeed or fail by script
///
/// Records the order of operations, captures announced descriptions and
/// outbound packets, and lets tests deliver inbound packets through the
/// registered handler.
#[derive(Default)]
pub struct ScriptedTransport {
    description: Mutex<SessionDescription>,
    fail_step: Mutex<Option<ProtocolStep>>,
    fail_connect: AtomicBool,
    calls: Mutex<Vec<String>>,
    handler: Mutex<Option<PacketHandler>>,
    sent: Mutex<Vec<(MediaIndex, RtpPacket)>>,
    announced: Mutex<Option<SessionDescription>>,
    closed: AtomicBool,
    close_notify: Notify,
}

impl ScriptedTransport {
    /// A transport that describes an empty session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that describes the given session
    #[must_use]
    pub fn with_description(description: SessionDescription) -> Self {
        Self {
            description: Mutex::new(description),
            ..Self::default()
        }
    }

    /// Make the given protocol step fail
    pub fn fail_at(&self, step: ProtocolStep) {
        *self.fail_step.lock().unwrap() = Some(step);
    }

    /// Make the connect step fail
    pub fn fail_connect(&self) {
        self.fail_connect.store(true, Ordering::SeqCst);
    }

    /// Operations performed, in order
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Outbound packets written, in order
    #[must_use]
    pub fn sent(&self) -> Vec<(MediaIndex, RtpPacket)> {
        self.sent.lock().unwrap().clone()
    }

    /// The description announced by a push session, if any
    #[must_use]
    pub fn announced(&self) -> Option<SessionDescription> {
        self.announced.lock().unwrap().clone()
    }

    /// Whether a packet handler has been registered
    #[must_use]
    pub fn has_handler(&self) -> bool {
        self.handler.lock().unwrap().is_some()
    }

    /// Whether the transport has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Deliver one inbound packet through the registered handler
    ///
    /// Dropped when the transport is closed or no handler is registered.
    pub fn deliver(&self, media: MediaIndex, packet: &RtpPacket) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if let Some(handler) = self.handler.lock().unwrap().as_ref() {
            handler(media, packet);
        }
    }

    fn record_call(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn respond(&self, step: ProtocolStep) -> Result<TransportResponse> {
        self.record_call(step.as_str().to_lowercase());
        if *self.fail_step.lock().unwrap() == Some(step) {
            return Err(SessionError::Protocol {
                step,
                message: "scripted failure".to_string(),
                status_code: Some(500),
            });
        }
        Ok(TransportResponse::ok())
    }
}

#[async_trait]
impl RtspTransport for ScriptedTransport {
    async fn connect(&self, url: &Url, _options: ConnectOptions) -> Result<()> {
        self.record_call("connect");
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(SessionError::ConnectionFailed {
                target: url.to_string(),
                message: "scripted failure".to_string(),
                source: None,
            });
        }
        Ok(())
    }

    async fn options(&self) -> Result<TransportResponse> {
        self.respond(ProtocolStep::Options)
    }

    async fn describe(&self) -> Result<SessionDescription> {
        self.respond(ProtocolStep::Describe)?;
        Ok(self.description.lock().unwrap().clone())
    }

    async fn announce(&self, description: &SessionDescription) -> Result<TransportResponse> {
        *self.announced.lock().unwrap() = Some(description.clone());
        self.respond(ProtocolStep::Announce)
    }

    async fn setup(&self, media: MediaIndex) -> Result<TransportResponse> {
        self.record_call(format!("setup {media}"));
        if *self.fail_step.lock().unwrap() == Some(ProtocolStep::Setup) {
            return Err(SessionError::Protocol {
                step: ProtocolStep::Setup,
                message: "scripted failure".to_string(),
                status_code: Some(461),
            });
        }
        Ok(TransportResponse::ok())
    }

    async fn play(&self) -> Result<TransportResponse> {
        self.respond(ProtocolStep::Play)
    }

    async fn record(&self) -> Result<TransportResponse> {
        self.respond(ProtocolStep::Record)
    }

    fn set_packet_handler(&self, handler: PacketHandler) {
        *self.handler.lock().unwrap() = Some(handler);
    }

    async fn send_packet(&self, media: MediaIndex, packet: &RtpPacket) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SessionError::Disconnected {
                reason: "transport closed".to_string(),
            });
        }
        self.sent.lock().unwrap().push((media, packet.clone()));
        Ok(())
    }

    async fn wait(&self) -> Result<()> {
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return Ok(());
            }
            let notified = self.close_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.closed.load(Ordering::SeqCst) {
                return Ok(());
            }
            notified.await;
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.close_notify.notify_waiters();
    }
}

/// A video media advertising one H.264 format with parameter sets
#[must_use]
pub fn h264_media() -> MediaDescription {
    MediaDescription {
        kind: MediaKind::Video,
        formats: vec![FormatDescriptor::H264(H264Format {
            payload_type: 96,
            sps: Some(Bytes::from_static(b"\x67\x42\x00\x1f")),
            pps: Some(Bytes::from_static(b"\x68\xce\x3c\x80")),
        })],
    }
}

/// An audio media advertising one AAC-LC format (48 kHz stereo)
#[must_use]
pub fn aac_media() -> MediaDescription {
    MediaDescription {
        kind: MediaKind::Audio,
        formats: vec![FormatDescriptor::Mpeg4Audio(Mpeg4AudioFormat {
            payload_type: 97,
            config: AudioSpecificConfig {
                object_type: AudioObjectType::AacLc,
                sample_rate: 48000,
                channel_count: 2,
            },
            size_length: 13,
            index_length: 3,
            index_delta_length: 3,
        })],
    }
}

/// A session advertising one H.264 video and one AAC audio media
#[must_use]
pub fn video_audio_description() -> SessionDescription {
    SessionDescription {
        base_url: None,
        medias: vec![h264_media(), aac_media()],
    }
}
