//! Bidirectional packet routing
//!
//! Pure routing keyed on identity negotiated at session start; payload bytes
//! are never transformed here.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace;

use crate::error::Result;
use crate::media::{MediaIndex, SessionDescription};
use crate::negotiate::TrackMap;
use crate::rtp::RtpPacket;
use crate::transport::{PacketHandler, RtspTransport};


/// Non-media events from the host engine's event bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    /// Upstream paused
    Pause,
    /// Upstream resumed
    Resume,
}

/// Application-level events feeding an outbound session
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A video frame already packetized as RTP
    VideoRtp(RtpPacket),
    /// An audio frame already packetized as RTP
    AudioRtp(RtpPacket),
    /// Anything that is not media
    Control(ControlEvent),
}

/// An upstream stream feeding a push session
///
/// The description was negotiated from the upstream source, not from the
/// outbound connection; the sender side of `events` is bounded by the
/// session's configured write queue size.
pub struct StreamSubscription {
    /// Description to announce to the remote peer
    pub description: SessionDescription,
    /// Media carrying video within the description
    pub video_media: Option<MediaIndex>,
    /// Media carrying audio within the description
    pub audio_media: Option<MediaIndex>,
    /// Event stream from the host engine
    pub events: mpsc::Receiver<StreamEvent>,
}

/// Receive-path router: inbound wire packets to negotiated tracks
///
/// Holds the read-only track map; safe to invoke concurrently from the
/// transport's delivery context.
#[derive(Clone)]
pub struct PacketRouter {
    map: Arc<TrackMap>,
}

impl PacketRouter {
    /// Create a router over a negotiated track map
    #[must_use]
    pub fn new(map: Arc<TrackMap>) -> Self {
        Self { map }
    }

    /// Forward one inbound packet to the track bound to its media
    ///
    /// Packets for unmapped media belong to formats negotiation rejected and
    /// are dropped silently; this is expected steady-state behavior.
    pub fn route(&self, media: MediaIndex, packet: &RtpPacket) {
        match self.map.track(media) {
            Some(track) => track.write_packet(packet),
            None => trace!(%media, "dropping packet for unmapped media"),
        }
    }

    /// Convert into the transport's packet callback
    #[must_use]
    pub fn into_handler(self) -> PacketHandler {
        Box::new(move |media, packet| self.route(media, packet))
    }
}

/// Send-path router: application media events to the wire
pub struct OutboundRouter {
    video: Option<MediaIndex>,
    audio: Option<MediaIndex>,
}

impl OutboundRouter {
    /// Create a router over the media bound during setup
    #[must_use]
    pub fn new(video: Option<MediaIndex>, audio: Option<MediaIndex>) -> Self {
        Self { video, audio }
    }

    /// Relay one application event to the wire
    ///
    /// Media events are written to the media bound for their kind; events of
    /// any other kind are handed back to the caller unchanged.
    ///
    /// # Errors
    ///
    /// Propagates transport send failures, which are terminal for the
    /// session.
    pub async fn relay<T: RtspTransport + ?Sized>(
        &self,
        transport: &T,
        event: StreamEvent,
    ) -> Result<Option<ControlEvent>> {
        match event {
            StreamEvent::VideoRtp(packet) => {
                Self::send(transport, self.video, &packet).await?;
                Ok(None)
            }
            StreamEvent::AudioRtp(packet) => {
                Self::send(transport, self.audio, &packet).await?;
                Ok(None)
            }
            StreamEvent::Control(control) => Ok(Some(control)),
        }
    }

    async fn send<T: RtspTransport + ?Sized>(
        transport: &T,
        media: Option<MediaIndex>,
        packet: &RtpPacket,
    ) -> Result<()> {
        match media {
            Some(media) => transport.send_packet(media, packet).await,
            None => {
                trace!("dropping event for unbound media kind");
                Ok(())
            }
        }
    }
}
