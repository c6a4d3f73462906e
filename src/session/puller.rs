//! Pull-side session controller

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use tracing::{Instrument, debug, error, info_span};
use url::Url;

use super::{PullState, session_ident};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::negotiate::{self, TrackMap};
use crate::route::PacketRouter;
use crate::track::StreamRegistry;
use crate::transport::{ConnectOptions, RtspTransport};

/// Drives one pull session: connect, probe, describe, negotiate, set up,
/// play, then route inbound packets until the connection ends.
///
/// Usable behind `Arc`; `close` may be called from any task and promptly
/// unblocks a running session.
pub struct RtspPuller<T> {
    config: SessionConfig,
    transport: Arc<T>,
    registry: Arc<dyn StreamRegistry>,
    state: RwLock<PullState>,
    tracks: RwLock<Option<Arc<TrackMap>>>,
    closed: AtomicBool,
    ident: String,
}

impl<T: RtspTransport> RtspPuller<T> {
    /// Create a puller over a transport and the host engine's registry
    #[must_use]
    pub fn new(
        config: SessionConfig,
        transport: Arc<T>,
        registry: Arc<dyn StreamRegistry>,
    ) -> Self {
        Self {
            config,
            transport,
            registry,
            state: RwLock::new(PullState::Init),
            tracks: RwLock::new(None),
            closed: AtomicBool::new(false),
            ident: session_ident(),
        }
    }

    /// Current lifecycle state
    pub async fn state(&self) -> PullState {
        *self.state.read().await
    }

    /// The negotiated track map, available once negotiation has run
    pub async fn tracks(&self) -> Option<Arc<TrackMap>> {
        self.tracks.read().await.clone()
    }

    async fn set_state(&self, state: PullState) {
        *self.state.write().await = state;
    }

    /// Run the session to completion
    ///
    /// Blocks for the lifetime of the connection; run it on a dedicated
    /// task so other sessions proceed independently.
    ///
    /// # Errors
    ///
    /// Returns the first terminal error of the lifecycle: URL parse or
    /// connect failures, any rejected protocol exchange, or a connection
    /// error while running.
    pub async fn run(&self) -> Result<()> {
        let span = info_span!("rtsp_pull", session = %self.ident, url = %self.config.remote_url);
        let result = self.drive().instrument(span).await;
        self.set_state(PullState::Closed).await;
        result
    }

    async fn drive(&self) -> Result<()> {
        self.set_state(PullState::Connecting).await;
        let url = Url::parse(&self.config.remote_url).map_err(|e| SessionError::InvalidUrl {
            url: self.config.remote_url.clone(),
            reason: e.to_string(),
        })?;
        self.transport
            .connect(&url, ConnectOptions::pull())
            .await
            .map_err(|e| {
                error!(error = %e, "connect");
                e
            })?;

        if self.config.send_options {
            self.set_state(PullState::Probing).await;
            let res = self.transport.options().await.map_err(|e| {
                error!(error = %e, "OPTIONS");
                e
            })?;
            debug!(status = res.status, "OPTIONS");
        }

        self.set_state(PullState::Describing).await;
        let description = self.transport.describe().await.map_err(|e| {
            error!(error = %e, "DESCRIBE");
            e
        })?;
        debug!(medias = description.medias.len(), "DESCRIBE");

        self.set_state(PullState::Negotiating).await;
        let map = Arc::new(negotiate::negotiate(&description, self.registry.as_ref()));
        *self.tracks.write().await = Some(Arc::clone(&map));

        self.set_state(PullState::SettingUp).await;
        for media in map.mapped() {
            let res = self.transport.setup(media).await.map_err(|e| {
                error!(error = %e, %media, "SETUP");
                e
            })?;
            debug!(status = res.status, %media, "SETUP");
        }

        self.set_state(PullState::Playing).await;
        let router = PacketRouter::new(Arc::clone(&map));
        self.transport.set_packet_handler(router.into_handler());
        let res = self.transport.play().await.map_err(|e| {
            error!(error = %e, "PLAY");
            e
        })?;
        debug!(status = res.status, "PLAY");

        self.set_state(PullState::Running).await;
        self.transport.wait().await
    }

    /// Release the connection
    ///
    /// Idempotent and callable from any task; unblocks `run` if it is
    /// waiting on the connection.
    pub async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.transport.close().await;
        }
    }
}
