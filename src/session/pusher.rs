//! Push-side session controller

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, RwLock};
use tracing::{Instrument, debug, error, info_span};
use url::Url;

use super::{PushState, session_ident};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::route::{ControlEvent, OutboundRouter, StreamSubscription};
use crate::transport::{ConnectOptions, RtspTransport};

/// Default handler for non-media events the relay does not consume
pub type ControlHandler = Box<dyn FnMut(ControlEvent) + Send>;

/// Drives one push session: connect, probe, announce, set up, record, then
/// relay outbound events until the source closes or the connection ends.
///
/// Usable behind `Arc`; `close` may be called from any task and promptly
/// unblocks a running session.
pub struct RtspPusher<T> {
    config: SessionConfig,
    transport: Arc<T>,
    state: RwLock<PushState>,
    subscription: Mutex<Option<StreamSubscription>>,
    control: Mutex<Option<ControlHandler>>,
    closed: AtomicBool,
    ident: String,
}

impl<T: RtspTransport> RtspPusher<T> {
    /// Create a pusher over a transport and an upstream subscription
    #[must_use]
    pub fn new(config: SessionConfig, transport: Arc<T>, subscription: StreamSubscription) -> Self {
        Self {
            config,
            transport,
            state: RwLock::new(PushState::Init),
            subscription: Mutex::new(Some(subscription)),
            control: Mutex::new(None),
            closed: AtomicBool::new(false),
            ident: session_ident(),
        }
    }

    /// Install a handler for non-media events
    #[must_use]
    pub fn with_control_handler(self, handler: ControlHandler) -> Self {
        Self {
            control: Mutex::new(Some(handler)),
            ..self
        }
    }

    /// Current lifecycle state
    pub async fn state(&self) -> PushState {
        *self.state.read().await
    }

    async fn set_state(&self, state: PushState) {
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
    /// connect failures, any rejected protocol exchange, a failed outbound
    /// send, or a connection error while running.
    pub async fn run(&self) -> Result<()> {
        let span = info_span!("rtsp_push", session = %self.ident, url = %self.config.remote_url);
        let result = self.drive().instrument(span).await;
        self.set_state(PushState::Closed).await;
        result
    }

    async fn drive(&self) -> Result<()> {
        let Some(mut subscription) = self.subscription.lock().await.take() else {
            return Err(SessionError::InvalidState {
                message: "subscription already consumed".to_string(),
            });
        };

        self.set_state(PushState::Connecting).await;
        let url = Url::parse(&self.config.remote_url).map_err(|e| SessionError::InvalidUrl {
            url: self.config.remote_url.clone(),
            reason: e.to_string(),
        })?;
        self.transport
            .connect(&url, ConnectOptions::push(self.config.write_queue_size))
            .await
            .map_err(|e| {
                error!(error = %e, "connect");
                e
            })?;

        // The probe belongs to the connect step on the push side
        if self.config.send_options {
            self.set_state(PushState::Probing).await;
            let res = self.transport.options().await.map_err(|e| {
                error!(error = %e, "OPTIONS");
                e
            })?;
            debug!(status = res.status, "OPTIONS");
        }

        self.set_state(PushState::Announcing).await;
        let res = self
            .transport
            .announce(&subscription.description)
            .await
            .map_err(|e| {
                error!(error = %e, "ANNOUNCE");
                e
            })?;
        debug!(status = res.status, "ANNOUNCE");

        self.set_state(PushState::SettingUp).await;
        for (media, _) in subscription.description.indexed() {
            let res = self.transport.setup(media).await.map_err(|e| {
                error!(error = %e, %media, "SETUP");
                e
            })?;
            debug!(status = res.status, %media, "SETUP");
        }

        self.set_state(PushState::Recording).await;
        let res = self.transport.record().await.map_err(|e| {
            error!(error = %e, "RECORD");
            e
        })?;
        debug!(status = res.status, "RECORD");

        self.set_state(PushState::Running).await;
        let router = OutboundRouter::new(subscription.video_media, subscription.audio_media);
        let wait = self.transport.wait();
        tokio::pin!(wait);

        loop {
            tokio::select! {
                result = &mut wait => break result,
                maybe = subscription.events.recv() => match maybe {
                    Some(event) => {
                        if let Some(control) =
                            router.relay(self.transport.as_ref(), event).await?
                        {
                            self.handle_control(control).await;
                        }
                    }
                    None => break Ok(()),
                },
            }
        }
    }

    async fn handle_control(&self, control: ControlEvent) {
        match self.control.lock().await.as_mut() {
            Some(handler) => handler(control),
            None => debug!(event = ?control, "unhandled control event"),
        }
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
