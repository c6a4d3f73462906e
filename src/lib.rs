//! # rtsp-bridge
//!
//! An RTSP client-side session adapter: pulls remote RTSP streams into a
//! host media engine and pushes engine streams out to remote RTSP servers.
//!
//! The crate owns the session lifecycles, the format-to-track negotiation,
//! and the bidirectional packet routing. The RTSP wire protocol, the
//! engine's track registry, and the engine's event bus are collaborators
//! behind traits.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use rtsp_bridge::{RtspPuller, SessionConfig};
//! # use rtsp_bridge::testing::{RecordingRegistry, ScriptedTransport};
//!
//! # async fn example() -> rtsp_bridge::Result<()> {
//! # let transport = Arc::new(ScriptedTransport::new());
//! # let registry = Arc::new(RecordingRegistry::new());
//! let config = SessionConfig::builder()
//!     .remote_url("rtsp://camera.local/stream")
//!     .build();
//!
//! let puller = Arc::new(RtspPuller::new(config, transport, registry));
//! puller.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Controllers**: [`RtspPuller`] / [`RtspPusher`] drive one connection
//!   each through a strictly ordered lifecycle
//! - **Negotiation**: [`negotiate::negotiate`] maps advertised formats to
//!   engine tracks once per session
//! - **Routing**: [`route`] forwards packets both ways keyed on negotiated
//!   identity

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Session configuration
pub mod config;
/// Error types
pub mod error;
/// Session and media descriptions
pub mod media;
/// Format negotiation
pub mod negotiate;
/// Packet routing
pub mod route;
/// RTP packet model
pub mod rtp;
/// Session controllers
pub mod session;
/// Track registry boundary
pub mod track;
/// Transport boundary
pub mod transport;

/// Testing utilities
pub mod testing;

// Re-exports
pub use config::SessionConfig;
pub use error::{ProtocolStep, Result, SessionError};
pub use media::{FormatDescriptor, MediaDescription, MediaIndex, SessionDescription};
pub use negotiate::TrackMap;
pub use route::{ControlEvent, StreamEvent, StreamSubscription};
pub use rtp::RtpPacket;
pub use session::{PullState, PushState, RtspPuller, RtspPusher};
pub use track::{MediaTrack, StreamRegistry, TrackSpec};
pub use transport::{RtspTransport, TransportResponse};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
