//! RTSP transport collaborator boundary
//!
//! The wire protocol (request framing, transport negotiation, retransmission)
//! lives behind this trait. The session controllers only issue high-level
//! protocol actions in a fixed order and treat any returned error as terminal
//! for the current lifecycle step.

use async_trait::async_trait;
use url::Url;

use crate::error::Result;
use crate::media::{MediaIndex, SessionDescription};
use crate::rtp::RtpPacket;

/// Callback invoked for every inbound media packet
///
/// Runs on whatever context the transport delivers packets on; must be cheap
/// and must not block.
pub type PacketHandler = Box<dyn Fn(MediaIndex, &RtpPacket) + Send + Sync>;

/// How RTP media travels relative to the control connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// RTP interleaved on the RTSP TCP connection
    TcpInterleaved,
    /// RTP over separate UDP sockets
    Udp,
}

/// Options applied when establishing the connection
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Media transport mode
    pub mode: TransportMode,
    /// Outbound packet queue bound, for push sessions
    pub write_queue_size: Option<usize>,
}

impl ConnectOptions {
    /// TCP-interleaved options for a pull session
    #[must_use]
    pub fn pull() -> Self {
        Self {
            mode: TransportMode::TcpInterleaved,
            write_queue_size: None,
        }
    }

    /// TCP-interleaved options for a push session with the given queue bound
    #[must_use]
    pub fn push(write_queue_size: usize) -> Self {
        Self {
            mode: TransportMode::TcpInterleaved,
            write_queue_size: Some(write_queue_size),
        }
    }
}

/// Response to a protocol operation
///
/// Failures surface as errors; the response object exists for diagnostics.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// RTSP status code
    pub status: u16,
    /// Status reason phrase
    pub reason: String,
}

impl TransportResponse {
    /// A 200 OK response
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: 200,
            reason: "OK".to_string(),
        }
    }

    /// Whether the status code indicates success
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The RTSP wire implementation, as seen by the session controllers
///
/// All methods take `&self`: implementations use interior mutability so that
/// `close` can be invoked from a different task than the one driving the
/// session. `close` must be idempotent and must promptly unblock `wait`.
#[async_trait]
pub trait RtspTransport: Send + Sync {
    /// Establish the transport-layer connection to the target
    async fn connect(&self, url: &Url, options: ConnectOptions) -> Result<()>;

    /// Issue an OPTIONS capability probe
    async fn options(&self) -> Result<TransportResponse>;

    /// Request the remote session description
    async fn describe(&self) -> Result<SessionDescription>;

    /// Send the local session description to the remote peer
    async fn announce(&self, description: &SessionDescription) -> Result<TransportResponse>;

    /// Request resource setup for one media
    async fn setup(&self, media: MediaIndex) -> Result<TransportResponse>;

    /// Ask the peer to start sending media
    async fn play(&self) -> Result<TransportResponse>;

    /// Ask the peer to start accepting media
    async fn record(&self) -> Result<TransportResponse>;

    /// Register the inbound packet callback
    ///
    /// Must be called before `play`; replaces any previous handler.
    fn set_packet_handler(&self, handler: PacketHandler);

    /// Write one outbound media packet for the given media
    async fn send_packet(&self, media: MediaIndex, packet: &RtpPacket) -> Result<()>;

    /// Block until the connection ends
    ///
    /// Resolves `Ok(())` after a local `close`, `Err` when the connection
    /// fails remotely.
    async fn wait(&self) -> Result<()>;

    /// Release the connection
    ///
    /// Idempotent; a second close is a no-op.
    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_success_range() {
        assert!(TransportResponse::ok().is_success());
        assert!(
            !TransportResponse {
                status: 454,
                reason: "Session Not Found".to_string()
            }
            .is_success()
        );
    }

    #[test]
    fn test_connect_options() {
        let pull = ConnectOptions::pull();
        assert_eq!(pull.mode, TransportMode::TcpInterleaved);
        assert!(pull.write_queue_size.is_none());

        let push = ConnectOptions::push(256);
        assert_eq!(push.write_queue_size, Some(256));
    }
}
