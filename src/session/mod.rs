//! Session controllers
//!
//! One controller owns one connection and one negotiated format mapping.
//! Lifecycles are strictly ordered with no branching back; any protocol
//! failure is terminal at the step it occurs in.

mod puller;
mod pusher;

#[cfg(test)]
mod tests;

pub use puller::RtspPuller;
pub use pusher::{ControlHandler, RtspPusher};

/// Pull session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullState {
    /// Not yet started
    Init,
    /// Resolving the target and establishing the connection
    Connecting,
    /// OPTIONS capability probe in flight
    Probing,
    /// DESCRIBE in flight
    Describing,
    /// Resolving advertised formats into tracks
    Negotiating,
    /// SETUP in flight for negotiated media
    SettingUp,
    /// PLAY in flight
    Playing,
    /// Steady state, processing inbound packets
    Running,
    /// Connection released
    Closed,
}

/// Push session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    /// Not yet started
    Init,
    /// Resolving the target and establishing the connection
    Connecting,
    /// OPTIONS capability probe in flight
    Probing,
    /// ANNOUNCE in flight
    Announcing,
    /// SETUP in flight for announced media
    SettingUp,
    /// RECORD in flight
    Recording,
    /// Steady state, relaying outbound events
    Running,
    /// Connection released
    Closed,
}

impl PullState {
    /// Whether the session is in its steady state
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl PushState {
    /// Whether the session is in its steady state
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Generate a session identifier for log spans
pub(crate) fn session_ident() -> String {
    format!("{:016X}", rand::random::<u64>())
}
