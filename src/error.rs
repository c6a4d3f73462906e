use std::io;
use thiserror::Error;

/// Protocol exchange a session failure occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolStep {
    /// OPTIONS capability probe
    Options,
    /// DESCRIBE request
    Describe,
    /// ANNOUNCE request
    Announce,
    /// SETUP request
    Setup,
    /// PLAY request
    Play,
    /// RECORD request
    Record,
}

impl ProtocolStep {
    /// Wire method name for this step
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Options => "OPTIONS",
            Self::Describe => "DESCRIBE",
            Self::Announce => "ANNOUNCE",
            Self::Setup => "SETUP",
            Self::Play => "PLAY",
            Self::Record => "RECORD",
        }
    }
}

impl std::fmt::Display for ProtocolStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can terminate an RTSP session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Remote URL could not be parsed
    #[error("invalid URL: {url} - {reason}")]
    InvalidUrl {
        /// The URL that failed to parse
        url: String,
        /// Reason why it is invalid
        reason: String,
    },

    /// Failed to establish the transport connection
    #[error("connection failed to {target}: {message}")]
    ConnectionFailed {
        /// The remote target
        target: String,
        /// Description of the failure
        message: String,
        /// The underlying source of the error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A protocol exchange was rejected or failed
    #[error("{step} failed: {message}")]
    Protocol {
        /// The lifecycle step that failed
        step: ProtocolStep,
        /// Description of the error
        message: String,
        /// RTSP status code if the peer answered
        status_code: Option<u16>,
    },

    /// The connection ended while the session was running
    #[error("connection closed: {reason}")]
    Disconnected {
        /// Why the connection ended
        reason: String,
    },

    /// Network I/O error
    #[error("network error: {0}")]
    Network(#[from] io::Error),

    /// Operation not valid in the current session state
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of why the state is invalid
        message: String,
    },
}

impl SessionError {
    /// Build a protocol-step failure from a status line
    #[must_use]
    pub fn protocol(step: ProtocolStep, message: impl Into<String>) -> Self {
        Self::Protocol {
            step,
            message: message.into(),
            status_code: None,
        }
    }

    /// Check if this error indicates connection loss
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            Self::Disconnected { .. } | Self::ConnectionFailed { .. } | Self::Network(_)
        )
    }
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SessionError::protocol(ProtocolStep::Describe, "454 Session Not Found");
        assert_eq!(err.to_string(), "DESCRIBE failed: 454 Session Not Found");
    }

    #[test]
    fn test_step_names() {
        assert_eq!(ProtocolStep::Options.as_str(), "OPTIONS");
        assert_eq!(ProtocolStep::Record.to_string(), "RECORD");
    }

    #[test]
    fn test_error_is_connection_lost() {
        let err = SessionError::Disconnected {
            reason: "EOF".to_string(),
        };
        assert!(err.is_connection_lost());

        let err = SessionError::protocol(ProtocolStep::Play, "rejected");
        assert!(!err.is_connection_lost());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err: SessionError = io_err.into();

        assert!(matches!(err, SessionError::Network(_)));
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SessionError>();
    }
}
