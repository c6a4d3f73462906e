//! Session configuration

use serde::{Deserialize, Serialize};

/// Default bound for the outbound packet queue
pub const DEFAULT_WRITE_QUEUE_SIZE: usize = 256;

/// Configuration for an RTSP session
///
/// Embeddable in the host engine's configuration files via serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Remote RTSP URL (`rtsp://host[:port]/path`)
    pub remote_url: String,

    /// Send an OPTIONS capability probe before the main exchange
    /// (default: false)
    pub send_options: bool,

    /// Bound for the outbound packet queue on the push path
    /// (default: 256)
    pub write_queue_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            remote_url: String::new(),
            send_options: false,
            write_queue_size: DEFAULT_WRITE_QUEUE_SIZE,
        }
    }
}

impl SessionConfig {
    /// Create a config for the given remote URL with defaults
    #[must_use]
    pub fn new(remote_url: impl Into<String>) -> Self {
        Self {
            remote_url: remote_url.into(),
            ..Self::default()
        }
    }

    /// Create a new config builder
    #[must_use]
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

/// Builder for `SessionConfig`
#[derive(Debug, Clone, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Set the remote RTSP URL
    #[must_use]
    pub fn remote_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote_url = url.into();
        self
    }

    /// Enable or disable the OPTIONS capability probe
    #[must_use]
    pub fn send_options(mut self, enable: bool) -> Self {
        self.config.send_options = enable;
        self
    }

    /// Set the outbound packet queue bound
    #[must_use]
    pub fn write_queue_size(mut self, size: usize) -> Self {
        self.config.write_queue_size = size;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> SessionConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert!(!config.send_options);
        assert_eq!(config.write_queue_size, DEFAULT_WRITE_QUEUE_SIZE);
    }

    #[test]
    fn test_builder() {
        let config = SessionConfig::builder()
            .remote_url("rtsp://camera.local/stream")
            .send_options(true)
            .write_queue_size(64)
            .build();

        assert_eq!(config.remote_url, "rtsp://camera.local/stream");
        assert!(config.send_options);
        assert_eq!(config.write_queue_size, 64);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"remote_url":"rtsp://10.0.0.7/live"}"#).unwrap();

        assert_eq!(config.remote_url, "rtsp://10.0.0.7/live");
        assert!(!config.send_options);
        assert_eq!(config.write_queue_size, DEFAULT_WRITE_QUEUE_SIZE);
    }
}
