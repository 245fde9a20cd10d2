use super::PublishRequestType;
use crate::handshake::HandshakeMode;

/// Configuration options that govern how a RTMP client session should operate
#[derive(Clone, Debug)]
pub struct ClientSessionConfig {
    pub flash_version: String,

    /// The `tcUrl` sent in the connect request.  When not set it is derived from the url the
    /// session was created for.
    pub tc_url: Option<String>,

    /// The outbound chunk size announced after connecting.  The local chunk size can only grow,
    /// so this must be at least 128.
    pub chunk_size: u32,

    pub window_ack_size: u32,
    pub playback_buffer_length_ms: u32,
    pub handshake_mode: HandshakeMode,
    pub publish_type: PublishRequestType,
}

impl ClientSessionConfig {
    /// Creates a new configuration object with default values
    pub fn new() -> ClientSessionConfig {
        ClientSessionConfig {
            flash_version: "WIN 23,0,0,207".to_string(),
            tc_url: None,
            chunk_size: 4096,
            window_ack_size: 2_500_000,
            playback_buffer_length_ms: 2_000,
            handshake_mode: HandshakeMode::Simple,
            publish_type: PublishRequestType::Live,
        }
    }
}

impl Default for ClientSessionConfig {
    fn default() -> Self {
        ClientSessionConfig::new()
    }
}
