use std::io;
use thiserror::Error;

/// Errors that can occur while performing the RTMP handshake.  All of them are terminal, the
/// handshake (and the connection it was for) cannot be reused afterwards.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The RTMP specification requires the first byte sent by the peer (S0) to be 3
    #[error("First byte of the handshake did not start with a 3, found {version}")]
    BadVersionId { version: u8 },

    /// The digest embedded in the peer's S1 packet did not match either digest layout
    #[error("The peer's handshake packet did not contain a valid digest")]
    InvalidPeerDigest,

    /// The digest implementation could not be keyed
    #[error("The handshake digest could not be computed")]
    DigestKeyRejected,

    /// Bytes were processed after the handshake already completed
    #[error("Handshake is already completed")]
    HandshakeAlreadyCompleted,

    /// Bytes were processed after the handshake had already failed
    #[error("Handshake has already failed and cannot be resumed")]
    HandshakeAlreadyFailed,

    #[error("An IO error occurred during the handshake: {0}")]
    Io(#[from] io::Error),
}
