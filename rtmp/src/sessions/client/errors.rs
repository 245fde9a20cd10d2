use crate::chunk_io::{ChunkDeserializationError, ChunkSerializationError};
use crate::handshake::HandshakeError;
use crate::messages::{MessageDeserializationError, MessageSerializationError};
use crate::rtmp_url::RtmpUrlError;
use crate::sessions::ClientState;
use std::io;
use thiserror::Error;

/// Error state when a client session encounters an error
/// Represents the type of error that occurred
#[derive(Debug, Error)]
pub enum ClientSessionError {
    /// The transport failed or returned a short read or write
    #[error("An IO error occurred on the session's transport: {0}")]
    Io(#[from] io::Error),

    /// The server closed the connection before the operation completed
    #[error("The connection was closed by the server")]
    ConnectionClosed,

    #[error("The handshake failed: {0}")]
    HandshakeError(#[from] HandshakeError),

    /// Encountered when an error occurs while deserializing the incoming byte data
    #[error("An error occurred deserializing incoming data: {0}")]
    ChunkDeserializationError(#[from] ChunkDeserializationError),

    /// Encountered when an error occurs while serializing outbound messages
    #[error("An error occurred serializing outbound messages: {0}")]
    ChunkSerializationError(#[from] ChunkSerializationError),

    /// Encountered when an error occurs while turning an RTMP message into an message payload
    #[error(
        "An error occurred while attempting to turn an RTMP message into a message payload: {0}"
    )]
    MessageSerializationError(#[from] MessageSerializationError),

    /// Encountered when an error occurs while turning a message payload into an RTMP message
    #[error(
        "An error occurred while attempting to turn a message payload into an RTMP message: {0}"
    )]
    MessageDeserializationError(#[from] MessageDeserializationError),

    #[error("The url could not be used for an RTMP session: {0}")]
    InvalidUrl(#[from] RtmpUrlError),

    /// Encountered if a request is made, or a response is received for a request while the
    /// client session is not in a valid state for that purpose.
    #[error(
        "The request could not be performed while the session is in the {current_state:?} state"
    )]
    SessionInInvalidState { current_state: ClientState },

    /// The local chunk size can only be raised
    #[error("Cannot change the outbound chunk size from {current} to {requested}")]
    InvalidChunkSize { current: u32, requested: u32 },

    /// Publishing and playing require a stream name, which the session's url did not contain
    #[error("The session's url does not contain a stream name")]
    NoStreamName,

    /// The server answered the `connect` request with an `_error`, or closed the connection
    /// before answering it
    #[error("The server rejected the connection request: {description}")]
    ConnectionRejected { description: String },

    /// Encountered when the client requests a stream be created and the server rejects the command
    #[error("An attempt to create a stream on the server failed")]
    CreateStreamFailed,

    /// A response to a `createStream` request should have a numeric as the first parameter
    /// in the additional values property of the amf0 command.  This error is thrown if this is
    /// not present.  Without a stream ID we have no way to know what stream to communicate with
    /// for playback/publishing messages.
    #[error("The server sent a create stream success result without a stream id")]
    CreateStreamResponseHadNoStreamNumber,

    /// When the server sends and `onStatus` message, it is expected that the additional arguments
    /// contains a single value representing an amf0 object.  This is required because the object
    /// should have a `code` property that says the type of operation the status is for.
    #[error("The server sent an onStatus message with invalid arguments")]
    InvalidOnStatusArguments,

    #[error("The server rejected the publish request with {code}: {description}")]
    PublishRejected { code: String, description: String },

    #[error("The server rejected the play request with {code}: {description}")]
    PlayRejected { code: String, description: String },
}

impl ClientSessionError {
    /// Fatal errors leave the connection unusable and move the session into the `Failed` state.
    /// Rejected requests and calls made in the wrong state leave the session where it was.
    pub fn is_fatal(&self) -> bool {
        match self {
            ClientSessionError::SessionInInvalidState { .. }
            | ClientSessionError::InvalidChunkSize { .. }
            | ClientSessionError::NoStreamName
            | ClientSessionError::InvalidUrl(_)
            | ClientSessionError::ConnectionRejected { .. }
            | ClientSessionError::CreateStreamFailed
            | ClientSessionError::PublishRejected { .. }
            | ClientSessionError::PlayRejected { .. } => false,

            _ => true,
        }
    }
}
