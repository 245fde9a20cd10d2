/// The states a client session moves through.
///
/// The happy path is `Created -> Handshaking -> Handshaked -> Connected -> StreamReady ->
/// Publishing | Playing -> Closed`.  Fatal errors move the session into `Failed`, from which
/// the only valid operation is closing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    Created,
    Handshaking,
    Handshaked,

    /// The client has connected to an application on the server
    Connected,

    /// The server created a stream for us but we are not publishing or playing on it yet
    StreamReady { stream_id: u32 },

    /// The server accepted our publish request
    Publishing { stream_id: u32 },

    /// The server accepted our play request
    Playing { stream_id: u32 },

    Closed,
    Failed,
}

impl ClientState {
    /// True when media packets may flow in either direction
    pub fn is_active(self) -> bool {
        match self {
            ClientState::Publishing { .. } | ClientState::Playing { .. } => true,
            _ => false,
        }
    }

    /// The message stream id the server assigned, if one was created
    pub fn stream_id(self) -> Option<u32> {
        match self {
            ClientState::StreamReady { stream_id }
            | ClientState::Publishing { stream_id }
            | ClientState::Playing { stream_id } => Some(stream_id),

            _ => None,
        }
    }
}
