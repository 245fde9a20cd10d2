/*!
A blocking RTMP client session.

A `ClientSession` owns a byte stream transport (anything that is `Read + Write`, usually a
`TcpStream`) and walks it through the stages of an RTMP conversation:

1. `perform_handshake()` exchanges the C0/C1/S0/S1/S2/C2 packets
2. `connect_app()` connects to the application named in the url
3. `publish_stream()` or `play_stream()` creates a stream and requests publishing or playback
   of the url's stream name on it
4. `write_packet()` / `read_packet()` exchange audio, video and script data

Every operation blocks until it has completed or failed.  Protocol control messages
(chunk size changes, acknowledgements, pings, etc.) are handled inside those calls and are
never handed back to the caller.

Errors that leave the connection unusable (transport failures, bad handshakes, malformed
chunks) move the session into the `Failed` state.  A request the server rejects leaves the
session in the state it was in.
*/

mod config;
mod connection;
mod errors;
mod media_packet;
mod publish_request_type;
mod state;


pub use self::config::ClientSessionConfig;
pub use self::errors::ClientSessionError;
pub use self::media_packet::{type_to_string, MediaPacket, MediaPacketType};
pub use self::publish_request_type::PublishRequestType;
pub use self::state::ClientState;

use self::connection::Connection;
use crate::chunk_io::INITIAL_MAX_CHUNK_SIZE;
use crate::handshake::{Handshake, HandshakeProcessResult};
use crate::messages::{
    MessageDeserializationError, MessagePayload, RtmpMessage, UserControlEventType,
};
use crate::rtmp_url::RtmpUrl;
use crate::sessions::StreamMetadata;
use crate::time::RtmpTimestamp;
use bytes::Bytes;
use log::{debug, error, info, warn};
use rcl_amf0::{Amf0Object, Amf0Value};
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::TcpStream;

const CONNECT_TRANSACTION_ID: f64 = 1.0;
const CREATE_STREAM_TRANSACTION_ID: f64 = 2.0;

/// `play`, `publish` and `deleteStream` are answered with `onStatus` (if at all), not a result
const NO_RESULT_TRANSACTION_ID: f64 = 0.0;

const PLAY_START_CODE: &str = "NetStream.Play.Start";
const PUBLISH_START_CODE: &str = "NetStream.Publish.Start";

struct Command {
    name: String,
    transaction_id: f64,
    arguments: Vec<Amf0Value>,
}

impl Command {
    /// Looks for a string property in any of the command's object arguments
    fn status_property(&self, name: &str) -> Option<&str> {
        self.arguments
            .iter()
            .filter_map(|argument| argument.get_property(name))
            .filter_map(|value| value.as_str())
            .next()
    }

    fn description(&self) -> String {
        self.status_property("description")
            .or_else(|| self.status_property("code"))
            .unwrap_or("no description given")
            .to_string()
    }
}

enum ReceivedMessage {
    Command(Command),
    Media(MediaPacket),
}

/// A session that acts as the client side of a single RTMP connection
pub struct ClientSession<T: Read + Write> {
    connection: Connection<T>,
    config: ClientSessionConfig,
    url: RtmpUrl,
    state: ClientState,
    peer_bandwidth: Option<u32>,
    queued_packets: VecDeque<MediaPacket>,
}

impl ClientSession<TcpStream> {
    /// Parses the url and opens a TCP connection to the host it names.  The returned session
    /// still needs to perform the handshake.
    pub fn connect_tcp(
        url: &str,
        config: ClientSessionConfig,
    ) -> Result<ClientSession<TcpStream>, ClientSessionError> {
        let url = RtmpUrl::parse(url)?;

        info!("Opening TCP connection to {}:{}", url.host, url.port);
        let stream = TcpStream::connect((url.host.as_str(), url.port))?;
        stream.set_nodelay(true)?;

        Ok(ClientSession::new(stream, url, config))
    }
}

impl<T: Read + Write> ClientSession<T> {
    /// Creates a new session over an already established transport
    pub fn new(transport: T, url: RtmpUrl, config: ClientSessionConfig) -> ClientSession<T> {
        ClientSession {
            connection: Connection::new(transport),
            config,
            url,
            state: ClientState::Created,
            peer_bandwidth: None,
            queued_packets: VecDeque::new(),
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn url(&self) -> &RtmpUrl {
        &self.url
    }

    pub fn config(&self) -> &ClientSessionConfig {
        &self.config
    }

    /// The message stream id the server assigned to us
    pub fn stream_id(&self) -> Option<u32> {
        self.state.stream_id()
    }

    /// The bandwidth limit most recently requested by the server
    pub fn peer_bandwidth(&self) -> Option<u32> {
        self.peer_bandwidth
    }

    /// The window the server asked us to acknowledge received bytes at
    pub fn peer_window_ack_size(&self) -> Option<u32> {
        self.connection.peer_window_ack_size()
    }

    pub fn local_chunk_size(&self) -> u32 {
        self.connection.local_chunk_size()
    }

    pub fn remote_chunk_size(&self) -> usize {
        self.connection.remote_chunk_size()
    }

    /// Total bytes received since the handshake completed
    pub fn total_bytes_received(&self) -> u64 {
        self.connection.total_bytes_received()
    }

    pub fn get_ref(&self) -> &T {
        self.connection.get_ref()
    }

    /// Gives up the session, returning its transport
    pub fn into_inner(self) -> T {
        self.connection.into_inner()
    }

    /// Performs the RTMP handshake with the server, using the configured handshake mode
    pub fn perform_handshake(&mut self) -> Result<(), ClientSessionError> {
        if self.state != ClientState::Created {
            return Err(self.invalid_state());
        }

        self.set_state(ClientState::Handshaking);
        let result = self.exchange_handshake();
        self.track(result)?;

        self.set_state(ClientState::Handshaked);
        Ok(())
    }

    /// Connects to the application specified by the session's url.  Fails with
    /// `ConnectionRejected` if the server answers with an `_error`.
    pub fn connect_app(&mut self) -> Result<(), ClientSessionError> {
        if self.state != ClientState::Handshaked {
            return Err(self.invalid_state());
        }

        if self.config.chunk_size < INITIAL_MAX_CHUNK_SIZE {
            return Err(ClientSessionError::InvalidChunkSize {
                current: INITIAL_MAX_CHUNK_SIZE,
                requested: self.config.chunk_size,
            });
        }

        let result = match self.request_connection() {
            Err(ClientSessionError::ConnectionClosed) => {
                // Nothing left to retry on, so the session fails even though this is a rejection
                error!("Connection closed before the connect request was answered");
                self.set_state(ClientState::Failed);
                return Err(ClientSessionError::ConnectionRejected {
                    description: "connection closed before connect result".to_string(),
                });
            }

            result => result,
        };

        self.track(result)?;
        self.set_state(ClientState::Connected);
        Ok(())
    }

    /// Requests playback of the url's stream.  Once this succeeds the session is in the
    /// `Playing` state and `read_packet()` returns the stream's media.
    pub fn play_stream(&mut self) -> Result<(), ClientSessionError> {
        let stream_id = self.prepare_stream()?;
        let result = self.request_playback(stream_id);
        self.track(result)?;

        self.set_state(ClientState::Playing { stream_id });
        Ok(())
    }

    /// Requests to publish on the url's stream.  Once this succeeds the session is in the
    /// `Publishing` state and media can be sent with `write_packet()`.
    pub fn publish_stream(&mut self) -> Result<(), ClientSessionError> {
        let stream_id = self.prepare_stream()?;
        let result = self.request_publishing(stream_id);
        self.track(result)?;

        self.set_state(ClientState::Publishing { stream_id });
        Ok(())
    }

    /// Blocks until the next audio, video or script data packet arrives.  Packets that arrived
    /// while a play or publish request was still waiting on the server are returned first.
    pub fn read_packet(&mut self) -> Result<MediaPacket, ClientSessionError> {
        if !self.state.is_active() {
            return Err(self.invalid_state());
        }

        if let Some(packet) = self.queued_packets.pop_front() {
            return Ok(packet);
        }

        let result = self.next_media_packet();
        self.track(result)
    }

    /// Sends a media packet on the stream being published.  The data is copied, the caller
    /// keeps ownership of it whether or not the write succeeds.
    pub fn write_packet(
        &mut self,
        packet_type: MediaPacketType,
        timestamp: RtmpTimestamp,
        data: &[u8],
    ) -> Result<(), ClientSessionError> {
        let stream_id = self.publishing_stream_id()?;
        let payload = MessagePayload {
            timestamp,
            type_id: packet_type.type_id(),
            message_stream_id: stream_id,
            data: Bytes::copy_from_slice(data),
        };

        let result = self.connection.write_payload(&payload);
        self.track(result)
    }

    /// Sends an `@setDataFrame` message so the server relays the stream's metadata to players
    pub fn publish_metadata(&mut self, metadata: &StreamMetadata) -> Result<(), ClientSessionError> {
        let stream_id = self.publishing_stream_id()?;
        let message = RtmpMessage::Amf0Data {
            values: vec![
                Amf0Value::Utf8String("@setDataFrame".to_string()),
                Amf0Value::Utf8String("onMetaData".to_string()),
                Amf0Value::Object(metadata.to_amf0_object()),
            ],
        };

        let result = self
            .connection
            .write_message(message, stream_id, RtmpTimestamp::new(0));

        self.track(result)
    }

    /// Closes the session.  If a stream was created the server is told to delete it.  Closing
    /// an already closed session does nothing.
    pub fn close(&mut self) -> Result<(), ClientSessionError> {
        let stream_id = match self.state {
            ClientState::Closed => return Ok(()),
            ClientState::Failed => None,
            state => state.stream_id(),
        };

        self.set_state(ClientState::Closed);
        if let Some(stream_id) = stream_id {
            info!("Deleting stream {}", stream_id);
            self.send_command(
                "deleteStream",
                NO_RESULT_TRANSACTION_ID,
                vec![Amf0Value::Number(stream_id as f64)],
                stream_id,
            )?;
        }

        Ok(())
    }

    fn exchange_handshake(&mut self) -> Result<(), ClientSessionError> {
        let mut handshake = Handshake::new(self.config.handshake_mode);
        let c0_and_c1 = handshake.generate_outbound_c0_and_c1()?;
        self.connection.write_raw(&c0_and_c1)?;

        loop {
            let mut buffer = vec![0_u8; handshake.bytes_needed()];
            self.connection.read_raw_exact(&mut buffer)?;

            match handshake.process_bytes(&buffer)? {
                HandshakeProcessResult::InProgress { response_bytes } => {
                    if !response_bytes.is_empty() {
                        self.connection.write_raw(&response_bytes)?;
                    }
                }

                HandshakeProcessResult::Completed {
                    response_bytes,
                    remaining_bytes,
                } => {
                    self.connection.write_raw(&response_bytes)?;
                    self.connection.push_unprocessed_bytes(remaining_bytes);
                    return Ok(());
                }
            }
        }
    }

    fn request_connection(&mut self) -> Result<(), ClientSessionError> {
        let tc_url = match self.config.tc_url {
            Some(ref tc_url) => tc_url.clone(),
            None => self.url.tc_url(),
        };

        let mut properties = Amf0Object::new();
        properties.insert("app", Amf0Value::Utf8String(self.url.app.clone()));
        properties.insert(
            "flashVer",
            Amf0Value::Utf8String(self.config.flash_version.clone()),
        );
        properties.insert("tcUrl", Amf0Value::Utf8String(tc_url.clone()));
        properties.insert("fpad", Amf0Value::Boolean(false));
        properties.insert("capabilities", Amf0Value::Number(15.0));
        properties.insert("audioCodecs", Amf0Value::Number(3191.0));
        properties.insert("videoCodecs", Amf0Value::Number(252.0));
        properties.insert("videoFunction", Amf0Value::Number(1.0));
        properties.insert("objectEncoding", Amf0Value::Number(0.0));

        info!("Connecting to app '{}' via {}", self.url.app, tc_url);
        let message = RtmpMessage::Amf0Command {
            command_name: "connect".to_string(),
            transaction_id: CONNECT_TRANSACTION_ID,
            command_object: Amf0Value::Object(properties),
            additional_arguments: Vec::new(),
        };

        self.connection
            .write_message(message, 0, RtmpTimestamp::new(0))?;

        loop {
            let command = self.next_command()?;
            if command.transaction_id != CONNECT_TRANSACTION_ID {
                ignore_command(&command);
                continue;
            }

            match command.name.as_str() {
                "_result" => break,
                "_error" => {
                    return Err(ClientSessionError::ConnectionRejected {
                        description: command.description(),
                    })
                }

                _ => ignore_command(&command),
            }
        }

        self.connection.write_message(
            RtmpMessage::WindowAcknowledgement {
                size: self.config.window_ack_size,
            },
            0,
            RtmpTimestamp::new(0),
        )?;

        self.connection.set_local_chunk_size(self.config.chunk_size)?;
        Ok(())
    }

    /// Makes sure a stream exists to publish or play on, creating one if needed
    fn prepare_stream(&mut self) -> Result<u32, ClientSessionError> {
        if self.url.stream.is_none() {
            return Err(ClientSessionError::NoStreamName);
        }

        match self.state {
            ClientState::StreamReady { stream_id } => Ok(stream_id),
            ClientState::Connected => {
                let result = self.create_stream();
                let stream_id = self.track(result)?;

                self.set_state(ClientState::StreamReady { stream_id });
                Ok(stream_id)
            }

            _ => Err(self.invalid_state()),
        }
    }

    fn create_stream(&mut self) -> Result<u32, ClientSessionError> {
        self.send_command(
            "createStream",
            CREATE_STREAM_TRANSACTION_ID,
            Vec::new(),
            0,
        )?;

        loop {
            let command = self.next_command()?;
            if command.transaction_id != CREATE_STREAM_TRANSACTION_ID {
                ignore_command(&command);
                continue;
            }

            match command.name.as_str() {
                "_result" => {
                    return match command.arguments.first().and_then(|x| x.as_number()) {
                        Some(stream_id) => Ok(stream_id as u32),
                        None => Err(ClientSessionError::CreateStreamResponseHadNoStreamNumber),
                    };
                }

                "_error" => return Err(ClientSessionError::CreateStreamFailed),
                _ => ignore_command(&command),
            }
        }
    }

    fn request_playback(&mut self, stream_id: u32) -> Result<(), ClientSessionError> {
        let stream_name = self.stream_name()?;

        info!("Requesting playback of '{}' on stream {}", stream_name, stream_id);
        self.send_command(
            "play",
            NO_RESULT_TRANSACTION_ID,
            vec![Amf0Value::Utf8String(stream_name)],
            stream_id,
        )?;

        self.connection.write_message(
            RtmpMessage::UserControl {
                event_type: UserControlEventType::SetBufferLength,
                stream_id: Some(stream_id),
                buffer_length: Some(self.config.playback_buffer_length_ms),
                timestamp: None,
            },
            0,
            RtmpTimestamp::new(0),
        )?;

        self.wait_for_status(PLAY_START_CODE, |code, description| {
            ClientSessionError::PlayRejected { code, description }
        })
    }

    fn request_publishing(&mut self, stream_id: u32) -> Result<(), ClientSessionError> {
        let stream_name = self.stream_name()?;
        let publish_type = self.config.publish_type.as_str();

        info!(
            "Requesting to publish '{}' ({}) on stream {}",
            stream_name, publish_type, stream_id
        );

        self.send_command(
            "publish",
            NO_RESULT_TRANSACTION_ID,
            vec![
                Amf0Value::Utf8String(stream_name),
                Amf0Value::Utf8String(publish_type.to_string()),
            ],
            stream_id,
        )?;

        self.wait_for_status(PUBLISH_START_CODE, |code, description| {
            ClientSessionError::PublishRejected { code, description }
        })
    }

    /// Reads commands until an `onStatus` with the expected code arrives.  Error level statuses
    /// and `_error` responses are turned into the rejection error.
    fn wait_for_status<F>(&mut self, expected_code: &str, rejection: F) -> Result<(), ClientSessionError>
    where
        F: Fn(String, String) -> ClientSessionError,
    {
        loop {
            let command = self.next_command()?;
            match command.name.as_str() {
                "onStatus" => {
                    let status = match command.arguments.first() {
                        Some(status) if status.is_object() => status,
                        _ => return Err(ClientSessionError::InvalidOnStatusArguments),
                    };

                    let code = match status.get_property("code").and_then(|x| x.as_str()) {
                        Some(code) => code,
                        None => return Err(ClientSessionError::InvalidOnStatusArguments),
                    };

                    if code == expected_code {
                        return Ok(());
                    }

                    let level = status.get_property("level").and_then(|x| x.as_str());
                    if level == Some("error") {
                        return Err(rejection(code.to_string(), command.description()));
                    }

                    debug!("Received status {} while waiting for {}", code, expected_code);
                }

                "_error" => return Err(rejection(command.name.clone(), command.description())),
                _ => ignore_command(&command),
            }
        }
    }

    fn next_media_packet(&mut self) -> Result<MediaPacket, ClientSessionError> {
        loop {
            match self.receive()? {
                ReceivedMessage::Media(packet) => return Ok(packet),
                ReceivedMessage::Command(command) => {
                    if let Some(code) = command.status_property("code") {
                        info!("Stream status changed: {}", code);
                    } else {
                        ignore_command(&command);
                    }
                }
            }
        }
    }

    /// Reads until a command arrives, queueing any media received before it
    fn next_command(&mut self) -> Result<Command, ClientSessionError> {
        loop {
            match self.receive()? {
                ReceivedMessage::Command(command) => return Ok(command),
                ReceivedMessage::Media(packet) => {
                    debug!(
                        "Queueing {} packet received ahead of a command response",
                        packet.packet_type.as_str()
                    );

                    self.queued_packets.push_back(packet);
                }
            }
        }
    }

    /// Reads messages until one that is not a protocol control message arrives
    fn receive(&mut self) -> Result<ReceivedMessage, ClientSessionError> {
        loop {
            let payload = self.connection.read_payload()?;
            if let Some(packet_type) = MediaPacketType::from_type_id(payload.type_id) {
                return Ok(ReceivedMessage::Media(MediaPacket {
                    packet_type,
                    timestamp: payload.timestamp,
                    data: payload.data,
                }));
            }

            let message = match payload.to_rtmp_message() {
                Ok(message) => message,
                Err(MessageDeserializationError::UnknownMessageType { type_id }) => {
                    warn!(
                        "Skipping message with unsupported type id {} on stream {}",
                        type_id, payload.message_stream_id
                    );

                    continue;
                }

                Err(error) => return Err(error.into()),
            };

            match message {
                RtmpMessage::Amf0Command {
                    command_name,
                    transaction_id,
                    command_object: _,
                    additional_arguments,
                } => {
                    return Ok(ReceivedMessage::Command(Command {
                        name: command_name,
                        transaction_id,
                        arguments: additional_arguments,
                    }))
                }

                message => self.handle_protocol_control(message)?,
            }
        }
    }

    fn handle_protocol_control(&mut self, message: RtmpMessage) -> Result<(), ClientSessionError> {
        match message {
            RtmpMessage::SetChunkSize { size } => {
                debug!("Server changed its chunk size to {}", size);
                self.connection.set_remote_chunk_size(size)?;
            }

            RtmpMessage::Abort { chunk_stream_id } => {
                debug!("Server aborted the message on chunk stream {}", chunk_stream_id);
                self.connection.abort_message(chunk_stream_id);
            }

            RtmpMessage::Acknowledgement { sequence_number } => {
                debug!("Server acknowledged {} bytes", sequence_number);
            }

            RtmpMessage::WindowAcknowledgement { size } => {
                debug!("Server window acknowledgement size is {}", size);
                self.connection.set_peer_window_ack_size(size);
            }

            RtmpMessage::SetPeerBandwidth { size, limit_type } => {
                debug!("Server set peer bandwidth to {} ({:?})", size, limit_type);
                self.peer_bandwidth = Some(size);
                self.connection.write_message(
                    RtmpMessage::WindowAcknowledgement {
                        size: self.config.window_ack_size,
                    },
                    0,
                    RtmpTimestamp::new(0),
                )?;
            }

            RtmpMessage::UserControl {
                event_type: UserControlEventType::PingRequest,
                timestamp,
                ..
            } => {
                debug!("Responding to ping request");
                self.connection.write_message(
                    RtmpMessage::UserControl {
                        event_type: UserControlEventType::PingResponse,
                        stream_id: None,
                        buffer_length: None,
                        timestamp,
                    },
                    0,
                    RtmpTimestamp::new(0),
                )?;
            }

            RtmpMessage::UserControl {
                event_type,
                stream_id,
                ..
            } => {
                debug!("Received {:?} event for stream {:?}", event_type, stream_id);
            }

            message => warn!("Unhandled message received: {:?}", message),
        }

        Ok(())
    }

    fn send_command(
        &mut self,
        name: &str,
        transaction_id: f64,
        arguments: Vec<Amf0Value>,
        message_stream_id: u32,
    ) -> Result<(), ClientSessionError> {
        let message = RtmpMessage::Amf0Command {
            command_name: name.to_string(),
            transaction_id,
            command_object: Amf0Value::Null,
            additional_arguments: arguments,
        };

        self.connection
            .write_message(message, message_stream_id, RtmpTimestamp::new(0))
    }

    fn stream_name(&self) -> Result<String, ClientSessionError> {
        self.url
            .stream
            .clone()
            .ok_or(ClientSessionError::NoStreamName)
    }

    fn publishing_stream_id(&self) -> Result<u32, ClientSessionError> {
        match self.state {
            ClientState::Publishing { stream_id } => Ok(stream_id),
            _ => Err(self.invalid_state()),
        }
    }

    fn invalid_state(&self) -> ClientSessionError {
        ClientSessionError::SessionInInvalidState {
            current_state: self.state,
        }
    }

    fn set_state(&mut self, state: ClientState) {
        if self.state != state {
            info!("Client session state changed from {:?} to {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Moves the session into the failed state when the result holds a fatal error
    fn track<R>(&mut self, result: Result<R, ClientSessionError>) -> Result<R, ClientSessionError> {
        if let Err(ref error) = result {
            if error.is_fatal() {
                error!("Client session failed: {}", error);
                self.set_state(ClientState::Failed);
            }
        }

        result
    }
}

fn ignore_command(command: &Command) {
    debug!(
        "Ignoring '{}' command with transaction id {}",
        command.name, command.transaction_id
    );
}
