use super::ClientSessionError;
use crate::chunk_io::{ChunkDeserializer, ChunkSerializer};
use crate::messages::{MessagePayload, RtmpMessage};
use crate::time::RtmpTimestamp;
use log::{debug, trace};
use std::io::{ErrorKind, Read, Write};
use std::mem;

const READ_BUFFER_SIZE: usize = 4096;

/// Owns the transport along with the chunk state for both directions of a connection.
///
/// All protocol control messages are written on message stream 0 with a zero timestamp.
pub struct Connection<T> {
    transport: T,
    serializer: ChunkSerializer,
    deserializer: ChunkDeserializer,
    read_buffer: Vec<u8>,
    unprocessed_bytes: Vec<u8>,
    total_bytes_received: u64,
    bytes_received_since_ack: u64,
    peer_window_ack_size: Option<u32>,
}

impl<T: Read + Write> Connection<T> {
    pub fn new(transport: T) -> Connection<T> {
        Connection {
            transport,
            serializer: ChunkSerializer::new(),
            deserializer: ChunkDeserializer::new(),
            read_buffer: vec![0; READ_BUFFER_SIZE],
            unprocessed_bytes: Vec::new(),
            total_bytes_received: 0,
            bytes_received_since_ack: 0,
            peer_window_ack_size: None,
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Writes bytes that are not chunked, such as handshake packets
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), ClientSessionError> {
        self.transport.write_all(bytes)?;
        self.transport.flush()?;
        Ok(())
    }

    /// Fills the buffer with bytes that are not chunked, such as handshake packets
    pub fn read_raw_exact(&mut self, buffer: &mut [u8]) -> Result<(), ClientSessionError> {
        match self.transport.read_exact(buffer) {
            Ok(()) => Ok(()),
            Err(ref error) if error.kind() == ErrorKind::UnexpectedEof => {
                Err(ClientSessionError::ConnectionClosed)
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Queues bytes that were already read from the transport but belong to the chunk stream
    pub fn push_unprocessed_bytes(&mut self, bytes: Vec<u8>) {
        self.unprocessed_bytes.extend(bytes);
    }

    /// Blocks until a complete message has been received
    pub fn read_payload(&mut self) -> Result<MessagePayload, ClientSessionError> {
        if !self.unprocessed_bytes.is_empty() {
            let bytes = mem::replace(&mut self.unprocessed_bytes, Vec::new());
            self.record_bytes_received(bytes.len())?;
            if let Some(payload) = self.deserializer.get_next_message(&bytes)? {
                return Ok(payload);
            }
        }

        loop {
            if let Some(payload) = self.deserializer.get_next_message(&[])? {
                return Ok(payload);
            }

            let count = match self.transport.read(&mut self.read_buffer) {
                Ok(0) => return Err(ClientSessionError::ConnectionClosed),
                Ok(count) => count,
                Err(ref error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => return Err(error.into()),
            };

            trace!("Read {} bytes from the transport", count);
            self.record_bytes_received(count)?;
            if let Some(payload) = self.deserializer.get_next_message(&self.read_buffer[..count])? {
                return Ok(payload);
            }
        }
    }

    pub fn write_message(
        &mut self,
        message: RtmpMessage,
        message_stream_id: u32,
        timestamp: RtmpTimestamp,
    ) -> Result<(), ClientSessionError> {
        let payload = message.into_message_payload(timestamp, message_stream_id)?;
        self.write_payload(&payload)
    }

    pub fn write_payload(&mut self, payload: &MessagePayload) -> Result<(), ClientSessionError> {
        let packet = self.serializer.serialize(payload, false)?;
        self.write_raw(&packet.bytes)
    }

    /// Raises the size of chunks we send, announcing the change to the peer first
    pub fn set_local_chunk_size(&mut self, size: u32) -> Result<(), ClientSessionError> {
        let current = self.serializer.get_max_chunk_size();
        if size < current {
            return Err(ClientSessionError::InvalidChunkSize {
                current,
                requested: size,
            });
        }

        if size == current {
            return Ok(());
        }

        let packet = self
            .serializer
            .set_max_chunk_size(size, RtmpTimestamp::new(0))?;

        self.write_raw(&packet.bytes)
    }

    pub fn local_chunk_size(&self) -> u32 {
        self.serializer.get_max_chunk_size()
    }

    pub fn set_remote_chunk_size(&mut self, size: u32) -> Result<(), ClientSessionError> {
        self.deserializer.set_max_chunk_size(size)?;
        Ok(())
    }

    pub fn remote_chunk_size(&self) -> usize {
        self.deserializer.get_max_chunk_size()
    }

    pub fn abort_message(&mut self, csid: u32) {
        self.deserializer.abort_message(csid);
    }

    pub fn set_peer_window_ack_size(&mut self, size: u32) {
        self.peer_window_ack_size = Some(size);
    }

    pub fn peer_window_ack_size(&self) -> Option<u32> {
        self.peer_window_ack_size
    }

    pub fn total_bytes_received(&self) -> u64 {
        self.total_bytes_received
    }

    fn record_bytes_received(&mut self, count: usize) -> Result<(), ClientSessionError> {
        self.total_bytes_received += count as u64;
        self.bytes_received_since_ack += count as u64;

        let window = match self.peer_window_ack_size {
            Some(window) if window > 0 => u64::from(window),
            _ => return Ok(()),
        };

        if self.bytes_received_since_ack >= window {
            // Sequence numbers wrap along with the 32 bit field they are sent in
            let sequence_number = self.total_bytes_received as u32;
            debug!("Acknowledging {} received bytes", sequence_number);

            self.bytes_received_since_ack = 0;
            self.write_message(
                RtmpMessage::Acknowledgement { sequence_number },
                0,
                RtmpTimestamp::new(0),
            )?;
        }

        Ok(())
    }
}
