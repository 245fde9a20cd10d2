use super::chunk_header::{ChunkHeader, ChunkHeaderFormat};
use super::{INITIAL_MAX_CHUNK_SIZE, MAX_CHUNK_SIZE, MAX_INITIAL_TIMESTAMP};
use crate::chunk_io::ChunkDeserializationError;
use crate::messages::MessagePayload;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use bytes::{Buf, BytesMut};
use log::trace;
use std::cmp::min;
use std::collections::HashMap;
use std::io::Cursor;
use std::mem;

/// Allows deserializing bytes representing RTMP chunks into RTMP message payloads.
///
/// Due to the nature of the RTMP chunk protocol it is required that every byte going through the
/// wire is sent to the same `ChunkDeserializer` instance, as future chunks can rely on previous
/// chunks, so any chunks missing from the stream may cause deserialization errors.
///
/// Chunks of messages on different chunk stream ids may be freely interleaved.  Each chunk
/// stream id gets its own reassembly buffer which lives until its message completes, is
/// aborted, or the deserializer is dropped.
pub struct ChunkDeserializer {
    max_chunk_size: usize,
    current_header_format: ChunkHeaderFormat,
    current_header: ChunkHeader,
    current_stage: ParseStage,
    continues_message: bool,
    buffer: BytesMut,
    previous_headers: HashMap<u32, ChunkHeader>,
    partial_payloads: HashMap<u32, BytesMut>,
}

enum ParsedValue<T> {
    NotEnoughBytes,
    Value { val: T, next_index: usize },
}

enum ParseStage {
    Csid,
    InitialTimestamp,
    MessageLength,
    MessageTypeId,
    MessageStreamId,
    ExtendedTimestamp,
    MessagePayload,
}

#[derive(Eq, PartialEq, Debug)]
enum ParseStageResult {
    Success,
    NotEnoughBytes,
}

impl ChunkDeserializer {
    /// Create a new `ChunkDeserializer` with its initial properties.
    ///
    /// Per the RTMP specification an initial `ChunkDeserializer` is expecting RTMP chunks with
    /// a max size of 128 bytes.
    pub fn new() -> ChunkDeserializer {
        ChunkDeserializer {
            max_chunk_size: INITIAL_MAX_CHUNK_SIZE as usize,
            current_header_format: ChunkHeaderFormat::Full,
            current_header: ChunkHeader::new(),
            current_stage: ParseStage::Csid,
            continues_message: false,
            buffer: BytesMut::with_capacity(4096),
            previous_headers: HashMap::new(),
            partial_payloads: HashMap::new(),
        }
    }

    /// Attempts to read a complete RTMP message from the passed in bytes.
    ///
    /// It is normal that one set of bytes will not form a complete RTMP message (or even a
    /// complete RTMP chunk).  The deserializer keeps every byte passed into it, so the same
    /// bytes must never be passed in twice.
    ///
    /// If the bytes that were passed in formed multiple RTMP messages then only the first message
    /// is returned.  Callers are expected to call `get_next_message()` with an empty slice until
    /// `None` is returned, handling each message in between.  This matters for `SetChunkSize`
    /// messages, which must be applied with `set_max_chunk_size()` before the next chunk is read.
    ///
    /// ## Examples
    ///
    /// ```
    /// # use bytes::Bytes;
    /// # use rcl_rtmp::time::RtmpTimestamp;
    /// # use rcl_rtmp::chunk_io::{ChunkSerializer, ChunkDeserializer};
    /// # use rcl_rtmp::messages::MessagePayload;
    /// let input1 = MessagePayload {
    ///     timestamp: RtmpTimestamp::new(55),
    ///     message_stream_id: 1,
    ///     type_id: 15,
    ///     data: Bytes::from(vec![1, 2, 3, 4, 5, 6]),
    /// };
    ///
    /// let input2 = MessagePayload {
    ///     timestamp: RtmpTimestamp::new(65),
    ///     message_stream_id: 1,
    ///     type_id: 15,
    ///     data: Bytes::from(vec![8, 9, 10]),
    /// };
    ///
    /// let mut serializer = ChunkSerializer::new();
    /// let mut packet1 = serializer.serialize(&input1, false).unwrap();
    /// let mut packet2 = serializer.serialize(&input2, false).unwrap();
    ///
    /// let mut all_bytes = Vec::new();
    /// all_bytes.append(&mut packet1.bytes);
    /// all_bytes.append(&mut packet2.bytes);
    ///
    /// let mut deserializer = ChunkDeserializer::new();
    /// let message1 = deserializer.get_next_message(&all_bytes[..]).unwrap();
    /// let message2 = deserializer.get_next_message(&[]).unwrap();
    /// let message3 = deserializer.get_next_message(&[]).unwrap();
    ///
    /// assert_eq!(message1, Some(input1));
    /// assert_eq!(message2, Some(input2));
    /// assert_eq!(message3, None);
    /// ```
    pub fn get_next_message(
        &mut self,
        bytes: &[u8],
    ) -> Result<Option<MessagePayload>, ChunkDeserializationError> {
        self.buffer.extend_from_slice(bytes);

        loop {
            let mut complete_message = None;
            let result = match self.current_stage {
                ParseStage::Csid => self.form_header()?,
                ParseStage::InitialTimestamp => self.get_initial_timestamp()?,
                ParseStage::MessageLength => self.get_message_length()?,
                ParseStage::MessageTypeId => self.get_message_type_id()?,
                ParseStage::MessageStreamId => self.get_message_stream_id()?,
                ParseStage::ExtendedTimestamp => self.get_extended_timestamp()?,
                ParseStage::MessagePayload => self.get_message_data(&mut complete_message)?,
            };

            if result == ParseStageResult::NotEnoughBytes || complete_message.is_some() {
                return Ok(complete_message);
            }
        }
    }

    /// Tells the deserializer that the peer will start sending RTMP chunks with a different
    /// max chunk size.
    ///
    /// This should only be called in reaction to receiving a `SetChunkSize` message from the
    /// peer.  Any mismatch between the size the peer uses and the size set here desynchronizes
    /// the chunk stream.
    pub fn set_max_chunk_size(&mut self, new_size: u32) -> Result<(), ChunkDeserializationError> {
        if new_size == 0 || new_size > MAX_CHUNK_SIZE {
            return Err(ChunkDeserializationError::InvalidMaxChunkSize {
                chunk_size: new_size,
            });
        }

        self.max_chunk_size = new_size as usize;
        Ok(())
    }

    /// Returns the maximum size of any RTMP chunks that should be received
    pub fn get_max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Discards the partially received message on the given chunk stream, in reaction to an
    /// `Abort` message from the peer.
    pub fn abort_message(&mut self, csid: u32) {
        if let Some(payload) = self.partial_payloads.remove(&csid) {
            trace!("Discarding {} bytes of partial message on csid {}", payload.len(), csid);
        }
    }

    fn form_header(&mut self) -> Result<ParseStageResult, ChunkDeserializationError> {
        let (csid, next_index) = match get_csid(&self.buffer[..]) {
            ParsedValue::NotEnoughBytes => return Ok(ParseStageResult::NotEnoughBytes),
            ParsedValue::Value { val, next_index } => (val, next_index),
        };

        self.current_header_format = ChunkHeaderFormat::from_basic_header(self.buffer[0]);
        self.continues_message = self
            .partial_payloads
            .get(&csid)
            .map_or(false, |payload| !payload.is_empty());

        if self.continues_message && self.current_header_format != ChunkHeaderFormat::Empty {
            return Err(ChunkDeserializationError::MessageInterrupted { csid });
        }

        self.current_header = match self.current_header_format {
            ChunkHeaderFormat::Full => {
                let mut new_header = ChunkHeader::new();
                new_header.chunk_stream_id = csid;
                new_header
            }

            _ => match self.previous_headers.remove(&csid) {
                None => return Err(ChunkDeserializationError::NoPreviousChunkOnStream { csid }),
                Some(header) => header,
            },
        };

        self.buffer.advance(next_index);
        self.current_stage = ParseStage::InitialTimestamp;
        Ok(ParseStageResult::Success)
    }

    fn get_initial_timestamp(&mut self) -> Result<ParseStageResult, ChunkDeserializationError> {
        if self.current_header_format == ChunkHeaderFormat::Empty {
            // A type 3 chunk that starts a new message applies the previous delta again.  One
            // that continues a message must leave the timestamp alone.
            if !self.continues_message {
                self.current_header.timestamp =
                    self.current_header.timestamp + self.current_header.timestamp_field;
            }

            self.current_stage = ParseStage::MessageLength;
            return Ok(ParseStageResult::Success);
        }

        if self.buffer.len() < 3 {
            return Ok(ParseStageResult::NotEnoughBytes);
        }

        let timestamp = read_bytes(&mut self.buffer, 3).read_u24::<BigEndian>()?;
        self.current_header.timestamp_field = timestamp;

        // Extended timestamps are applied once they have been read
        if timestamp < MAX_INITIAL_TIMESTAMP {
            self.apply_timestamp_field();
        }

        self.current_stage = ParseStage::MessageLength;
        Ok(ParseStageResult::Success)
    }

    fn get_message_length(&mut self) -> Result<ParseStageResult, ChunkDeserializationError> {
        if self.current_header_format == ChunkHeaderFormat::TimeDeltaOnly
            || self.current_header_format == ChunkHeaderFormat::Empty
        {
            self.current_stage = ParseStage::MessageTypeId;
            return Ok(ParseStageResult::Success);
        }

        if self.buffer.len() < 3 {
            return Ok(ParseStageResult::NotEnoughBytes);
        }

        let length = read_bytes(&mut self.buffer, 3).read_u24::<BigEndian>()?;
        self.current_header.message_length = length;
        self.current_stage = ParseStage::MessageTypeId;
        Ok(ParseStageResult::Success)
    }

    fn get_message_type_id(&mut self) -> Result<ParseStageResult, ChunkDeserializationError> {
        if self.current_header_format == ChunkHeaderFormat::TimeDeltaOnly
            || self.current_header_format == ChunkHeaderFormat::Empty
        {
            self.current_stage = ParseStage::MessageStreamId;
            return Ok(ParseStageResult::Success);
        }

        if self.buffer.is_empty() {
            return Ok(ParseStageResult::NotEnoughBytes);
        }

        self.current_header.message_type_id = self.buffer.get_u8();
        self.current_stage = ParseStage::MessageStreamId;
        Ok(ParseStageResult::Success)
    }

    fn get_message_stream_id(&mut self) -> Result<ParseStageResult, ChunkDeserializationError> {
        if self.current_header_format != ChunkHeaderFormat::Full {
            self.current_stage = ParseStage::ExtendedTimestamp;
            return Ok(ParseStageResult::Success);
        }

        if self.buffer.len() < 4 {
            return Ok(ParseStageResult::NotEnoughBytes);
        }

        let stream_id = read_bytes(&mut self.buffer, 4).read_u32::<LittleEndian>()?;
        self.current_header.message_stream_id = stream_id;
        self.current_stage = ParseStage::ExtendedTimestamp;
        Ok(ParseStageResult::Success)
    }

    fn get_extended_timestamp(&mut self) -> Result<ParseStageResult, ChunkDeserializationError> {
        if !self.current_header.has_extended_timestamp() {
            self.current_stage = ParseStage::MessagePayload;
            return Ok(ParseStageResult::Success);
        }

        if self.buffer.len() < 4 {
            return Ok(ParseStageResult::NotEnoughBytes);
        }

        let timestamp = read_bytes(&mut self.buffer, 4).read_u32::<BigEndian>()?;

        // Type 3 chunks repeat the extended field of their message header, which has
        // already been applied
        if self.current_header_format != ChunkHeaderFormat::Empty {
            self.current_header.timestamp_field = timestamp;
            self.apply_timestamp_field();
        }

        self.current_stage = ParseStage::MessagePayload;
        Ok(ParseStageResult::Success)
    }

    fn get_message_data(
        &mut self,
        message_to_return: &mut Option<MessagePayload>,
    ) -> Result<ParseStageResult, ChunkDeserializationError> {
        let csid = self.current_header.chunk_stream_id;
        let message_length = self.current_header.message_length as usize;
        let received_length = self.partial_payloads.get(&csid).map_or(0, |payload| payload.len());
        let chunk_length = min(message_length - received_length, self.max_chunk_size);

        if self.buffer.len() < chunk_length {
            return Ok(ParseStageResult::NotEnoughBytes);
        }

        let bytes = self.buffer.split_to(chunk_length);
        let payload = self
            .partial_payloads
            .entry(csid)
            .or_insert_with(|| BytesMut::with_capacity(message_length));

        payload.extend_from_slice(&bytes[..]);

        if payload.len() == message_length {
            let data = payload.split().freeze();
            *message_to_return = Some(MessagePayload {
                timestamp: self.current_header.timestamp,
                type_id: self.current_header.message_type_id,
                message_stream_id: self.current_header.message_stream_id,
                data,
            });
        }

        // This completes the current chunk, so cycle the header into the map and start a new one
        let current_header = mem::replace(&mut self.current_header, ChunkHeader::new());
        self.previous_headers.insert(csid, current_header);
        self.current_stage = ParseStage::Csid;
        Ok(ParseStageResult::Success)
    }

    fn apply_timestamp_field(&mut self) {
        let field = self.current_header.timestamp_field;
        if self.current_header_format == ChunkHeaderFormat::Full {
            self.current_header.timestamp.set(field);
        } else {
            self.current_header.timestamp = self.current_header.timestamp + field;
        }
    }
}

impl Default for ChunkDeserializer {
    fn default() -> Self {
        ChunkDeserializer::new()
    }
}

fn read_bytes(buffer: &mut BytesMut, count: usize) -> Cursor<BytesMut> {
    Cursor::new(buffer.split_to(count))
}

fn get_csid(buffer: &[u8]) -> ParsedValue<u32> {
    const CSID_MASK: u8 = 0b0011_1111;

    if buffer.is_empty() {
        return ParsedValue::NotEnoughBytes;
    }

    match buffer[0] & CSID_MASK {
        0 => {
            if buffer.len() < 2 {
                ParsedValue::NotEnoughBytes
            } else {
                ParsedValue::Value {
                    val: buffer[1] as u32 + 64,
                    next_index: 2,
                }
            }
        }

        1 => {
            if buffer.len() < 3 {
                ParsedValue::NotEnoughBytes
            } else {
                ParsedValue::Value {
                    val: (buffer[2] as u32 * 256) + buffer[1] as u32 + 64,
                    next_index: 3,
                }
            }
        }

        x => ParsedValue::Value {
            val: x as u32,
            next_index: 1,
        },
    }
}
