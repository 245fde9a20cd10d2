use super::chunk_header::{ChunkHeader, ChunkHeaderFormat};
use super::{INITIAL_MAX_CHUNK_SIZE, MAX_CHUNK_SIZE, MAX_INITIAL_TIMESTAMP, MAX_MESSAGE_LENGTH};
use crate::chunk_io::ChunkSerializationError;
use crate::messages::{MessagePayload, RtmpMessage};
use crate::time::RtmpTimestamp;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use std::collections::HashMap;
use std::io::{Cursor, Write};

/// An outbound data packet containing all the RTMP chunks of a single RTMP message
#[derive(Debug, PartialEq)]
pub struct Packet {
    pub bytes: Vec<u8>,
}

/// Allows serializing RTMP messages into RTMP chunks.
///
/// Due to the nature of the RTMP chunking protocol, the same serializer should be used
/// for all messages that need to be sent to the same peer.
pub struct ChunkSerializer {
    previous_headers: HashMap<u32, ChunkHeader>,
    max_chunk_size: u32,
}

impl ChunkSerializer {
    /// Creates a new `ChunkSerializer`.
    ///
    /// By default (per the RTMP specification) the serializer will break any message into RTMP
    /// chunks with a max size of 128.  To change this amount a call to `set_max_chunk_size()` is
    /// required.
    pub fn new() -> ChunkSerializer {
        ChunkSerializer {
            max_chunk_size: INITIAL_MAX_CHUNK_SIZE,
            previous_headers: HashMap::new(),
        }
    }

    /// Changes the maximum amount of bytes from RTMP messages that can be in a single RTMP chunk.
    ///
    /// Changing the maximum chunk size requires notifying the receiver of the change, as it will
    /// affect every chunk you send out from here on out.  Therefore, when this method is called
    /// we automatically serialize a `SetChunkSize` RTMP message to be sent to the peer.  This
    /// packet *must* be sent and cannot be ignored.
    pub fn set_max_chunk_size(
        &mut self,
        new_size: u32,
        time: RtmpTimestamp,
    ) -> Result<Packet, ChunkSerializationError> {
        if new_size == 0 || new_size > MAX_CHUNK_SIZE {
            return Err(ChunkSerializationError::InvalidMaxChunkSize {
                attempted_chunk_size: new_size,
            });
        }

        let set_chunk_size_message = RtmpMessage::SetChunkSize { size: new_size };
        let message_payload = MessagePayload::from_rtmp_message(set_chunk_size_message, time, 0)?;
        let packet = self.serialize(&message_payload, true)?;

        self.max_chunk_size = new_size;
        Ok(packet)
    }

    pub fn get_max_chunk_size(&self) -> u32 {
        self.max_chunk_size
    }

    /// Turns an RTMP message payload into binary data (representing RTMP chunks) that can be
    /// sent over the network.
    ///
    /// The RTMP chunk format has a basic form of header compression it utilizes.  If a chunk
    /// is sent with some header information, and the next chunk to be generated has a lot of
    /// similar header information, than the subsequent chunk can omit some information and flag
    /// itself as requiring information from the previous chunk.
    ///
    /// This compression can be bypassed by setting `force_uncompressed` to `true`.  Some servers
    /// require the first messages after the handshake to be sent with type 0 headers.
    pub fn serialize(
        &mut self,
        message: &MessagePayload,
        force_uncompressed: bool,
    ) -> Result<Packet, ChunkSerializationError> {
        if message.data.len() > MAX_MESSAGE_LENGTH {
            return Err(ChunkSerializationError::MessageTooLong {
                size: message.data.len(),
            });
        }

        let csid = get_csid_for_message_type(message.type_id);
        let (header, header_format) = self.build_header(csid, message, force_uncompressed);

        let header_size = 1 + 11 + 4;
        let chunk_count = message.data.len() / self.max_chunk_size as usize + 1;
        let mut bytes = Cursor::new(Vec::with_capacity(
            message.data.len() + chunk_count * header_size,
        ));

        // The first chunk carries the message header, every other chunk is a type 3 continuation
        let mut chunks = message.data.chunks(self.max_chunk_size as usize);
        let first_chunk = chunks.next().unwrap_or(&[]);
        add_chunk(&mut bytes, header_format, &header, first_chunk)?;

        for chunk in chunks {
            add_chunk(&mut bytes, ChunkHeaderFormat::Empty, &header, chunk)?;
        }

        self.previous_headers.insert(csid, header);

        Ok(Packet {
            bytes: bytes.into_inner(),
        })
    }

    fn build_header(
        &self,
        csid: u32,
        message: &MessagePayload,
        force_uncompressed: bool,
    ) -> (ChunkHeader, ChunkHeaderFormat) {
        let mut header = ChunkHeader {
            chunk_stream_id: csid,
            timestamp: message.timestamp,
            timestamp_field: message.timestamp.value,
            message_type_id: message.type_id,
            message_stream_id: message.message_stream_id,
            message_length: message.data.len() as u32,
        };

        if force_uncompressed {
            return (header, ChunkHeaderFormat::Full);
        }

        let previous_header = match self.previous_headers.get(&csid) {
            Some(previous_header) => previous_header,
            None => return (header, ChunkHeaderFormat::Full),
        };

        // Deltas can only move forward in time
        if header.message_stream_id != previous_header.message_stream_id
            || header.timestamp < previous_header.timestamp
        {
            return (header, ChunkHeaderFormat::Full);
        }

        header.timestamp_field = (header.timestamp - previous_header.timestamp).value;

        let format = if header.message_type_id != previous_header.message_type_id
            || header.message_length != previous_header.message_length
        {
            ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId
        } else if header.timestamp_field != previous_header.timestamp_field {
            ChunkHeaderFormat::TimeDeltaOnly
        } else {
            ChunkHeaderFormat::Empty
        };

        (header, format)
    }
}

impl Default for ChunkSerializer {
    fn default() -> Self {
        ChunkSerializer::new()
    }
}

fn add_chunk(
    bytes: &mut Cursor<Vec<u8>>,
    format: ChunkHeaderFormat,
    header: &ChunkHeader,
    data_to_write: &[u8],
) -> Result<(), ChunkSerializationError> {
    add_basic_header(bytes, format, header.chunk_stream_id)?;
    add_initial_timestamp(bytes, format, header)?;
    add_message_length_and_type_id(bytes, format, header.message_length, header.message_type_id)?;
    add_message_stream_id(bytes, format, header.message_stream_id)?;
    add_extended_timestamp(bytes, header)?;
    bytes.write_all(data_to_write)?;

    Ok(())
}

fn add_basic_header(
    bytes: &mut dyn Write,
    format: ChunkHeaderFormat,
    csid: u32,
) -> Result<(), ChunkSerializationError> {
    let format_mask = format.basic_header_mask();
    match csid {
        2..=63 => bytes.write_u8(csid as u8 | format_mask)?,
        64..=319 => {
            bytes.write_u8(format_mask)?;
            bytes.write_u8((csid - 64) as u8)?;
        }

        320..=65599 => {
            bytes.write_u8(1 | format_mask)?;
            bytes.write_u16::<LittleEndian>((csid - 64) as u16)?;
        }

        _ => return Err(ChunkSerializationError::InvalidChunkStreamId { csid }),
    }

    Ok(())
}

fn add_initial_timestamp(
    bytes: &mut dyn Write,
    format: ChunkHeaderFormat,
    header: &ChunkHeader,
) -> Result<(), ChunkSerializationError> {
    if format == ChunkHeaderFormat::Empty {
        return Ok(());
    }

    let capped_value = header.timestamp_field.min(MAX_INITIAL_TIMESTAMP);
    bytes.write_u24::<BigEndian>(capped_value)?;

    Ok(())
}

fn add_message_length_and_type_id(
    bytes: &mut dyn Write,
    format: ChunkHeaderFormat,
    length: u32,
    type_id: u8,
) -> Result<(), ChunkSerializationError> {
    if format == ChunkHeaderFormat::Empty || format == ChunkHeaderFormat::TimeDeltaOnly {
        return Ok(());
    }

    bytes.write_u24::<BigEndian>(length)?;
    bytes.write_u8(type_id)?;
    Ok(())
}

fn add_message_stream_id(
    bytes: &mut dyn Write,
    format: ChunkHeaderFormat,
    stream_id: u32,
) -> Result<(), ChunkSerializationError> {
    if format != ChunkHeaderFormat::Full {
        return Ok(());
    }

    bytes.write_u32::<LittleEndian>(stream_id)?;
    Ok(())
}

/// Written on every chunk of a message whose timestamp field overflowed, type 3 included
fn add_extended_timestamp(
    bytes: &mut dyn Write,
    header: &ChunkHeader,
) -> Result<(), ChunkSerializationError> {
    if !header.has_extended_timestamp() {
        return Ok(());
    }

    bytes.write_u32::<BigEndian>(header.timestamp_field)?;
    Ok(())
}

fn get_csid_for_message_type(message_type_id: u8) -> u32 {
    // Spreading message types across chunk streams lets repeated messages of the
    // same kind benefit from header compression
    match message_type_id {
        1..=6 => 2,
        18 | 19 => 3,
        9 => 4,
        8 => 5,
        _ => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
    use bytes::Bytes;
    use std::io::{Cursor, Read};

    fn message(timestamp: u32, type_id: u8, data: Vec<u8>) -> MessagePayload {
        MessagePayload {
            timestamp: RtmpTimestamp::new(timestamp),
            type_id,
            message_stream_id: 12,
            data: Bytes::from(data),
        }
    }

    #[test]
    fn type_0_chunk_for_first_message_with_small_timestamp() {
        let message1 = message(72, 50, vec![1, 2, 3, 4]);

        let mut serializer = ChunkSerializer::new();
        let packet = serializer.serialize(&message1, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6, "Unexpected csid value");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 72, "Unexpected timestamp value");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 4, "Unexpected message length value");
        assert_eq!(cursor.read_u8().unwrap(), 50, "Unexpected type id");
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 12, "Unexpected message stream id");

        let mut payload_bytes = [0_u8; 50];
        let bytes_read = cursor.read(&mut payload_bytes[..]).unwrap();
        assert_eq!(&payload_bytes[..bytes_read], &[1, 2, 3, 4], "Unexpected payload contents");
    }

    #[test]
    fn timestamp_of_0xffffff_uses_the_extended_field() {
        let message1 = message(0x00FF_FFFF, 50, vec![1, 2, 3, 4]);

        let mut serializer = ChunkSerializer::new();
        let packet = serializer.serialize(&message1, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6, "Unexpected csid value");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 0x00FF_FFFF, "Unexpected timestamp value");
        let _ = cursor.read_u24::<BigEndian>().unwrap();
        let _ = cursor.read_u8().unwrap();
        let _ = cursor.read_u32::<LittleEndian>().unwrap();
        assert_eq!(cursor.read_u32::<BigEndian>().unwrap(), 0x00FF_FFFF, "Unexpected extended timestamp");
        assert_eq!(cursor.into_inner().len(), 1 + 11 + 4 + 4);
    }

    #[test]
    fn timestamp_of_0xfffffe_does_not_use_the_extended_field() {
        let message1 = message(0x00FF_FFFE, 50, vec![1, 2, 3, 4]);

        let mut serializer = ChunkSerializer::new();
        let packet = serializer.serialize(&message1, false).unwrap();

        assert_eq!(packet.bytes.len(), 1 + 11 + 4);
        assert_eq!(&packet.bytes[1..4], &[0xFF, 0xFF, 0xFE]);
    }

    #[test]
    fn type_1_chunk_for_second_message_with_different_length_and_type_id() {
        let message1 = message(72, 50, vec![1, 2, 3, 4]);
        let message2 = message(82, 51, vec![1, 2, 3]);

        let mut serializer = ChunkSerializer::new();
        let _ = serializer.serialize(&message1, false).unwrap();
        let packet = serializer.serialize(&message2, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6 | 0b0100_0000, "Unexpected csid value");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 10, "Unexpected timestamp delta");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 3, "Unexpected message length value");
        assert_eq!(cursor.read_u8().unwrap(), 51, "Unexpected type id");
    }

    #[test]
    fn type_2_then_type_3_chunks_for_evenly_spaced_messages() {
        let message1 = message(1000, 50, vec![1, 2, 3, 4]);
        let message2 = message(1040, 50, vec![5, 6, 7, 8]);
        let message3 = message(1080, 50, vec![9, 10, 11, 12]);

        let mut serializer = ChunkSerializer::new();
        let _ = serializer.serialize(&message1, false).unwrap();
        let packet2 = serializer.serialize(&message2, false).unwrap();
        let packet3 = serializer.serialize(&message3, false).unwrap();

        let mut cursor = Cursor::new(packet2.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6 | 0b1000_0000, "Unexpected 2nd csid value");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 40, "Unexpected timestamp delta");

        assert_eq!(packet3.bytes, vec![6 | 0b1100_0000, 9, 10, 11, 12]);
    }

    #[test]
    fn type_0_chunks_used_when_message_stream_id_changes() {
        let message1 = message(72, 50, vec![1, 2, 3, 4]);
        let mut message2 = message(82, 50, vec![1, 2, 3, 4]);
        message2.message_stream_id = 13;

        let mut serializer = ChunkSerializer::new();
        let _ = serializer.serialize(&message1, false).unwrap();
        let packet = serializer.serialize(&message2, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6, "Unexpected csid value");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 82, "Unexpected timestamp value");
    }

    #[test]
    fn type_0_chunk_for_second_message_when_forcing_uncompressed() {
        let message1 = message(72, 50, vec![1, 2, 3, 4]);
        let message2 = message(82, 50, vec![1, 2, 3, 4]);

        let mut serializer = ChunkSerializer::new();
        let _ = serializer.serialize(&message1, false).unwrap();
        let packet = serializer.serialize(&message2, true).unwrap();

        assert_eq!(packet.bytes[0], 6, "Unexpected csid value");
    }

    #[test]
    fn message_split_when_payload_exceeds_max_chunk_size() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&[11_u8; 75]);
        payload.extend_from_slice(&[22_u8; 25]);

        let message1 = message(72, 50, payload);

        let mut serializer = ChunkSerializer::new();
        serializer.set_max_chunk_size(75, RtmpTimestamp::new(0)).unwrap();

        let packet = serializer.serialize(&message1, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6, "Unexpected csid value");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 72, "Unexpected timestamp value");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 100, "Unexpected message length value");
        assert_eq!(cursor.read_u8().unwrap(), 50, "Unexpected type id");
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 12, "Unexpected message stream id");

        let mut payload_bytes = [0_u8; 75];
        cursor.read_exact(&mut payload_bytes[..]).unwrap();
        assert_eq!(&payload_bytes[..], &([11_u8; 75])[..], "Unexpected payload contents");

        assert_eq!(cursor.read_u8().unwrap(), 6 | 0b1100_0000, "Unexpected 2nd csid value");
        let bytes_read = cursor.read(&mut payload_bytes[..]).unwrap();
        assert_eq!(&payload_bytes[..bytes_read], &([22_u8; 25])[..], "Unexpected 2nd payload contents");
    }

    #[test]
    fn changing_size_returns_set_chunk_size_outbound_message() {
        let mut serializer = ChunkSerializer::new();
        let packet = serializer.set_max_chunk_size(75, RtmpTimestamp::new(152)).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 2, "Unexpected csid value");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 152, "Unexpected timestamp");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 4, "Unexpected message length value");
        assert_eq!(cursor.read_u8().unwrap(), 1, "Unexpected type id");
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 0, "Unexpected message stream id");
        assert_eq!(cursor.read_u32::<BigEndian>().unwrap(), 75, "Unexpected chunk size");
        assert_eq!(serializer.get_max_chunk_size(), 75);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let mut serializer = ChunkSerializer::new();
        match serializer.set_max_chunk_size(0, RtmpTimestamp::new(0)) {
            Err(ChunkSerializationError::InvalidMaxChunkSize { attempted_chunk_size: 0 }) => (),
            x => panic!("Expected InvalidMaxChunkSize, got {:?}", x),
        }
    }

    #[test]
    fn basic_header_uses_two_and_three_byte_forms_for_large_csids() {
        let mut bytes = Vec::new();
        add_basic_header(&mut bytes, ChunkHeaderFormat::Empty, 300).unwrap();
        assert_eq!(bytes, vec![0b1100_0000, 236]);

        let mut bytes = Vec::new();
        add_basic_header(&mut bytes, ChunkHeaderFormat::Full, 1000).unwrap();
        assert_eq!(bytes, vec![1, 0xA8, 0x03]);
    }
}
