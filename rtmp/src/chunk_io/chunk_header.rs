use crate::time::RtmpTimestamp;

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum ChunkHeaderFormat {
    Full,                            // Format 0
    TimeDeltaWithoutMessageStreamId, // Format 1
    TimeDeltaOnly,                   // Format 2
    Empty,                           // Format 3
}

impl ChunkHeaderFormat {
    pub fn from_basic_header(byte: u8) -> ChunkHeaderFormat {
        match byte >> 6 {
            0 => ChunkHeaderFormat::Full,
            1 => ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId,
            2 => ChunkHeaderFormat::TimeDeltaOnly,
            _ => ChunkHeaderFormat::Empty,
        }
    }

    pub fn basic_header_mask(self) -> u8 {
        match self {
            ChunkHeaderFormat::Full => 0b0000_0000,
            ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId => 0b0100_0000,
            ChunkHeaderFormat::TimeDeltaOnly => 0b1000_0000,
            ChunkHeaderFormat::Empty => 0b1100_0000,
        }
    }
}

/// The last header seen on a chunk stream.
///
/// `timestamp_field` holds the value the header actually carried: the absolute timestamp for a
/// type 0 header, the delta for type 1 and 2 headers.  A type 3 header that starts a new message
/// applies it again as a delta.  When it is `0xFFFFFF` or larger the value travels in the
/// extended timestamp field, on every chunk of the message.
#[derive(Debug, Clone, Default)]
pub struct ChunkHeader {
    pub chunk_stream_id: u32,
    pub timestamp: RtmpTimestamp,
    pub timestamp_field: u32,
    pub message_length: u32,
    pub message_type_id: u8,
    pub message_stream_id: u32,
}

impl ChunkHeader {
    pub fn new() -> ChunkHeader {
        ChunkHeader::default()
    }

    pub fn has_extended_timestamp(&self) -> bool {
        self.timestamp_field >= super::MAX_INITIAL_TIMESTAMP
    }
}
