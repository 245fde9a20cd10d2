/*!
This module provides functionality for splitting RTMP messages into RTMP chunks and for
reassembling RTMP chunks back into messages.

Both sides keep per chunk stream id state (the last header seen, and on the receiving side any
partially received message) so the same `ChunkSerializer` and `ChunkDeserializer` instances must
be used for the whole life of a connection.
*/

mod chunk_header;
mod deserialization_errors;
mod deserializer;
mod serialization_errors;
mod serializer;

pub use self::deserialization_errors::ChunkDeserializationError;
pub use self::deserializer::ChunkDeserializer;
pub use self::serialization_errors::ChunkSerializationError;
pub use self::serializer::{ChunkSerializer, Packet};

/// The chunk size both peers start with, before any `SetChunkSize` message
pub const INITIAL_MAX_CHUNK_SIZE: u32 = 128;

/// The largest chunk size that can be expressed by a `SetChunkSize` message
pub const MAX_CHUNK_SIZE: u32 = 2_147_483_647;

/// Largest value of the 24 bit timestamp field.  Values at or above this are sent in the
/// extended timestamp field instead.
const MAX_INITIAL_TIMESTAMP: u32 = 0x00FF_FFFF;

/// Largest message length that fits in the 24 bit message length field
const MAX_MESSAGE_LENGTH: usize = 0x00FF_FFFF;
