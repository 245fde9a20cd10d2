//! Protocol control messages (type ids 1, 2, 3, 5 and 6).  All of them are fixed size and
//! big endian.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use std::io::Cursor;

use crate::messages::{MessageDeserializationError, MessageSerializationError};
use crate::messages::{PeerBandwidthLimitType, RtmpMessage};

const MAX_CHUNK_SIZE: u32 = 0x7FFF_FFFF;

pub fn serialize_set_chunk_size(size: u32) -> Result<Bytes, MessageSerializationError> {
    // The most significant bit must be zero
    if size > MAX_CHUNK_SIZE {
        return Err(MessageSerializationError::InvalidChunkSize);
    }

    serialize_u32(size)
}

pub fn deserialize_set_chunk_size(data: Bytes) -> Result<RtmpMessage, MessageDeserializationError> {
    let size = read_u32(data)? & MAX_CHUNK_SIZE;
    Ok(RtmpMessage::SetChunkSize { size })
}

pub fn deserialize_abort(data: Bytes) -> Result<RtmpMessage, MessageDeserializationError> {
    let chunk_stream_id = read_u32(data)?;
    Ok(RtmpMessage::Abort { chunk_stream_id })
}

pub fn deserialize_acknowledgement(
    data: Bytes,
) -> Result<RtmpMessage, MessageDeserializationError> {
    let sequence_number = read_u32(data)?;
    Ok(RtmpMessage::Acknowledgement { sequence_number })
}

pub fn deserialize_window_acknowledgement(
    data: Bytes,
) -> Result<RtmpMessage, MessageDeserializationError> {
    let size = read_u32(data)?;
    Ok(RtmpMessage::WindowAcknowledgement { size })
}

pub fn serialize_set_peer_bandwidth(
    limit_type: PeerBandwidthLimitType,
    size: u32,
) -> Result<Bytes, MessageSerializationError> {
    let type_id = match limit_type {
        PeerBandwidthLimitType::Hard => 0,
        PeerBandwidthLimitType::Soft => 1,
        PeerBandwidthLimitType::Dynamic => 2,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(5));
    cursor.write_u32::<BigEndian>(size)?;
    cursor.write_u8(type_id)?;

    Ok(Bytes::from(cursor.into_inner()))
}

pub fn deserialize_set_peer_bandwidth(
    data: Bytes,
) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    let size = cursor.read_u32::<BigEndian>()?;
    let limit_type = match cursor.read_u8()? {
        0 => PeerBandwidthLimitType::Hard,
        1 => PeerBandwidthLimitType::Soft,
        2 => PeerBandwidthLimitType::Dynamic,
        _ => return Err(MessageDeserializationError::InvalidMessageFormat),
    };

    Ok(RtmpMessage::SetPeerBandwidth { size, limit_type })
}

/// Abort, Acknowledgement and Window Acknowledgement Size all carry a single u32
pub fn serialize_u32(value: u32) -> Result<Bytes, MessageSerializationError> {
    let mut cursor = Cursor::new(Vec::with_capacity(4));
    cursor.write_u32::<BigEndian>(value)?;

    Ok(Bytes::from(cursor.into_inner()))
}

fn read_u32(data: Bytes) -> Result<u32, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    Ok(cursor.read_u32::<BigEndian>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_chunk_size_is_four_big_endian_bytes() {
        let bytes = serialize_set_chunk_size(4096).unwrap();
        assert_eq!(&bytes[..], &[0, 0, 0x10, 0]);
    }

    #[test]
    fn set_chunk_size_with_high_bit_is_rejected() {
        match serialize_set_chunk_size(0x8000_0000) {
            Err(MessageSerializationError::InvalidChunkSize) => (),
            x => panic!("Expected InvalidChunkSize, got {:?}", x),
        }
    }

    #[test]
    fn set_chunk_size_ignores_the_reserved_high_bit_when_reading() {
        let data = Bytes::from_static(&[0x80, 0, 0x10, 0]);
        let result = deserialize_set_chunk_size(data).unwrap();
        assert_eq!(result, RtmpMessage::SetChunkSize { size: 4096 });
    }

    #[test]
    fn truncated_acknowledgement_is_an_error() {
        let data = Bytes::from_static(&[0, 0, 1]);
        match deserialize_acknowledgement(data) {
            Err(MessageDeserializationError::Io(_)) => (),
            x => panic!("Expected an io error, got {:?}", x),
        }
    }

    #[test]
    fn can_read_soft_peer_bandwidth() {
        let data = Bytes::from_static(&[0, 0x26, 0x25, 0xA0, 1]);
        let result = deserialize_set_peer_bandwidth(data).unwrap();

        assert_eq!(
            result,
            RtmpMessage::SetPeerBandwidth {
                size: 2_500_000,
                limit_type: PeerBandwidthLimitType::Soft
            }
        );
    }

    #[test]
    fn peer_bandwidth_with_unknown_limit_type_is_invalid() {
        let data = Bytes::from_static(&[0, 0, 1, 0, 7]);
        match deserialize_set_peer_bandwidth(data) {
            Err(MessageDeserializationError::InvalidMessageFormat) => (),
            x => panic!("Expected InvalidMessageFormat, got {:?}", x),
        }
    }

    #[test]
    fn peer_bandwidth_writes_limit_type_after_size() {
        let bytes = serialize_set_peer_bandwidth(PeerBandwidthLimitType::Dynamic, 523).unwrap();
        assert_eq!(&bytes[..], &[0, 0, 2, 11, 2]);
    }
}
