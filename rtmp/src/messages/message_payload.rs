use bytes::Bytes;

use super::types::{amf0_command, amf0_data, protocol_control, user_control};
use crate::messages::RtmpMessage;
use crate::messages::{MessageDeserializationError, MessageSerializationError};
use crate::time::RtmpTimestamp;

/// Represents a fully reassembled, still undecoded, RTMP message
#[derive(PartialEq, Debug, Clone, Default)]
pub struct MessagePayload {
    pub timestamp: RtmpTimestamp,
    pub type_id: u8,
    pub message_stream_id: u32,
    pub data: Bytes,
}

impl MessagePayload {
    pub fn new() -> MessagePayload {
        MessagePayload::default()
    }

    /// Decodes the payload's bytes based on its type id.  Type ids without a corresponding
    /// `RtmpMessage` variant are rejected.
    pub fn to_rtmp_message(&self) -> Result<RtmpMessage, MessageDeserializationError> {
        let data = self.data.clone();
        match self.type_id {
            1 => protocol_control::deserialize_set_chunk_size(data),
            2 => protocol_control::deserialize_abort(data),
            3 => protocol_control::deserialize_acknowledgement(data),
            4 => user_control::deserialize(data),
            5 => protocol_control::deserialize_window_acknowledgement(data),
            6 => protocol_control::deserialize_set_peer_bandwidth(data),
            8 => Ok(RtmpMessage::AudioData { data }),
            9 => Ok(RtmpMessage::VideoData { data }),
            18 => amf0_data::deserialize(data),
            20 => amf0_command::deserialize(data),
            type_id => Err(MessageDeserializationError::UnknownMessageType { type_id }),
        }
    }

    pub fn from_rtmp_message(
        message: RtmpMessage,
        timestamp: RtmpTimestamp,
        message_stream_id: u32,
    ) -> Result<MessagePayload, MessageSerializationError> {
        let type_id = message.get_message_type_id();

        let data = match message {
            RtmpMessage::SetChunkSize { size } => protocol_control::serialize_set_chunk_size(size)?,
            RtmpMessage::Abort { chunk_stream_id } => {
                protocol_control::serialize_u32(chunk_stream_id)?
            }

            RtmpMessage::Acknowledgement { sequence_number } => {
                protocol_control::serialize_u32(sequence_number)?
            }

            RtmpMessage::WindowAcknowledgement { size } => protocol_control::serialize_u32(size)?,
            RtmpMessage::SetPeerBandwidth { size, limit_type } => {
                protocol_control::serialize_set_peer_bandwidth(limit_type, size)?
            }

            RtmpMessage::UserControl {
                event_type,
                stream_id,
                buffer_length,
                timestamp,
            } => user_control::serialize(event_type, stream_id, buffer_length, timestamp)?,

            RtmpMessage::AudioData { data } => data,
            RtmpMessage::VideoData { data } => data,
            RtmpMessage::Amf0Data { values } => amf0_data::serialize(values)?,
            RtmpMessage::Amf0Command {
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            } => amf0_command::serialize(
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            )?,
        };

        Ok(MessagePayload {
            timestamp,
            type_id,
            message_stream_id,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::MessagePayload;
    use bytes::Bytes;

    use crate::messages::{MessageDeserializationError, RtmpMessage};
    use crate::time::RtmpTimestamp;

    #[test]
    fn unknown_type_id_is_rejected() {
        let payload = MessagePayload {
            timestamp: RtmpTimestamp::new(0),
            type_id: 22,
            message_stream_id: 0,
            data: Bytes::from_static(&[1, 2, 3]),
        };

        match payload.to_rtmp_message() {
            Err(MessageDeserializationError::UnknownMessageType { type_id: 22 }) => (),
            x => panic!("Expected UnknownMessageType, got {:?}", x),
        }
    }

    #[test]
    fn video_payload_keeps_its_bytes_and_header_fields() {
        let data = Bytes::from_static(&[0x17, 0x01, 0, 0, 0]);
        let message = RtmpMessage::VideoData { data: data.clone() };

        let payload = message
            .into_message_payload(RtmpTimestamp::new(1040), 1)
            .unwrap();

        assert_eq!(payload.type_id, 9);
        assert_eq!(payload.timestamp, RtmpTimestamp::new(1040));
        assert_eq!(payload.message_stream_id, 1);
        assert_eq!(payload.data, data);
        assert_eq!(
            payload.to_rtmp_message().unwrap(),
            RtmpMessage::VideoData { data }
        );
    }
}
