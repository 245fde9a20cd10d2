use crate::messages::{AMF0_DATA_TYPE_ID, AUDIO_TYPE_ID, VIDEO_TYPE_ID};
use crate::time::RtmpTimestamp;
use bytes::Bytes;

/// The kinds of packets a publisher or player exchanges with the server
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaPacketType {
    Audio,
    Video,

    /// AMF0 encoded script data, such as `onMetaData`
    Data,
}

impl MediaPacketType {
    pub fn from_type_id(type_id: u8) -> Option<MediaPacketType> {
        match type_id {
            AUDIO_TYPE_ID => Some(MediaPacketType::Audio),
            VIDEO_TYPE_ID => Some(MediaPacketType::Video),
            AMF0_DATA_TYPE_ID => Some(MediaPacketType::Data),
            _ => None,
        }
    }

    pub fn type_id(self) -> u8 {
        match self {
            MediaPacketType::Audio => AUDIO_TYPE_ID,
            MediaPacketType::Video => VIDEO_TYPE_ID,
            MediaPacketType::Data => AMF0_DATA_TYPE_ID,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaPacketType::Audio => "Audio",
            MediaPacketType::Video => "Video",
            MediaPacketType::Data => "Data",
        }
    }
}

/// Names an RTMP message type id for display purposes
pub fn type_to_string(type_id: u8) -> &'static str {
    MediaPacketType::from_type_id(type_id)
        .map(MediaPacketType::as_str)
        .unwrap_or("Unknown")
}

/// A complete audio, video or script data message received from the server.
///
/// The packet owns its data, it does not borrow from the session that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaPacket {
    pub packet_type: MediaPacketType,
    pub timestamp: RtmpTimestamp,
    pub data: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_ids_map_to_display_names() {
        assert_eq!(type_to_string(8), "Audio");
        assert_eq!(type_to_string(9), "Video");
        assert_eq!(type_to_string(18), "Data");
        assert_eq!(type_to_string(20), "Unknown");
        assert_eq!(type_to_string(0), "Unknown");
    }

    #[test]
    fn packet_types_know_their_type_ids() {
        for packet_type in [
            MediaPacketType::Audio,
            MediaPacketType::Video,
            MediaPacketType::Data,
        ]
        .iter()
        {
            assert_eq!(
                MediaPacketType::from_type_id(packet_type.type_id()),
                Some(*packet_type)
            );
        }

        assert_eq!(MediaPacketType::from_type_id(4), None);
    }
}
