//! This module contains implemented session abstractions.
//!
//! A session reacts to incoming RTMP messages (encoded as RTMP chunks) on behalf of the
//! application, so the application only has to deal with the requests it makes and the media
//! it sends or receives.

mod client;

pub use self::client::{
    type_to_string, ClientSession, ClientSessionConfig, ClientSessionError, ClientState,
    MediaPacket, MediaPacketType, PublishRequestType,
};

use rcl_amf0::{Amf0Object, Amf0Value};

/// Contains the metadata information a stream may advertise on publishing
#[derive(PartialEq, Debug, Clone, Default)]
pub struct StreamMetadata {
    pub video_width: Option<u32>,
    pub video_height: Option<u32>,
    pub video_codec_id: Option<u32>,
    pub video_frame_rate: Option<f32>,
    pub video_bitrate_kbps: Option<u32>,
    pub audio_codec_id: Option<u32>,
    pub audio_bitrate_kbps: Option<u32>,
    pub audio_sample_rate: Option<u32>,
    pub audio_channels: Option<u32>,
    pub audio_is_stereo: Option<bool>,
    pub encoder: Option<String>,
}

impl StreamMetadata {
    pub fn new() -> StreamMetadata {
        StreamMetadata::default()
    }

    /// Reads the metadata out of the values of an `onMetaData` script data message, with or
    /// without a leading `@setDataFrame`.  Returns `None` for any other script data.
    pub fn from_script_data(values: &[Amf0Value]) -> Option<StreamMetadata> {
        let mut values = values.iter();
        let mut name = values.next()?.as_str()?;
        if name == "@setDataFrame" {
            name = values.next()?.as_str()?;
        }

        if name != "onMetaData" {
            return None;
        }

        let properties = values.next()?.as_object()?;
        let number = |key: &str| properties.get(key).and_then(|x| x.as_number());

        Some(StreamMetadata {
            video_width: number("width").map(|x| x as u32),
            video_height: number("height").map(|x| x as u32),
            video_codec_id: number("videocodecid").map(|x| x as u32),
            video_frame_rate: number("framerate").map(|x| x as f32),
            video_bitrate_kbps: number("videodatarate").map(|x| x as u32),
            audio_codec_id: number("audiocodecid").map(|x| x as u32),
            audio_bitrate_kbps: number("audiodatarate").map(|x| x as u32),
            audio_sample_rate: number("audiosamplerate").map(|x| x as u32),
            audio_channels: number("audiochannels").map(|x| x as u32),
            audio_is_stereo: properties.get("stereo").and_then(|x| x.as_boolean()),
            encoder: properties
                .get("encoder")
                .and_then(|x| x.as_str())
                .map(|x| x.to_string()),
        })
    }

    /// Builds the `onMetaData` properties, leaving out anything that is not set
    pub fn to_amf0_object(&self) -> Amf0Object {
        let mut properties = Amf0Object::new();
        let mut add_number = |key: &str, value: Option<f64>| {
            if let Some(value) = value {
                properties.insert(key, Amf0Value::Number(value));
            }
        };

        add_number("width", self.video_width.map(f64::from));
        add_number("height", self.video_height.map(f64::from));
        add_number("videocodecid", self.video_codec_id.map(f64::from));
        add_number("framerate", self.video_frame_rate.map(f64::from));
        add_number("videodatarate", self.video_bitrate_kbps.map(f64::from));
        add_number("audiocodecid", self.audio_codec_id.map(f64::from));
        add_number("audiodatarate", self.audio_bitrate_kbps.map(f64::from));
        add_number("audiosamplerate", self.audio_sample_rate.map(f64::from));
        add_number("audiochannels", self.audio_channels.map(f64::from));

        if let Some(stereo) = self.audio_is_stereo {
            properties.insert("stereo", Amf0Value::Boolean(stereo));
        }

        if let Some(ref encoder) = self.encoder {
            properties.insert("encoder", Amf0Value::Utf8String(encoder.clone()));
        }

        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_fields_are_left_out_of_amf0_object() {
        let mut metadata = StreamMetadata::new();
        metadata.video_width = Some(1280);
        metadata.audio_is_stereo = Some(false);

        let properties = metadata.to_amf0_object();

        assert_eq!(properties.len(), 2);
        assert_eq!(properties.get("width"), Some(&Amf0Value::Number(1280.0)));
        assert_eq!(properties.get("stereo"), Some(&Amf0Value::Boolean(false)));
    }

    #[test]
    fn can_read_metadata_from_script_data() {
        let mut properties = Amf0Object::new();
        properties.insert("width", Amf0Value::Number(1920.0));
        properties.insert("height", Amf0Value::Number(1080.0));
        properties.insert("framerate", Amf0Value::Number(30.0));
        properties.insert("encoder", Amf0Value::Utf8String("Test Encoder".to_string()));

        let values = vec![
            Amf0Value::Utf8String("onMetaData".to_string()),
            Amf0Value::EcmaArray(properties),
        ];

        let metadata = StreamMetadata::from_script_data(&values).unwrap();

        assert_eq!(metadata.video_width, Some(1920));
        assert_eq!(metadata.video_height, Some(1080));
        assert_eq!(metadata.video_frame_rate, Some(30.0));
        assert_eq!(metadata.encoder, Some("Test Encoder".to_string()));
        assert_eq!(metadata.audio_codec_id, None);
    }

    #[test]
    fn other_script_data_is_not_metadata() {
        let values = vec![
            Amf0Value::Utf8String("|RtmpSampleAccess".to_string()),
            Amf0Value::Boolean(true),
            Amf0Value::Boolean(true),
        ];

        assert_eq!(StreamMetadata::from_script_data(&values), None);
    }
}
