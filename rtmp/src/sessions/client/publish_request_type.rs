/// The type of publish request being made
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishRequestType {
    /// The published stream should be sent out without recording it in a file
    Live,

    /// The published stream should be recorded to a new file (RTMP spec says
    /// the file should be overwritten if it already exists).
    Record,

    /// The stream is published and the data should be appended to a file
    Append,
}

impl PublishRequestType {
    /// The value sent as the publishing type argument of the `publish` command
    pub fn as_str(self) -> &'static str {
        match self {
            PublishRequestType::Live => "live",
            PublishRequestType::Record => "record",
            PublishRequestType::Append => "append",
        }
    }
}
