use std::io;
use thiserror::Error;

/// Errors that can occur while reading AMF0 encoded bytes
#[derive(Debug, Error)]
pub enum Amf0DeserializationError {
    /// The type marker is not one of the supported AMF0 markers.  An object end marker seen
    /// outside of an object or ECMA array is reported this way too.
    #[error("Encountered unknown marker: {marker}")]
    UnknownMarker { marker: u8 },

    /// An empty property name was not followed by the object end marker
    #[error("Unexpected empty object property name")]
    UnexpectedEmptyObjectPropertyName,

    #[error("Hit end of the byte buffer but was expecting more data")]
    UnexpectedEof,

    #[error("Objects and arrays are nested more than {max_depth} levels deep")]
    NestingTooDeep { max_depth: usize },

    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Failure to parse a single value out of a byte buffer.
///
/// `bytes_consumed` is how far into the buffer the parser got before failing, so callers can
/// decide to skip ahead or give up.
#[derive(Debug, Error)]
#[error("Failed to parse amf0 value after consuming {bytes_consumed} bytes: {kind}")]
pub struct Amf0ParseError {
    pub bytes_consumed: usize,

    #[source]
    pub kind: Amf0DeserializationError,
}

/// Errors that can occur while encoding values into AMF0
#[derive(Debug, Error)]
pub enum Amf0SerializationError {
    #[error("String length greater than 65,535")]
    NormalStringTooLong,

    #[error("Object property name '{name}' is longer than 65,535 bytes")]
    PropertyNameTooLong { name: String },

    #[error("{0}")]
    Io(#[from] io::Error),
}
