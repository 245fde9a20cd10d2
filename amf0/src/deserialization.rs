//! This module contains functionality to deserialize values from bytes
//! that were encoded via the AMF0 specification
//! (http://wwwimages.adobe.com/content/dam/Adobe/en/devnet/amf/pdf/amf0-file-format-specification.pdf)

use crate::errors::{Amf0DeserializationError, Amf0ParseError};
use crate::markers;
use crate::{Amf0Object, Amf0Value};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};

// Objects and arrays nest recursively, so hostile input could otherwise exhaust the stack
const MAX_NESTING_DEPTH: usize = 64;

struct ObjectProperty {
    label: String,
    value: Amf0Value,
}

/// Turns any readable byte stream and converts it into an array of AMF0 values
pub fn deserialize<R: Read>(bytes: &mut R) -> Result<Vec<Amf0Value>, Amf0DeserializationError> {
    let mut results = vec![];

    while let Some(marker) = read_marker(bytes)? {
        results.push(read_value(marker, bytes, 0)?);
    }

    Ok(results)
}

/// Parses the first AMF0 value out of `bytes`, returning it along with the number of bytes it
/// occupied.  Any bytes after the value are left untouched.
///
/// On failure the error reports how many bytes were consumed before the problem was found.
pub fn parse(bytes: &[u8]) -> Result<(Amf0Value, usize), Amf0ParseError> {
    let mut cursor = Cursor::new(bytes);
    let result = match read_marker(&mut cursor) {
        Ok(Some(marker)) => read_value(marker, &mut cursor, 0),
        Ok(None) => Err(Amf0DeserializationError::UnexpectedEof),
        Err(error) => Err(error),
    };

    let bytes_consumed = cursor.position() as usize;
    match result {
        Ok(value) => Ok((value, bytes_consumed)),
        Err(error) => Err(Amf0ParseError {
            bytes_consumed,
            kind: normalize_eof(error),
        }),
    }
}

fn normalize_eof(error: Amf0DeserializationError) -> Amf0DeserializationError {
    match error {
        Amf0DeserializationError::Io(ref inner) if inner.kind() == io::ErrorKind::UnexpectedEof => {
            Amf0DeserializationError::UnexpectedEof
        }

        other => other,
    }
}

fn read_marker<R: Read>(bytes: &mut R) -> Result<Option<u8>, Amf0DeserializationError> {
    let mut buffer: [u8; 1] = [0];
    let bytes_read = bytes.read(&mut buffer)?;

    if bytes_read == 0 {
        return Ok(None);
    }

    Ok(Some(buffer[0]))
}

fn read_value<R: Read>(
    marker: u8,
    bytes: &mut R,
    depth: usize,
) -> Result<Amf0Value, Amf0DeserializationError> {
    match marker {
        markers::BOOLEAN_MARKER => parse_bool(bytes),
        markers::NULL_MARKER => Ok(Amf0Value::Null),
        markers::UNDEFINED_MARKER => Ok(Amf0Value::Undefined),
        markers::NUMBER_MARKER => parse_number(bytes),
        markers::STRING_MARKER => parse_string(bytes),
        markers::OBJECT_MARKER => parse_object(bytes, depth + 1).map(Amf0Value::Object),
        markers::ECMA_ARRAY_MARKER => parse_ecma_array(bytes, depth + 1),
        markers::STRICT_ARRAY_MARKER => parse_strict_array(bytes, depth + 1),
        _ => Err(Amf0DeserializationError::UnknownMarker { marker }),
    }
}

fn read_required_value<R: Read>(
    bytes: &mut R,
    depth: usize,
) -> Result<Amf0Value, Amf0DeserializationError> {
    match read_marker(bytes)? {
        Some(marker) => read_value(marker, bytes, depth),
        None => Err(Amf0DeserializationError::UnexpectedEof),
    }
}

fn parse_number<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let number = bytes.read_f64::<BigEndian>()?;
    Ok(Amf0Value::Number(number))
}

fn parse_bool<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let value = bytes.read_u8()?;
    Ok(Amf0Value::Boolean(value != 0))
}

fn parse_string<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let value = read_utf8(bytes)?;
    Ok(Amf0Value::Utf8String(value))
}

fn read_utf8<R: Read>(bytes: &mut R) -> Result<String, Amf0DeserializationError> {
    let length = bytes.read_u16::<BigEndian>()?;
    let mut buffer: Vec<u8> = vec![0_u8; length as usize];
    bytes.read_exact(&mut buffer)?;

    Ok(into_string(buffer))
}

/// AMF0 strings are only length checked.  Invalid UTF-8 sequences are replaced with U+FFFD,
/// so such a string no longer encodes back to its original bytes.
fn into_string(buffer: Vec<u8>) -> String {
    match String::from_utf8(buffer) {
        Ok(value) => value,
        Err(error) => String::from_utf8_lossy(error.as_bytes()).into_owned(),
    }
}

fn parse_object<R: Read>(
    bytes: &mut R,
    depth: usize,
) -> Result<Amf0Object, Amf0DeserializationError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(Amf0DeserializationError::NestingTooDeep {
            max_depth: MAX_NESTING_DEPTH,
        });
    }

    let mut properties = Amf0Object::new();
    while let Some(property) = parse_object_property(bytes, depth)? {
        properties.insert(property.label, property.value);
    }

    Ok(properties)
}

fn parse_ecma_array<R: Read>(
    bytes: &mut R,
    depth: usize,
) -> Result<Amf0Value, Amf0DeserializationError> {
    // The associative count is only advisory.  Real world encoders terminate ECMA arrays
    // with the same empty name + object end marker that objects use, and the count
    // frequently disagrees with the number of properties actually sent.
    let _associative_count = bytes.read_u32::<BigEndian>()?;
    parse_object(bytes, depth).map(Amf0Value::EcmaArray)
}

fn parse_strict_array<R: Read>(
    bytes: &mut R,
    depth: usize,
) -> Result<Amf0Value, Amf0DeserializationError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(Amf0DeserializationError::NestingTooDeep {
            max_depth: MAX_NESTING_DEPTH,
        });
    }

    let array_count = bytes.read_u32::<BigEndian>()?;
    let mut values: Vec<Amf0Value> = Vec::new();

    for _ in 0..array_count {
        values.push(read_required_value(bytes, depth)?);
    }

    Ok(Amf0Value::StrictArray(values))
}

fn parse_object_property<R: Read>(
    bytes: &mut R,
    depth: usize,
) -> Result<Option<ObjectProperty>, Amf0DeserializationError> {
    let label_length = bytes.read_u16::<BigEndian>()?;
    if label_length == 0 {
        // Next byte should be the end of object marker.  We need to read this
        // to make sure we progress the current position.
        let byte = bytes.read_u8()?;
        if byte != markers::OBJECT_END_MARKER {
            return Err(Amf0DeserializationError::UnexpectedEmptyObjectPropertyName);
        }

        return Ok(None);
    }

    let mut label_buffer = vec![0; label_length as usize];
    bytes.read_exact(&mut label_buffer)?;

    let label = into_string(label_buffer);
    let value = read_required_value(bytes, depth)?;

    Ok(Some(ObjectProperty { label, value }))
}
