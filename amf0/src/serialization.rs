//! Module contains functionality for serializing values into an
//! bytes based on the AMF0 specification
//! (http://wwwimages.adobe.com/content/dam/Adobe/en/devnet/amf/pdf/amf0-file-format-specification.pdf)

use crate::errors::Amf0SerializationError;
use crate::markers;
use crate::{Amf0Object, Amf0Value};
use byteorder::{BigEndian, WriteBytesExt};

/// Serializes values into an amf0 encoded vector of bytes
pub fn serialize(values: &[Amf0Value]) -> Result<Vec<u8>, Amf0SerializationError> {
    let mut bytes = vec![];
    for value in values {
        serialize_value(value, &mut bytes)?;
    }

    Ok(bytes)
}

/// Serializes a single value.  This is the exact inverse of `parse()`.
pub fn encode(value: &Amf0Value) -> Result<Vec<u8>, Amf0SerializationError> {
    let mut bytes = vec![];
    serialize_value(value, &mut bytes)?;
    Ok(bytes)
}

fn serialize_value(value: &Amf0Value, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    match *value {
        Amf0Value::Boolean(val) => {
            serialize_bool(val, bytes);
            Ok(())
        }

        Amf0Value::Null => {
            bytes.push(markers::NULL_MARKER);
            Ok(())
        }

        Amf0Value::Undefined => {
            bytes.push(markers::UNDEFINED_MARKER);
            Ok(())
        }

        Amf0Value::Number(val) => serialize_number(val, bytes),
        Amf0Value::Utf8String(ref val) => serialize_string(val, bytes),
        Amf0Value::Object(ref val) => serialize_object(val, bytes),
        Amf0Value::EcmaArray(ref val) => serialize_ecma_array(val, bytes),
        Amf0Value::StrictArray(ref val) => serialize_strict_array(val, bytes),
    }
}

fn serialize_number(value: f64, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::NUMBER_MARKER);
    bytes.write_f64::<BigEndian>(value)?;
    Ok(())
}

fn serialize_bool(value: bool, bytes: &mut Vec<u8>) {
    bytes.push(markers::BOOLEAN_MARKER);
    bytes.push(value as u8);
}

fn serialize_string(value: &str, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    if value.len() > (u16::max_value() as usize) {
        return Err(Amf0SerializationError::NormalStringTooLong);
    }

    bytes.push(markers::STRING_MARKER);
    bytes.write_u16::<BigEndian>(value.len() as u16)?;
    bytes.extend(value.as_bytes());
    Ok(())
}

fn serialize_object(
    properties: &Amf0Object,
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::OBJECT_MARKER);
    serialize_properties(properties, bytes)
}

fn serialize_ecma_array(
    properties: &Amf0Object,
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::ECMA_ARRAY_MARKER);
    bytes.write_u32::<BigEndian>(properties.len() as u32)?;
    serialize_properties(properties, bytes)
}

fn serialize_properties(
    properties: &Amf0Object,
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    for (name, value) in properties {
        if name.len() > (u16::max_value() as usize) {
            return Err(Amf0SerializationError::PropertyNameTooLong { name: name.clone() });
        }

        bytes.write_u16::<BigEndian>(name.len() as u16)?;
        bytes.extend(name.as_bytes());
        serialize_value(value, bytes)?;
    }

    bytes.write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER)?;
    bytes.push(markers::OBJECT_END_MARKER);
    Ok(())
}

fn serialize_strict_array(
    array: &[Amf0Value],
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::STRICT_ARRAY_MARKER);
    bytes.write_u32::<BigEndian>(array.len() as u32)?;

    for value in array {
        serialize_value(value, bytes)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{encode, serialize};
    use crate::errors::Amf0SerializationError;
    use crate::markers;
    use crate::parse;
    use crate::{Amf0Object, Amf0Value};
    use byteorder::{BigEndian, WriteBytesExt};

    #[test]
    fn can_serialize_strict_array() {
        let number: f64 = 332.0;

        let value = Amf0Value::Number(number);

        let input = vec![Amf0Value::StrictArray(vec![value])];

        let result = serialize(&input).unwrap();

        let mut expected = vec![];

        expected.write_u8(markers::STRICT_ARRAY_MARKER).unwrap();
        expected.write_u32::<BigEndian>(1).unwrap();
        expected.write_u8(markers::NUMBER_MARKER).unwrap();
        expected.write_f64::<BigEndian>(number).unwrap();

        assert_eq!(result, expected);
    }

    #[test]
    fn can_serialize_number() {
        let number: f64 = 332.0;

        let input = vec![Amf0Value::Number(number)];
        let result = serialize(&input).unwrap();

        let mut expected = vec![];
        expected.write_u8(markers::NUMBER_MARKER).unwrap();
        expected.write_f64::<BigEndian>(number).unwrap();

        assert_eq!(result, expected);
    }

    #[test]
    fn can_serialize_true_boolean() {
        let input = vec![Amf0Value::Boolean(true)];
        let result = serialize(&input).unwrap();

        let mut expected = vec![];
        expected.write_u8(markers::BOOLEAN_MARKER).unwrap();
        expected.write_u8(1).unwrap();

        assert_eq!(result, expected);
    }

    #[test]
    fn can_serialize_string() {
        let value = "test";

        let input = vec![Amf0Value::Utf8String(value.to_string())];
        let result = serialize(&input).unwrap();

        let mut expected = vec![];
        expected.write_u8(markers::STRING_MARKER).unwrap();
        expected.write_u16::<BigEndian>(value.len() as u16).unwrap();
        expected.extend(value.as_bytes());

        assert_eq!(result, expected);
    }

    #[test]
    fn can_serialize_null_and_undefined() {
        let input = vec![Amf0Value::Null, Amf0Value::Undefined];
        let result = serialize(&input).unwrap();

        assert_eq!(result, vec![markers::NULL_MARKER, markers::UNDEFINED_MARKER]);
    }

    #[test]
    fn can_serialize_object() {
        const NUMBER: f64 = 332.0;

        let mut properties = Amf0Object::new();
        properties.insert("test", Amf0Value::Number(NUMBER));

        let input = vec![Amf0Value::Object(properties)];
        let result = serialize(&input).unwrap();

        let mut expected = vec![];
        expected.push(markers::OBJECT_MARKER);
        expected.write_u16::<BigEndian>(4).unwrap();
        expected.extend("test".as_bytes());
        expected.push(markers::NUMBER_MARKER);
        expected.write_f64::<BigEndian>(NUMBER).unwrap();
        expected
            .write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER)
            .unwrap();
        expected.push(markers::OBJECT_END_MARKER);

        assert_eq!(result, expected);
    }

    #[test]
    fn ecma_array_is_written_with_its_property_count() {
        let mut properties = Amf0Object::new();
        properties.insert("a", Amf0Value::Null);
        properties.insert("b", Amf0Value::Null);

        let result = encode(&Amf0Value::EcmaArray(properties)).unwrap();

        let mut expected = vec![];
        expected.push(markers::ECMA_ARRAY_MARKER);
        expected.write_u32::<BigEndian>(2).unwrap();
        expected.write_u16::<BigEndian>(1).unwrap();
        expected.extend("a".as_bytes());
        expected.push(markers::NULL_MARKER);
        expected.write_u16::<BigEndian>(1).unwrap();
        expected.extend("b".as_bytes());
        expected.push(markers::NULL_MARKER);
        expected
            .write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER)
            .unwrap();
        expected.push(markers::OBJECT_END_MARKER);

        assert_eq!(result, expected);
    }

    #[test]
    fn ecma_array_count_is_corrected_when_written_again() {
        let mut vector = vec![];
        vector.push(markers::ECMA_ARRAY_MARKER);
        vector.write_u32::<BigEndian>(5).unwrap();
        vector.write_u16::<BigEndian>(1).unwrap();
        vector.extend("a".as_bytes());
        vector.push(markers::NULL_MARKER);
        vector
            .write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER)
            .unwrap();
        vector.push(markers::OBJECT_END_MARKER);

        let (value, _) = parse(&vector).unwrap();
        let result = encode(&value).unwrap();

        assert_eq!(&result[1..5], &[0, 0, 0, 1], "Count was not corrected");
        assert_eq!(&result[5..], &vector[5..]);
    }

    #[test]
    fn error_when_string_length_greater_than_u16() {
        let max = (u16::max_value() as usize) + 1;
        let value = "a".repeat(max);

        let input = vec![Amf0Value::Utf8String(value)];
        let result = serialize(&input);

        match result {
            Err(Amf0SerializationError::NormalStringTooLong) => (),
            x => panic!("Expected NormalStringTooLong error, instead received {:?}", x),
        }
    }

    #[test]
    fn error_when_property_name_longer_than_u16() {
        let mut properties = Amf0Object::new();
        properties.insert("a".repeat(70_000), Amf0Value::Null);

        match encode(&Amf0Value::Object(properties)) {
            Err(Amf0SerializationError::PropertyNameTooLong { .. }) => (),
            x => panic!("Expected PropertyNameTooLong error, instead received {:?}", x),
        }
    }

    #[test]
    fn nested_values_survive_encode_then_parse() {
        let mut inner = Amf0Object::new();
        inner.insert("level", Amf0Value::Utf8String("status".to_string()));
        inner.insert("flag", Amf0Value::Boolean(false));
        inner.insert("nothing", Amf0Value::Undefined);

        let mut metadata = Amf0Object::new();
        metadata.insert("zeta", Amf0Value::Number(-0.5));
        metadata.insert("alpha", Amf0Value::Null);

        let mut outer = Amf0Object::new();
        outer.insert("info", Amf0Value::Object(inner));
        outer.insert("metadata", Amf0Value::EcmaArray(metadata));
        outer.insert(
            "list",
            Amf0Value::StrictArray(vec![
                Amf0Value::Number(1.0),
                Amf0Value::Utf8String(String::new()),
                Amf0Value::StrictArray(vec![]),
                Amf0Value::EcmaArray(Amf0Object::new()),
            ]),
        );

        let value = Amf0Value::Object(outer);
        let bytes = encode(&value).unwrap();
        let (result, consumed) = parse(&bytes).unwrap();

        assert_eq!(result, value);
        assert_eq!(consumed, bytes.len());
    }
}
