//! This crate provides functionality for serializing and deserializing data
//! based on the Adobe AMF0 encoding specification located at
//! <https://wwwimages2.adobe.com/content/dam/acom/en/devnet/pdf/amf0-file-format-specification.pdf>
//!
//! Object and ECMA array properties keep the order they were read in (or inserted in), so a
//! value that is deserialized and serialized again produces the same bytes.  The exceptions are
//! strings holding invalid UTF-8, which are read lossily, and ECMA arrays whose count did not
//! match their properties, which are written with the corrected count.
//!
//! # Examples
//! ```
//! use std::io::Cursor;
//! use rcl_amf0::{Amf0Object, Amf0Value, serialize, deserialize};
//!
//! // Put some data into the Amf0Value types
//! let mut properties = Amf0Object::new();
//! properties.insert("app", Amf0Value::Number(99.0));
//! properties.insert("second", Amf0Value::Utf8String("test".to_string()));
//!
//! let value1 = Amf0Value::Number(32.0);
//! let value2 = Amf0Value::Boolean(true);
//! let object = Amf0Value::Object(properties);
//!
//! let input = vec![value1, object, value2];
//!
//! // Serialize the values into a vector of bytes
//! let serialized_data = serialize(&input).unwrap();
//!
//! // Deserialize the vector of bytes back into Amf0Value types
//! let mut serialized_cursor = Cursor::new(serialized_data);
//! let results = deserialize(&mut serialized_cursor).unwrap();
//!
//! assert_eq!(input, results);
//! ```
//!
//! A single value can be parsed out of a byte slice while learning how many bytes it occupied:
//!
//! ```
//! use rcl_amf0::{Amf0Value, encode, parse};
//!
//! let mut bytes = encode(&Amf0Value::Utf8String("onMetaData".to_string())).unwrap();
//! bytes.push(0xff); // trailing garbage is left alone
//!
//! let (value, consumed) = parse(&bytes).unwrap();
//! assert_eq!(value.as_str(), Some("onMetaData"));
//! assert_eq!(consumed, bytes.len() - 1);
//! ```

mod deserialization;
mod errors;
mod object;
mod printing;
mod serialization;

pub use crate::deserialization::{deserialize, parse};
pub use crate::errors::{Amf0DeserializationError, Amf0ParseError, Amf0SerializationError};
pub use crate::object::Amf0Object;
pub use crate::serialization::{encode, serialize};

/// An Enum representing the different supported types of Amf0 values
#[derive(PartialEq, Debug, Clone)]
pub enum Amf0Value {
    Number(f64),
    Boolean(bool),
    Utf8String(String),
    Object(Amf0Object),

    /// An associative array.  Shaped like an object on the wire except for a leading
    /// property count.  That count is only a hint: it is not kept when reading, and the
    /// actual number of properties is written in its place when serializing.
    EcmaArray(Amf0Object),

    StrictArray(Vec<Amf0Value>),
    Null,
    Undefined,
}

impl Amf0Value {
    pub fn is_number(&self) -> bool {
        matches!(self, Amf0Value::Number(_))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Amf0Value::Boolean(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Amf0Value::Utf8String(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Amf0Value::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Amf0Value::Undefined)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Amf0Value::Object(_))
    }

    pub fn is_ecma_array(&self) -> bool {
        matches!(self, Amf0Value::EcmaArray(_))
    }

    pub fn is_strict_array(&self) -> bool {
        matches!(self, Amf0Value::StrictArray(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Amf0Value::Utf8String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match *self {
            Amf0Value::Number(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match *self {
            Amf0Value::Boolean(value) => Some(value),
            _ => None,
        }
    }

    /// Borrows the properties of an object or an ECMA array
    pub fn as_object(&self) -> Option<&Amf0Object> {
        match self {
            Amf0Value::Object(properties) => Some(properties),
            Amf0Value::EcmaArray(properties) => Some(properties),
            _ => None,
        }
    }

    pub fn as_strict_array(&self) -> Option<&[Amf0Value]> {
        match self {
            Amf0Value::StrictArray(values) => Some(values),
            _ => None,
        }
    }

    /// Number of properties (object, ECMA array) or elements (strict array).  Scalars have none.
    pub fn property_count(&self) -> usize {
        match self {
            Amf0Value::Object(properties) => properties.len(),
            Amf0Value::EcmaArray(properties) => properties.len(),
            Amf0Value::StrictArray(values) => values.len(),
            _ => 0,
        }
    }

    /// Name of the property at `index`, in wire order.  Strict arrays have no names.
    pub fn property_name_at(&self, index: usize) -> Option<&str> {
        self.as_object()?.name_at(index)
    }

    /// Value of the property (object, ECMA array) or element (strict array) at `index`
    pub fn property_value_at(&self, index: usize) -> Option<&Amf0Value> {
        match self {
            Amf0Value::StrictArray(values) => values.get(index),
            _ => self.as_object()?.value_at(index),
        }
    }

    /// Looks up an object or ECMA array property by name
    pub fn get_property(&self, name: &str) -> Option<&Amf0Value> {
        self.as_object()?.get(name)
    }

    /// Renders the value as indented, human readable text
    pub fn to_human_readable(&self) -> String {
        printing::render(self)
    }
}

mod markers {
    pub const NUMBER_MARKER: u8 = 0;
    pub const BOOLEAN_MARKER: u8 = 1;
    pub const STRING_MARKER: u8 = 2;
    pub const OBJECT_MARKER: u8 = 3;
    pub const NULL_MARKER: u8 = 5;
    pub const UNDEFINED_MARKER: u8 = 6;
    pub const ECMA_ARRAY_MARKER: u8 = 8;
    pub const OBJECT_END_MARKER: u8 = 9;
    pub const STRICT_ARRAY_MARKER: u8 = 10;
    pub const UTF_8_EMPTY_MARKER: u16 = 0;
}
