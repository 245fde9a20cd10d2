//! Human readable rendering of AMF0 values, mostly useful for logging command and metadata
//! messages.
//!
//! ```text
//! Object (2 items)
//!     app: String live
//!     info: EcmaArray (1 items)
//!         width: Number 1280
//! ```

use crate::{Amf0Object, Amf0Value};
use std::fmt::{self, Write};

const INDENT: &str = "    ";

/// Displays a value in its human readable form
struct HumanReadable<'a>(&'a Amf0Value);

impl fmt::Display for HumanReadable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self.0, 0)
    }
}

pub fn render(value: &Amf0Value) -> String {
    HumanReadable(value).to_string()
}

fn write_value<W: Write>(output: &mut W, value: &Amf0Value, depth: usize) -> fmt::Result {
    match value {
        Amf0Value::Number(number) => writeln!(output, "Number {}", number),
        Amf0Value::Boolean(boolean) => writeln!(output, "Boolean {}", boolean),
        Amf0Value::Utf8String(string) => writeln!(output, "String {}", string),
        Amf0Value::Null => output.write_str("Null\n"),
        Amf0Value::Undefined => output.write_str("Undefined\n"),

        Amf0Value::Object(properties) => {
            writeln!(output, "Object ({} items)", properties.len())?;
            write_properties(output, properties, depth + 1)
        }

        Amf0Value::EcmaArray(properties) => {
            writeln!(output, "EcmaArray ({} items)", properties.len())?;
            write_properties(output, properties, depth + 1)
        }

        Amf0Value::StrictArray(values) => {
            writeln!(output, "StrictArray ({} items)", values.len())?;
            for (index, element) in values.iter().enumerate() {
                write_indent(output, depth + 1)?;
                write!(output, "{}: ", index)?;
                write_value(output, element, depth + 1)?;
            }

            Ok(())
        }
    }
}

fn write_properties<W: Write>(
    output: &mut W,
    properties: &Amf0Object,
    depth: usize,
) -> fmt::Result {
    for (name, value) in properties {
        write_indent(output, depth)?;
        write!(output, "{}: ", name)?;
        write_value(output, value, depth)?;
    }

    Ok(())
}

fn write_indent<W: Write>(output: &mut W, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        output.write_str(INDENT)?;
    }

    Ok(())
}
