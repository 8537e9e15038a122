//! Public entry points.

use std::io::Read;

use encoding_rs_io::DecodeReaderBytesBuilder;
use serde::de::DeserializeOwned;

use crate::de::decode_session;
use crate::error::Error;
use crate::options::Options;
use crate::schema::{Describe, Schema};
use crate::value::Value;

/// Deserialize `T` from delimiter-separated text with default [`Options`].
///
/// A `Vec<T>` reads one element per record; any other type reads exactly one record.
///
/// ```rust
/// use serde::Deserialize;
/// use serde_dsv::{Describe, Field, Schema};
///
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl Describe for Point {
///     fn describe() -> Schema {
///         Schema::record("Point", vec![
///             Field::new("x", i32::describe()),
///             Field::new("y", i32::describe()),
///         ])
///     }
/// }
///
/// let points: Vec<Point> = serde_dsv::from_str("1,2\n3,4\n").unwrap();
/// assert_eq!(points[1], Point { x: 3, y: 4 });
/// ```
pub fn from_str<T: DeserializeOwned + Describe>(input: &str) -> Result<T, Error> {
    from_str_with_options(input, Options::default())
}

/// Deserialize `T` from text with the given [`Options`].
pub fn from_str_with_options<T: DeserializeOwned + Describe>(
    input: &str,
    options: Options,
) -> Result<T, Error> {
    from_str_with_schema(input, &T::describe(), options)
}

/// Deserialize `T` from text, decoding against an explicit schema.
///
/// Useful when `T` does not implement [`Describe`], or when the same type is read
/// with different shapes.
pub fn from_str_with_schema<T: DeserializeOwned>(
    input: &str,
    schema: &Schema,
    options: Options,
) -> Result<T, Error> {
    let value = decode_session(input.as_bytes(), schema, &options)?;
    T::deserialize(value)
}

/// Decode text into a [`Value`] tree without binding it to a Rust type.
pub fn value_from_str(input: &str, schema: &Schema, options: Options) -> Result<Value, Error> {
    decode_session(input.as_bytes(), schema, &options)
}

/// Deserialize `T` from a byte stream with default [`Options`].
///
/// The stream is sniffed for a byte order mark; UTF-16 input is converted to UTF-8.
pub fn from_reader<R: Read, T: DeserializeOwned + Describe>(reader: R) -> Result<T, Error> {
    from_reader_with_options(reader, Options::default())
}

pub fn from_reader_with_options<R: Read, T: DeserializeOwned + Describe>(
    reader: R,
    options: Options,
) -> Result<T, Error> {
    from_reader_with_schema(reader, &T::describe(), options)
}

pub fn from_reader_with_schema<R: Read, T: DeserializeOwned>(
    reader: R,
    schema: &Schema,
    options: Options,
) -> Result<T, Error> {
    let decoder = DecodeReaderBytesBuilder::new()
        .encoding(None)
        .strip_bom(true)
        .build(reader);
    let value = decode_session(decoder, schema, &options)?;
    T::deserialize(value)
}
