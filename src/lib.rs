pub use api::{
    from_reader, from_reader_with_options, from_reader_with_schema, from_str, from_str_with_options,
    from_str_with_schema, value_from_str,
};
pub use error::{Error, Location};
pub use options::Options;
pub use schema::{Category, Describe, Field, FloatType, IntType, Schema, SchemaKind, Variant};
pub use value::Value;

mod api;
mod cursor;
mod de;
pub mod error;
mod header;
#[macro_use]
mod macros;
pub mod options;
mod parse_scalars;
pub mod schema;
pub mod value;
