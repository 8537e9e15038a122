//! Conversion of one raw column into a scalar [`Value`].
//!
//! Every function here returns errors without a location; the caller knows which
//! column the text came from and attaches it.

use std::str::FromStr;

use crate::error::{Error, Location};
use crate::options::Options;
use crate::schema::{FloatType, IntType, SchemaKind};
use crate::value::Value;

/// Parse a boolean. Only `true` and `false` are accepted, in any letter case.
pub(crate) fn parse_bool(raw: &str) -> Result<bool, Error> {
    if raw.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(Error::value_format(raw, "bool"))
    }
}

fn parse_number<T: FromStr>(raw: &str, target: &'static str) -> Result<T, Error> {
    raw.parse::<T>()
        .map_err(|_| Error::value_format(raw, target))
}

/// Parse an integer of the given width, widened to `i64`/`u64`.
pub(crate) fn parse_int(raw: &str, ty: IntType) -> Result<Value, Error> {
    let target = ty.name();
    Ok(match ty {
        IntType::I8 => Value::Int(parse_number::<i8>(raw, target)?.into()),
        IntType::I16 => Value::Int(parse_number::<i16>(raw, target)?.into()),
        IntType::I32 => Value::Int(parse_number::<i32>(raw, target)?.into()),
        IntType::I64 => Value::Int(parse_number::<i64>(raw, target)?),
        IntType::U8 => Value::UInt(parse_number::<u8>(raw, target)?.into()),
        IntType::U16 => Value::UInt(parse_number::<u16>(raw, target)?.into()),
        IntType::U32 => Value::UInt(parse_number::<u32>(raw, target)?.into()),
        IntType::U64 => Value::UInt(parse_number::<u64>(raw, target)?),
    })
}

pub(crate) fn parse_float(raw: &str, ty: FloatType) -> Result<f64, Error> {
    match ty {
        FloatType::F32 => parse_number::<f32>(raw, "f32").map(f64::from),
        FloatType::F64 => parse_number::<f64>(raw, "f64"),
    }
}

/// Parse a collection size: a non-negative integer.
pub(crate) fn parse_count(raw: &str) -> Result<usize, Error> {
    parse_number::<usize>(raw, "collection size")
}

/// Exactly one Unicode scalar value.
pub(crate) fn parse_char(raw: &str) -> Result<char, Error> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(Error::InvalidCharLength {
            raw: raw.to_owned(),
            location: Location::UNKNOWN,
        }),
    }
}

pub(crate) fn parse_null(raw: &str, null: &str) -> Result<(), Error> {
    if raw == null {
        Ok(())
    } else {
        Err(Error::NullSentinelMismatch {
            raw: raw.to_owned(),
            expected: null.to_owned(),
            location: Location::UNKNOWN,
        })
    }
}

pub(crate) fn parse_unit(raw: &str, unit: &str) -> Result<(), Error> {
    if raw == unit {
        Ok(())
    } else {
        Err(Error::UnitSentinelMismatch {
            raw: raw.to_owned(),
            expected: unit.to_owned(),
            location: Location::UNKNOWN,
        })
    }
}

/// Case-sensitive match against the declared variant names.
pub(crate) fn parse_enum(raw: &str, variants: &[String]) -> Result<String, Error> {
    if variants.iter().any(|v| v == raw) {
        Ok(raw.to_owned())
    } else {
        Err(Error::UnknownEnumVariant {
            raw: raw.to_owned(),
            location: Location::UNKNOWN,
        })
    }
}

/// Decode `raw` as the primitive `kind`. Returns `None` for structural kinds.
pub(crate) fn parse_primitive(
    raw: &str,
    kind: &SchemaKind,
    options: &Options,
) -> Option<Result<Value, Error>> {
    let value = match kind {
        SchemaKind::Bool => parse_bool(raw).map(Value::Bool),
        SchemaKind::Int(ty) => parse_int(raw, *ty),
        SchemaKind::Float(ty) => parse_float(raw, *ty).map(Value::Float),
        SchemaKind::Char => parse_char(raw).map(Value::Char),
        SchemaKind::String => Ok(Value::String(raw.to_owned())),
        SchemaKind::Unit => parse_unit(raw, &options.unit_string).map(|()| Value::Unit),
        SchemaKind::Enum(variants) => parse_enum(raw, variants).map(Value::Enum),
        _ => return None,
    };
    Some(value)
}
