//! The decoded, schema-shaped value tree and its `serde::Deserializer`.
//!
//! The engine decodes rows into [`Value`]; user types are then built with
//! `T::deserialize(value)`.

use serde::de::{
    self, DeserializeSeed, Expected, IntoDeserializer, Unexpected, Visitor,
    value::{MapDeserializer, SeqDeserializer, StringDeserializer},
};

use crate::error::Error;

/// One decoded value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Null sentinel in an optional position.
    Null,
    /// Unit sentinel, or a singleton.
    Unit,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    String(String),
    /// Variant name of a fieldless enumeration.
    Enum(String),
    Seq(Vec<Value>),
    /// Key/value entries in input order.
    Map(Vec<(Value, Value)>),
    /// Record fields in the order they were decoded.
    Record(Vec<(String, Value)>),
    /// Tagged union: the discriminator and the variant's payload.
    Variant { tag: String, payload: Box<Value> },
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Field of a record by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    fn unexpected(&self) -> Unexpected<'_> {
        match self {
            Value::Null => Unexpected::Option,
            Value::Unit => Unexpected::Unit,
            Value::Bool(b) => Unexpected::Bool(*b),
            Value::Int(i) => Unexpected::Signed(*i),
            Value::UInt(u) => Unexpected::Unsigned(*u),
            Value::Float(f) => Unexpected::Float(*f),
            Value::Char(c) => Unexpected::Char(*c),
            Value::String(s) => Unexpected::Str(s),
            Value::Enum(_) => Unexpected::UnitVariant,
            Value::Seq(_) => Unexpected::Seq,
            Value::Map(_) | Value::Record(_) => Unexpected::Map,
            Value::Variant { .. } => Unexpected::Enum,
        }
    }

    fn invalid_type(&self, exp: &dyn Expected) -> Error {
        de::Error::invalid_type(self.unexpected(), exp)
    }
}

fn visit_seq<'de, V: Visitor<'de>>(items: Vec<Value>, visitor: V) -> Result<V::Value, Error> {
    let mut seq: SeqDeserializer<_, Error> = SeqDeserializer::new(items.into_iter());
    let value = visitor.visit_seq(&mut seq)?;
    seq.end()?;
    Ok(value)
}

fn visit_map<'de, K, V>(entries: Vec<(K, Value)>, visitor: V) -> Result<V::Value, Error>
where
    K: IntoDeserializer<'de, Error>,
    V: Visitor<'de>,
{
    let mut map: MapDeserializer<'de, _, Error> = MapDeserializer::new(entries.into_iter());
    let value = visitor.visit_map(&mut map)?;
    map.end()?;
    Ok(value)
}

impl<'de> de::Deserializer<'de> for Value {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Value::Null => visitor.visit_none(),
            Value::Unit => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Int(i) => visitor.visit_i64(i),
            Value::UInt(u) => visitor.visit_u64(u),
            Value::Float(f) => visitor.visit_f64(f),
            Value::Char(c) => visitor.visit_char(c),
            Value::String(s) | Value::Enum(s) => visitor.visit_string(s),
            Value::Seq(items) => visit_seq(items, visitor),
            Value::Map(entries) => visit_map(entries, visitor),
            Value::Record(fields) => visit_map(fields, visitor),
            // Externally tagged shape: `{ tag: payload }`.
            Value::Variant { tag, payload } => visit_map(vec![(tag, *payload)], visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Value::Unit | Value::Null => visitor.visit_unit(),
            other => Err(other.invalid_type(&visitor)),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Value::Seq(items) => visit_seq(items, visitor),
            Value::Record(fields) => visit_seq(fields.into_iter().map(|(_, v)| v).collect(), visitor),
            other => Err(other.invalid_type(&visitor)),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Value::Map(entries) => visit_map(entries, visitor),
            Value::Record(fields) => visit_map(fields, visitor),
            Value::Unit | Value::Null => visit_map(Vec::<(String, Value)>::new(), visitor),
            other => Err(other.invalid_type(&visitor)),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self {
            Value::Enum(name) | Value::String(name) => {
                visitor.visit_enum(StringDeserializer::<Error>::new(name))
            }
            Value::Variant { tag, payload } => visitor.visit_enum(VariantDeserializer {
                tag,
                payload: *payload,
            }),
            other => Err(other.invalid_type(&visitor)),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf identifier
    }
}

impl<'de> IntoDeserializer<'de, Error> for Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

struct VariantDeserializer {
    tag: String,
    payload: Value,
}

impl<'de> de::EnumAccess<'de> for VariantDeserializer {
    type Error = Error;
    type Variant = VariantPayload;

    fn variant_seed<S>(self, seed: S) -> Result<(S::Value, Self::Variant), Error>
    where
        S: DeserializeSeed<'de>,
    {
        let tag = seed.deserialize(StringDeserializer::<Error>::new(self.tag))?;
        Ok((tag, VariantPayload(self.payload)))
    }
}

struct VariantPayload(Value);

impl<'de> de::VariantAccess<'de> for VariantPayload {
    type Error = Error;

    /// A singleton variant decodes to `Unit`; an empty record is accepted too.
    fn unit_variant(self) -> Result<(), Error> {
        match self.0 {
            Value::Unit | Value::Null => Ok(()),
            Value::Record(fields) if fields.is_empty() => Ok(()),
            other => Err(other.invalid_type(&"unit variant")),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Error>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(self.0)
    }

    fn tuple_variant<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value, Error> {
        de::Deserializer::deserialize_tuple(self.0, len, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        de::Deserializer::deserialize_struct(self.0, "", fields, visitor)
    }
}
