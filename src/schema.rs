//! Schema descriptors: the queryable shape of a type that drives decoding.
//!
//! Serde does not expose field types to a `Deserializer`, but a tabular format has to
//! know them before it sees any data (nested header names are resolved against the
//! nested records). A [`Schema`] carries that knowledge. Standard library types get
//! one through [`Describe`]; user types implement [`Describe`] by hand.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use ahash::AHashMap;

/// Structural category of a descriptor. Primitives have none.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Fixed, named fields (a struct).
    Record,
    /// Variable number of elements, prefixed by their count.
    Sequence,
    /// Variable number of key/value entries, prefixed by their count.
    Mapping,
    /// A zero-field marker value; consumes no columns.
    Singleton,
    /// Named alternatives selected by a leading discriminator column.
    TaggedUnion,
    /// Record-shaped payload that is always decoded positionally: header
    /// resolution never descends into it.
    OpenRecord,
}

/// Integer widths supported by the primitive layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl IntType {
    pub fn name(self) -> &'static str {
        match self {
            IntType::I8 => "i8",
            IntType::I16 => "i16",
            IntType::I32 => "i32",
            IntType::I64 => "i64",
            IntType::U8 => "u8",
            IntType::U16 => "u16",
            IntType::U32 => "u32",
            IntType::U64 => "u64",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FloatType {
    F32,
    F64,
}

/// A named element of a record.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    name: String,
    schema: Schema,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// A registered alternative of a tagged union.
#[derive(Clone, Debug, PartialEq)]
pub struct Variant {
    tag: String,
    schema: Schema,
}

impl Variant {
    pub fn new(tag: impl Into<String>, schema: Schema) -> Self {
        Self {
            tag: tag.into(),
            schema,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// Ordered record fields with name lookup.
#[derive(Clone, Debug)]
pub struct Fields {
    fields: Vec<Field>,
    index: AHashMap<String, usize>,
}

impl Fields {
    fn new(fields: Vec<Field>) -> Self {
        let mut index = AHashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            // First declaration wins on duplicate names.
            index.entry(field.name.clone()).or_insert(i);
        }
        Self { fields, index }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Index of the field called `name`, if any.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }
}

impl PartialEq for Fields {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

/// Union variants with tag lookup.
#[derive(Clone, Debug)]
pub struct Variants {
    variants: Vec<Variant>,
    index: AHashMap<String, usize>,
}

impl Variants {
    fn new(variants: Vec<Variant>) -> Self {
        let mut index = AHashMap::with_capacity(variants.len());
        for (i, variant) in variants.iter().enumerate() {
            index.entry(variant.tag.clone()).or_insert(i);
        }
        Self { variants, index }
    }

    /// The variant registered under exactly `tag`.
    pub fn get(&self, tag: &str) -> Option<&Variant> {
        self.index.get(tag).and_then(|&i| self.variants.get(i))
    }

    /// Declaration index of the variant registered under `tag`.
    pub fn index_of(&self, tag: &str) -> Option<usize> {
        self.index.get(tag).copied()
    }

    pub fn by_index(&self, index: usize) -> Option<&Variant> {
        self.variants.get(index)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Variant> {
        self.variants.iter()
    }
}

impl PartialEq for Variants {
    fn eq(&self, other: &Self) -> bool {
        self.variants == other.variants
    }
}

/// What a descriptor describes.
#[derive(Clone, Debug, PartialEq)]
pub enum SchemaKind {
    Bool,
    Int(IntType),
    Float(FloatType),
    Char,
    String,
    /// The unit value, written as the unit sentinel.
    Unit,
    /// Fieldless enumeration written by variant name.
    Enum(Vec<String>),
    /// Value or null sentinel.
    Optional(Box<Schema>),
    Record(Fields),
    OpenRecord(Fields),
    Sequence(Box<Schema>),
    Mapping(Box<Schema>, Box<Schema>),
    Singleton,
    TaggedUnion(Variants),
}

/// Descriptor of one type: a name and a [`SchemaKind`].
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    name: String,
    kind: SchemaKind,
}

impl Schema {
    pub fn new(name: impl Into<String>, kind: SchemaKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn record(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self::new(name, SchemaKind::Record(Fields::new(fields)))
    }

    pub fn open_record(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self::new(name, SchemaKind::OpenRecord(Fields::new(fields)))
    }

    pub fn sequence(element: Schema) -> Self {
        let name = format!("Seq<{}>", element.name);
        Self::new(name, SchemaKind::Sequence(Box::new(element)))
    }

    pub fn mapping(key: Schema, value: Schema) -> Self {
        let name = format!("Map<{}, {}>", key.name, value.name);
        Self::new(name, SchemaKind::Mapping(Box::new(key), Box::new(value)))
    }

    pub fn singleton(name: impl Into<String>) -> Self {
        Self::new(name, SchemaKind::Singleton)
    }

    pub fn tagged_union(name: impl Into<String>, variants: Vec<Variant>) -> Self {
        Self::new(name, SchemaKind::TaggedUnion(Variants::new(variants)))
    }

    pub fn optional(inner: Schema) -> Self {
        let name = format!("Option<{}>", inner.name);
        Self::new(name, SchemaKind::Optional(Box::new(inner)))
    }

    /// Fieldless enumeration; columns must hold one of `variants` exactly.
    pub fn enumeration<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let variants = variants.into_iter().map(Into::into).collect();
        Self::new(name, SchemaKind::Enum(variants))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    /// Structural category, or `None` for primitives and `Optional`.
    pub fn category(&self) -> Option<Category> {
        match &self.kind {
            SchemaKind::Record(_) => Some(Category::Record),
            SchemaKind::OpenRecord(_) => Some(Category::OpenRecord),
            SchemaKind::Sequence(_) => Some(Category::Sequence),
            SchemaKind::Mapping(_, _) => Some(Category::Mapping),
            SchemaKind::Singleton => Some(Category::Singleton),
            SchemaKind::TaggedUnion(_) => Some(Category::TaggedUnion),
            SchemaKind::Bool
            | SchemaKind::Int(_)
            | SchemaKind::Float(_)
            | SchemaKind::Char
            | SchemaKind::String
            | SchemaKind::Unit
            | SchemaKind::Enum(_)
            | SchemaKind::Optional(_) => None,
        }
    }

    /// Fields of a `Record` or `OpenRecord`.
    pub fn fields(&self) -> Option<&Fields> {
        match &self.kind {
            SchemaKind::Record(fields) | SchemaKind::OpenRecord(fields) => Some(fields),
            _ => None,
        }
    }

    /// Variants of a `TaggedUnion`.
    pub fn variants(&self) -> Option<&Variants> {
        match &self.kind {
            SchemaKind::TaggedUnion(variants) => Some(variants),
            _ => None,
        }
    }

    /// The descriptor with any `Optional` wrappers removed.
    pub fn without_optional(&self) -> &Schema {
        let mut schema = self;
        while let SchemaKind::Optional(inner) = &schema.kind {
            schema = inner;
        }
        schema
    }

    pub fn is_optional(&self) -> bool {
        matches!(self.kind, SchemaKind::Optional(_))
    }
}

/// Types that can describe their own tabular shape.
///
/// Implemented here for primitives and standard collections. Implement it for your
/// own structs and enums; field names must match the names Serde uses (after any
/// `#[serde(rename)]`).
///
/// ```rust
/// use serde_dsv::{Describe, Field, Schema};
///
/// struct Position {
///     latitude: f64,
///     longitude: f64,
/// }
///
/// impl Describe for Position {
///     fn describe() -> Schema {
///         Schema::record("Position", vec![
///             Field::new("latitude", f64::describe()),
///             Field::new("longitude", f64::describe()),
///         ])
///     }
/// }
///
/// let schema = Vec::<Position>::describe();
/// assert_eq!(schema.name(), "Seq<Position>");
/// ```
pub trait Describe {
    fn describe() -> Schema;
}

macro_rules! describe_primitive {
    ($($ty:ty => $name:literal, $kind:expr;)*) => {
        $(
            impl Describe for $ty {
                fn describe() -> Schema {
                    Schema::new($name, $kind)
                }
            }
        )*
    };
}

describe_primitive! {
    bool => "bool", SchemaKind::Bool;
    i8 => "i8", SchemaKind::Int(IntType::I8);
    i16 => "i16", SchemaKind::Int(IntType::I16);
    i32 => "i32", SchemaKind::Int(IntType::I32);
    i64 => "i64", SchemaKind::Int(IntType::I64);
    u8 => "u8", SchemaKind::Int(IntType::U8);
    u16 => "u16", SchemaKind::Int(IntType::U16);
    u32 => "u32", SchemaKind::Int(IntType::U32);
    u64 => "u64", SchemaKind::Int(IntType::U64);
    f32 => "f32", SchemaKind::Float(FloatType::F32);
    f64 => "f64", SchemaKind::Float(FloatType::F64);
    char => "char", SchemaKind::Char;
    String => "String", SchemaKind::String;
    () => "()", SchemaKind::Unit;
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> Schema {
        Schema::optional(T::describe())
    }
}

impl<T: Describe> Describe for Box<T> {
    fn describe() -> Schema {
        T::describe()
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> Schema {
        Schema::sequence(T::describe())
    }
}

impl<T: Describe> Describe for VecDeque<T> {
    fn describe() -> Schema {
        Schema::sequence(T::describe())
    }
}

impl<T: Describe> Describe for BTreeSet<T> {
    fn describe() -> Schema {
        Schema::sequence(T::describe())
    }
}

impl<T: Describe, S> Describe for HashSet<T, S> {
    fn describe() -> Schema {
        Schema::sequence(T::describe())
    }
}

impl<K: Describe, V: Describe> Describe for BTreeMap<K, V> {
    fn describe() -> Schema {
        Schema::mapping(K::describe(), V::describe())
    }
}

impl<K: Describe, V: Describe, S> Describe for HashMap<K, V, S> {
    fn describe() -> Schema {
        Schema::mapping(K::describe(), V::describe())
    }
}
