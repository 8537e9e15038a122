//! The decode engine: structural dispatch over an explicit frame stack.
//!
//! Every structural decode (record, collection, union, singleton) pushes a [`Frame`].
//! A frame counts the logical elements consumed so far: one per primitive column, one
//! per nested structure once it completes. Completing a structure pops its frame and
//! advances the new top frame by exactly one.

use std::io::Read;

use smallvec::SmallVec;

use crate::cursor::ColumnCursor;
use crate::error::{Error, Location};
use crate::header::{HeaderMap, resolve_headers};
use crate::options::Options;
use crate::parse_scalars::{parse_count, parse_null, parse_primitive};
use crate::schema::{Category, Fields, Schema, SchemaKind};
use crate::value::Value;

/// Upper bound on capacity reserved from a declared collection size.
const PREALLOCATION_LIMIT: usize = 1024;

/// Largest declared size of a collection whose elements read no column.
const ZERO_WIDTH_LIMIT: usize = 1 << 16;

#[derive(Debug)]
struct Frame<'a> {
    category: Category,
    /// Logical elements consumed so far.
    position: usize,
    headers: Option<&'a HeaderMap>,
}

pub(crate) struct Decoder<'a, R: Read> {
    cursor: ColumnCursor<R>,
    options: &'a Options,
    frames: SmallVec<[Frame<'a>; 16]>,
}

impl<'a, R: Read> Decoder<'a, R> {
    pub(crate) fn new(cursor: ColumnCursor<R>, options: &'a Options) -> Self {
        Self {
            cursor,
            options,
            frames: SmallVec::new(),
        }
    }

    fn push(&mut self, category: Category, headers: Option<&'a HeaderMap>) -> Result<(), Error> {
        if self.frames.len() >= self.options.max_depth {
            return Err(Error::DepthLimitExceeded {
                depth: self.options.max_depth,
                location: self.cursor.location(),
            });
        }
        log::trace!("enter {category:?} at depth {}", self.frames.len());
        self.frames.push(Frame {
            category,
            position: 0,
            headers,
        });
        Ok(())
    }

    /// Complete the top structure: pop it and count it as one element of its parent.
    fn pop(&mut self) {
        if let Some(frame) = self.frames.pop() {
            log::trace!("leave {:?} after {} element(s)", frame.category, frame.position);
        }
        self.advance();
    }

    fn advance(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.position += 1;
        }
    }

    fn position(&self) -> usize {
        self.frames.last().map_or(0, |frame| frame.position)
    }

    fn headers(&self) -> Option<&'a HeaderMap> {
        self.frames.last().and_then(|frame| frame.headers)
    }

    /// Decode one logical element described by `schema`.
    ///
    /// `headers` is the resolved header subtree when the element is a nested record
    /// in header mode.
    pub(crate) fn decode_element(
        &mut self,
        schema: &Schema,
        headers: Option<&'a HeaderMap>,
    ) -> Result<Value, Error> {
        match schema.kind() {
            SchemaKind::Optional(inner) => {
                let null = &self.options.null_string;
                let (is_null, width) = match headers {
                    Some(group) => {
                        let width = group.column_span();
                        (self.cursor.is_null_run(null, width), width)
                    }
                    None => (self.cursor.is_null_token(null), 1),
                };
                if is_null {
                    self.decode_null(width)
                } else {
                    self.decode_element(inner, headers)
                }
            }
            kind => match schema.category() {
                Some(_) => self.decode_structure(schema, headers),
                None => {
                    let location = self.cursor.location();
                    let raw = self.cursor.read_column()?;
                    let value = parse_primitive(raw, kind, self.options)
                        .ok_or_else(|| Error::unsupported(schema.name(), "not a primitive"))?
                        .map_err(|err| err.with_location(location))?;
                    self.advance();
                    Ok(value)
                }
            },
        }
    }

    /// Consume `width` null sentinels as one absent element.
    fn decode_null(&mut self, width: usize) -> Result<Value, Error> {
        for _ in 0..width {
            let location = self.cursor.location();
            let raw = self.cursor.read_column()?;
            parse_null(raw, &self.options.null_string).map_err(|err| err.with_location(location))?;
        }
        self.advance();
        Ok(Value::Null)
    }

    /// Pick the strategy for a structural descriptor and run it inside its own frame.
    pub(crate) fn decode_structure(
        &mut self,
        schema: &Schema,
        headers: Option<&'a HeaderMap>,
    ) -> Result<Value, Error> {
        let Some(category) = schema.category() else {
            return Err(Error::unsupported(schema.name(), "no structural category")
                .with_location(self.cursor.location()));
        };
        self.push(category, headers)?;
        let value = match category {
            Category::Record | Category::OpenRecord => self.decode_record(schema)?,
            Category::Sequence | Category::Mapping => self.decode_collection(schema)?,
            Category::Singleton => Value::Unit,
            Category::TaggedUnion => self.decode_union(schema)?,
        };
        self.pop();
        Ok(value)
    }

    fn decode_record(&mut self, schema: &Schema) -> Result<Value, Error> {
        let fields = schema
            .fields()
            .ok_or_else(|| Error::unsupported(schema.name(), "record without fields"))?;
        match self.headers() {
            Some(headers) => self.decode_record_with_headers(fields, headers),
            None => self.decode_record_in_order(fields),
        }
    }

    /// Fields follow the resolved header positions; unmapped columns are skipped.
    fn decode_record_with_headers(
        &mut self,
        fields: &Fields,
        headers: &'a HeaderMap,
    ) -> Result<Value, Error> {
        let mut values: Vec<(String, Value)> = Vec::with_capacity(headers.mapped());
        loop {
            let position = self.position();
            if position >= headers.width() || self.cursor.is_end_of_record() {
                break;
            }
            let Some(entry) = headers.get(position) else {
                self.skip_columns(1)?;
                continue;
            };
            let field = fields
                .get(entry.field)
                .ok_or_else(|| Error::msg(format!("header maps to missing field {}", entry.field)))?;
            let value = self.decode_element(field.schema(), entry.nested.as_ref())?;
            merge_field(&mut values, field.name(), value);
        }
        Ok(Value::Record(values))
    }

    /// Fields in declaration order, one after another.
    fn decode_record_in_order(&mut self, fields: &Fields) -> Result<Value, Error> {
        let mut values = Vec::with_capacity(fields.len());
        while let Some(field) = fields.get(self.position()) {
            let schema = field.schema();
            let value = if !self.cursor.is_end_of_record() || !consumes_columns(schema) {
                self.decode_element(schema, None)?
            } else if schema.is_optional() {
                self.advance();
                Value::Null
            } else {
                return Err(Error::underflow(fields.len(), values.len())
                    .with_location(self.cursor.location()));
            };
            values.push((field.name().to_owned(), value));
        }
        Ok(Value::Record(values))
    }

    /// Leading element count, then exactly that many elements (entries for maps).
    fn decode_collection(&mut self, schema: &Schema) -> Result<Value, Error> {
        let location = self.cursor.location();
        let raw = self.cursor.read_column()?;
        let count = parse_count(raw).map_err(|err| err.with_location(location))?;
        let zero_width = match schema.kind() {
            SchemaKind::Sequence(element) => !consumes_columns(element),
            SchemaKind::Mapping(key, value) => !consumes_columns(key) && !consumes_columns(value),
            _ => false,
        };
        if zero_width && count > ZERO_WIDTH_LIMIT {
            return Err(Error::value_format(raw, "collection size of zero-width elements")
                .with_location(location));
        }
        match schema.kind() {
            SchemaKind::Sequence(element) => {
                let mut items = Vec::with_capacity(count.min(PREALLOCATION_LIMIT));
                while self.position() < count {
                    self.ensure_columns(element, count, items.len())?;
                    items.push(self.decode_element(element, None)?);
                }
                Ok(Value::Seq(items))
            }
            SchemaKind::Mapping(key, value) => {
                let mut entries = Vec::with_capacity(count.min(PREALLOCATION_LIMIT));
                while self.position() < count.saturating_mul(2) {
                    self.ensure_columns(key, count, entries.len())?;
                    let k = self.decode_element(key, None)?;
                    self.ensure_columns(value, count, entries.len())?;
                    let v = self.decode_element(value, None)?;
                    entries.push((k, v));
                }
                Ok(Value::Map(entries))
            }
            _ => Err(Error::unsupported(schema.name(), "not a collection").with_location(location)),
        }
    }

    /// Fail with `StructuralUnderflow` if `schema` needs a column and none is left.
    fn ensure_columns(&self, schema: &Schema, expected: usize, found: usize) -> Result<(), Error> {
        if self.cursor.is_end_of_record() && consumes_columns(schema) {
            Err(Error::underflow(expected, found).with_location(self.cursor.location()))
        } else {
            Ok(())
        }
    }

    /// Discriminator column, then the payload of the variant it names.
    ///
    /// Without variant columns in the header the payload follows inline. With them,
    /// the selected variant is decoded from its own groups and the columns of every
    /// other variant are skipped.
    fn decode_union(&mut self, schema: &Schema) -> Result<Value, Error> {
        let SchemaKind::TaggedUnion(variants) = schema.kind() else {
            return Err(Error::unsupported(schema.name(), "not a tagged union"));
        };
        let location = self.cursor.location();
        let tag = self.cursor.read_column()?.to_owned();
        self.advance();
        let Some((index, variant)) = variants
            .index_of(&tag)
            .and_then(|index| Some((index, variants.by_index(index)?)))
        else {
            return Err(Error::UnknownVariantTag { raw: tag, location });
        };
        let payload = match self.headers() {
            Some(group) => self.decode_variant_columns(index, variant.schema(), group)?,
            None => self.decode_element(variant.schema(), None)?,
        };
        Ok(Value::Variant {
            tag,
            payload: Box::new(payload),
        })
    }

    fn decode_variant_columns(
        &mut self,
        selected: usize,
        schema: &Schema,
        group: &'a HeaderMap,
    ) -> Result<Value, Error> {
        let mut payload = None;
        for position in 0..group.width() {
            match group.get(position) {
                Some(entry) if entry.field == selected => match &entry.nested {
                    Some(columns) => {
                        let value = self.decode_element(schema, Some(columns))?;
                        payload = Some(match payload.take() {
                            Some(mut merged) => {
                                merge_value(&mut merged, value);
                                merged
                            }
                            None => value,
                        });
                    }
                    // Marker column of the variant.
                    None => self.skip_columns(1)?,
                },
                Some(entry) => {
                    let span = entry.nested.as_ref().map_or(1, HeaderMap::column_span);
                    self.skip_columns(span)?;
                }
                None => self.skip_columns(1)?,
            }
        }
        match payload {
            Some(payload) => Ok(payload),
            None if !consumes_columns(schema) => self.decode_element(schema, None),
            None if schema.without_optional().fields().is_some() => {
                self.advance();
                Ok(Value::Record(Vec::new()))
            }
            None => Err(Error::unsupported(schema.name(), "variant has no columns in the header")
                .with_location(self.cursor.location())),
        }
    }

    /// Consume up to `count` columns of the current record as one skipped element.
    fn skip_columns(&mut self, count: usize) -> Result<(), Error> {
        for _ in 0..count {
            if self.cursor.is_end_of_record() {
                break;
            }
            self.cursor.read_column()?;
        }
        self.advance();
        Ok(())
    }

    /// A list of rows: one element per record, no leading count.
    pub(crate) fn decode_rows(
        &mut self,
        element: &Schema,
        headers: Option<&'a HeaderMap>,
    ) -> Result<Value, Error> {
        self.push(Category::Sequence, None)?;
        let mut rows = Vec::new();
        loop {
            if self.options.ignore_empty_lines {
                self.cursor.read_empty_lines()?;
            }
            if self.cursor.is_done() {
                break;
            }
            rows.push(self.decode_element(element, headers)?);
            self.cursor.read_end_of_record()?;
        }
        self.pop();
        Ok(Value::Seq(rows))
    }

    /// Exactly one row; anything after it is an error.
    pub(crate) fn decode_single_row(
        &mut self,
        schema: &Schema,
        headers: Option<&'a HeaderMap>,
    ) -> Result<Value, Error> {
        if self.cursor.is_done() {
            return Err(Error::unexpected_end());
        }
        let value = self.decode_element(schema, headers)?;
        self.cursor.read_end_of_record()?;
        if self.options.ignore_empty_lines {
            self.cursor.read_empty_lines()?;
        }
        if !self.cursor.is_done() {
            return Err(Error::TrailingColumns {
                count: self.cursor.remaining(),
                location: self.cursor.location(),
            });
        }
        Ok(value)
    }

    pub(crate) fn location(&self) -> Location {
        self.cursor.location()
    }
}

/// False for shapes that decode without reading any column.
fn consumes_columns(schema: &Schema) -> bool {
    match schema.kind() {
        SchemaKind::Singleton => false,
        SchemaKind::Record(fields) | SchemaKind::OpenRecord(fields) => {
            fields.iter().any(|field| consumes_columns(field.schema()))
        }
        _ => true,
    }
}

/// Add a decoded field; records from separate header groups of the same field merge.
fn merge_field(values: &mut Vec<(String, Value)>, name: &str, value: Value) {
    match values.iter_mut().find(|(n, _)| n == name) {
        Some((_, slot)) => merge_value(slot, value),
        None => values.push((name.to_owned(), value)),
    }
}

/// Fold a later group into an earlier one. A null group never hides a decoded one.
fn merge_value(slot: &mut Value, value: Value) {
    match (slot, value) {
        (Value::Record(existing), Value::Record(more)) => existing.extend(more),
        (_, Value::Null) => {}
        (slot, value) => *slot = value,
    }
}

/// Run one decode session: optional header resolution, then rows or a single row.
pub(crate) fn decode_session<R: Read>(
    input: R,
    schema: &Schema,
    options: &Options,
) -> Result<Value, Error> {
    log::debug!(
        "decoding `{}` (headers: {}, delimiter: {:?})",
        schema.name(),
        options.has_header_record,
        options.delimiter as char
    );
    let (row_schema, rows) = match schema.kind() {
        SchemaKind::Sequence(element) => (element.as_ref(), true),
        _ => (schema, false),
    };
    if options.has_header_record
        && !matches!(
            row_schema.category(),
            Some(Category::Record | Category::OpenRecord)
        )
    {
        return Err(Error::unsupported(
            row_schema.name(),
            "header mode needs a record as the row type",
        ));
    }

    let mut cursor = ColumnCursor::new(input, options)?;
    if options.ignore_empty_lines {
        cursor.read_empty_lines()?;
    }
    let headers = if options.has_header_record && !cursor.is_done() {
        let headers = resolve_headers(&mut cursor, row_schema, &options.header_separator);
        cursor.read_end_of_record()?;
        headers
    } else {
        None
    };

    let mut decoder = Decoder::new(cursor, options);
    let result = if rows {
        decoder.decode_rows(row_schema, headers.as_ref())
    } else {
        decoder.decode_single_row(row_schema, headers.as_ref())
    };
    result.map_err(|err| err.with_location(decoder.location()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Describe, Field, Variant};

    fn decode(text: &str, schema: &Schema, options: &Options) -> Result<Value, Error> {
        decode_session(text.as_bytes(), schema, options)
    }

    fn point() -> Schema {
        Schema::record(
            "Point",
            vec![Field::new("x", i32::describe()), Field::new("y", i32::describe())],
        )
    }

    #[test]
    fn frame_advances_once_per_nested_structure() {
        let schema = Schema::record(
            "Line",
            vec![
                Field::new("from", point()),
                Field::new("tags", Vec::<String>::describe()),
                Field::new("to", point()),
            ],
        );
        let value = decode("1,2,2,a,b,3,4\n", &schema, &Options::default()).unwrap();
        let to = value.get("to").unwrap();
        assert_eq!(to.get("x"), Some(&Value::Int(3)));
        assert_eq!(
            value.get("tags"),
            Some(&Value::Seq(vec![
                Value::String("a".into()),
                Value::String("b".into())
            ]))
        );
    }

    #[test]
    fn singleton_consumes_nothing() {
        let schema = Schema::record(
            "Marked",
            vec![
                Field::new("marker", Schema::singleton("Marker")),
                Field::new("n", u8::describe()),
            ],
        );
        let value = decode("7\n", &schema, &Options::default()).unwrap();
        assert_eq!(value.get("marker"), Some(&Value::Unit));
        assert_eq!(value.get("n"), Some(&Value::UInt(7)));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let schema = Vec::<Vec<Vec<i32>>>::describe();
        let options = Options {
            max_depth: 2,
            ..Options::default()
        };
        let err = decode("1,1,5\n", &schema, &options).unwrap_err();
        assert!(matches!(err, Error::DepthLimitExceeded { depth: 2, .. }));
    }

    #[test]
    fn huge_count_underflows_instead_of_allocating() {
        let err = decode("18446744073709551615,1\n", &Vec::<Vec<i32>>::describe(), &Options::default())
            .unwrap_err();
        assert!(matches!(err, Error::StructuralUnderflow { found: 1, .. }));
    }

    #[test]
    fn huge_count_of_zero_width_elements_is_rejected() {
        let schema = Schema::sequence(Schema::sequence(Schema::singleton("Marker")));
        let err = decode("18446744073709551615\n", &schema, &Options::default()).unwrap_err();
        assert!(
            matches!(err, Error::ValueFormat { target: "collection size of zero-width elements", .. }),
            "{err:?}"
        );
        assert_eq!(err.location(), Some(Location::new(1, 1)));

        let value = decode("3\n", &schema, &Options::default()).unwrap();
        assert_eq!(value, Value::Seq(vec![Value::Seq(vec![Value::Unit; 3])]));
    }

    #[test]
    fn union_payload_follows_tag() {
        let schema = Schema::tagged_union(
            "Shape",
            vec![
                Variant::new("Dot", point()),
                Variant::new("None", Schema::singleton("None")),
            ],
        );
        let value = decode("Dot,1,2\n", &schema, &Options::default()).unwrap();
        match value {
            Value::Variant { tag, payload } => {
                assert_eq!(tag, "Dot");
                assert_eq!(payload.get("y"), Some(&Value::Int(2)));
            }
            other => panic!("unexpected {other:?}"),
        }
        let err = decode("Line,1,2\n", &schema, &Options::default()).unwrap_err();
        assert_eq!(err.location(), Some(Location::new(1, 1)));
    }

    #[test]
    fn null_header_group_consumes_whole_group() {
        let row = Schema::record(
            "Row",
            vec![
                Field::new("p", Schema::optional(point())),
                Field::new("n", u8::describe()),
            ],
        );
        let options = Options {
            has_header_record: true,
            ..Options::default()
        };
        let value = decode("p.x,p.y,n\n,,5\n", &Schema::sequence(row), &options).unwrap();
        let Value::Seq(rows) = value else {
            panic!("expected rows");
        };
        assert!(rows[0].get("p").unwrap().is_null());
        assert_eq!(rows[0].get("n"), Some(&Value::UInt(5)));
    }

    #[test]
    fn span_counts_nested_columns() {
        let mut cursor =
            ColumnCursor::new("a,b.x,b.y,c\n".as_bytes(), &Options::default()).unwrap();
        let schema = Schema::record(
            "R",
            vec![
                Field::new("a", i32::describe()),
                Field::new("b", point()),
                Field::new("c", i32::describe()),
            ],
        );
        let headers = resolve_headers(&mut cursor, &schema, ".").unwrap();
        assert_eq!(headers.width(), 3);
        assert_eq!(headers.column_span(), 4);
    }
}
