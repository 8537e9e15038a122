//! Header resolution: maps the column names of the first record onto record fields.
//!
//! Column names are matched against field names under a prefix. A name that equals a
//! field is mapped directly. A name of the form `field<sep>rest`, where `field` is a
//! nested record, opens a group: every following column starting with `field<sep>` is
//! resolved against the nested record, and the whole group takes one position in the
//! enclosing map. Names that match nothing stay unmapped and their data columns are
//! skipped.
//!
//! ```text
//! a , inner.x , inner.y , b      row schema { a, inner: { x, y }, b }
//! 0   1 ------------------ 2     positions of the root map
//!     0         1                positions of the nested map for `inner`
//! ```
//!
//! A column named exactly like a tagged-union field holds its discriminator. Columns
//! directly after it that start with `field<sep>` are resolved against the variants:
//! `field<sep>Tag` is a marker column of the variant `Tag`, and `field<sep>Tag<sep>rest`
//! opens a group for the fields of a record variant.
//!
//! ```text
//! c , c.Unit , c.Pair.l , c.Pair.r   union c { Unit, Pair { l, r } }
//! 0 -------------------------------  one position of the root map
//!     0        1 ---------------     variant positions after the discriminator
//! ```

use std::io::Read;

use crate::cursor::ColumnCursor;
use crate::schema::{Category, Fields, Schema, Variants};

/// Resolution of one header position.
#[derive(Debug, PartialEq)]
pub(crate) struct HeaderEntry {
    /// Index of the field in the record's declaration order, or of the variant in a
    /// union scope.
    pub(crate) field: usize,
    /// Present when the position is a group of columns for a nested record, or the
    /// variant columns that follow a union discriminator.
    pub(crate) nested: Option<HeaderMap>,
}

/// Position-keyed resolution tree for one record or union scope.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct HeaderMap {
    /// Union scope: a discriminator column precedes the entries.
    discriminator: bool,
    entries: Vec<Option<HeaderEntry>>,
}

impl HeaderMap {
    /// Number of positions in this scope, mapped or not.
    pub(crate) fn width(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn get(&self, position: usize) -> Option<&HeaderEntry> {
        self.entries.get(position).and_then(Option::as_ref)
    }

    /// Number of mapped positions, nested groups counted as one.
    pub(crate) fn mapped(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    /// Number of data columns covered by this scope.
    pub(crate) fn column_span(&self) -> usize {
        let entries: usize = self
            .entries
            .iter()
            .map(|entry| {
                entry
                    .as_ref()
                    .and_then(|entry| entry.nested.as_ref())
                    .map_or(1, HeaderMap::column_span)
            })
            .sum();
        entries + usize::from(self.discriminator)
    }
}

/// Names looked up under one prefix: the fields of a record or the tags of a union.
#[derive(Clone, Copy)]
enum Scope<'s> {
    Record(&'s Fields),
    Union(&'s Variants),
}

impl<'s> Scope<'s> {
    fn index_of(self, name: &str) -> Option<usize> {
        match self {
            Scope::Record(fields) => fields.index_of(name),
            Scope::Union(variants) => variants.index_of(name),
        }
    }

    fn schema(self, index: usize) -> Option<&'s Schema> {
        match self {
            Scope::Record(fields) => fields.get(index).map(|field| field.schema()),
            Scope::Union(variants) => variants.by_index(index).map(|variant| variant.schema()),
        }
    }
}

/// Consume the first record as column names for a record described by `schema`.
///
/// Returns `None` if `schema` has no fields to resolve against.
pub(crate) fn resolve_headers<R: Read>(
    cursor: &mut ColumnCursor<R>,
    schema: &Schema,
    separator: &str,
) -> Option<HeaderMap> {
    let fields = schema.fields()?;
    let map = resolve(cursor, Scope::Record(fields), "", separator);
    log::debug!(
        "resolved {} header position(s) for `{}`, {} mapped",
        map.width(),
        schema.name(),
        map.mapped()
    );
    Some(map)
}

fn resolve<R: Read>(
    cursor: &mut ColumnCursor<R>,
    scope: Scope<'_>,
    prefix: &str,
    separator: &str,
) -> HeaderMap {
    let mut map = HeaderMap {
        discriminator: matches!(scope, Scope::Union(_)),
        entries: Vec::new(),
    };
    while cursor.is_first_record() && !cursor.is_end_of_record() {
        cursor.mark();
        let Ok(token) = cursor.read_column().map(str::to_owned) else {
            cursor.unmark();
            break;
        };
        let Some(local) = token.strip_prefix(prefix) else {
            // Belongs to an enclosing scope.
            cursor.reset();
            break;
        };

        if let Some(field) = scope.index_of(local) {
            cursor.unmark();
            let nested = match (scope, union_variants(scope, field, separator)) {
                (Scope::Record(_), Some(variants)) => {
                    let variant_prefix = format!("{prefix}{local}{separator}");
                    let group = resolve(cursor, Scope::Union(variants), &variant_prefix, separator);
                    (group.width() > 0).then_some(group)
                }
                _ => None,
            };
            map.entries.push(Some(HeaderEntry { field, nested }));
            continue;
        }

        match nested_candidate(scope, local, separator) {
            Some((field, fields, candidate)) => {
                cursor.reset();
                let nested_prefix = format!("{prefix}{candidate}{separator}");
                let nested = resolve(cursor, Scope::Record(fields), &nested_prefix, separator);
                map.entries.push(Some(HeaderEntry {
                    field,
                    nested: Some(nested),
                }));
            }
            None => {
                cursor.unmark();
                log::trace!("header `{token}` matches no field, column will be skipped");
                map.entries.push(None);
            }
        }
    }
    map
}

/// Variants of the union at `index`, if the scope entry is one and nesting is enabled.
fn union_variants<'s>(scope: Scope<'s>, index: usize, separator: &str) -> Option<&'s Variants> {
    if separator.is_empty() {
        return None;
    }
    scope.schema(index)?.without_optional().variants()
}

/// Split `local` at the first separator; return the entry it opens if that entry
/// is a nested record.
fn nested_candidate<'s, 'l>(
    scope: Scope<'s>,
    local: &'l str,
    separator: &str,
) -> Option<(usize, &'s Fields, &'l str)> {
    if separator.is_empty() {
        return None;
    }
    let (candidate, _) = local.split_once(separator)?;
    let index = scope.index_of(candidate)?;
    let schema = scope.schema(index)?.without_optional();
    if schema.category() != Some(Category::Record) {
        return None;
    }
    Some((index, schema.fields()?, candidate))
}
