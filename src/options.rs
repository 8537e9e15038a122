use serde::{Deserialize, Serialize};

/// Decoder configuration options.
///
/// Controls the tokenizer (delimiter, quoting), header handling and the sentinel
/// tokens that stand in for `null` and `()`.
///
/// Example: read rows with a header record using custom `Options`.
///
/// ```rust
/// use serde::Deserialize;
/// use serde_dsv::{Describe, Field, Schema};
///
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct Reading {
///     sensor: String,
///     value: f64,
/// }
///
/// impl Describe for Reading {
///     fn describe() -> Schema {
///         Schema::record("Reading", vec![
///             Field::new("sensor", String::describe()),
///             Field::new("value", f64::describe()),
///         ])
///     }
/// }
///
/// let text = "value;sensor\n21.5;kitchen\n";
///
/// let options = serde_dsv::options! {
///     delimiter: b';',
///     has_header_record: true,
/// };
///
/// let rows: Vec<Reading> = serde_dsv::from_str_with_options(text, options).unwrap();
/// assert_eq!(rows[0].sensor, "kitchen");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Field delimiter. Default: `,`.
    pub delimiter: u8,
    /// Quote character. Default: `"`.
    pub quote: u8,
    /// Escape character inside quoted fields. `None` (default) means quotes are
    /// escaped by doubling them, as in RFC 4180.
    pub escape: Option<u8>,
    /// If true, the first record holds column names and is never decoded as data.
    /// Default: false.
    pub has_header_record: bool,
    /// Separator between the segments of a nested column name (`driver.name`).
    /// Default: `.`. An empty separator disables nested header matching.
    pub header_separator: String,
    /// If true, every record ends with a delimiter, producing an empty trailing
    /// column that is discarded. Default: false.
    pub has_trailing_delimiter: bool,
    /// If true, records holding a single empty column (`""`, or a lone trailing
    /// delimiter) are skipped between rows. Lines without any characters are always
    /// skipped by the tokenizer. Default: true.
    pub ignore_empty_lines: bool,
    /// Token standing in for an absent optional value. Default: empty string.
    ///
    /// With the empty default, an empty column decoded into `Option<String>` is
    /// `None`: an empty string cannot be told apart from null. Pick a distinct
    /// sentinel (for example `\N`) if that distinction matters.
    pub null_string: String,
    /// Token standing in for the unit value `()`. Default: `()`.
    pub unit_string: String,
    /// Maximum nesting of structures (records, collections, unions).
    /// Default: 128.
    pub max_depth: usize,
}

impl Options {
    /// RFC 4180 comma-separated values. Same as the defaults.
    pub fn rfc4180() -> Self {
        Self::default()
    }

    /// Tab-separated values with backslash escapes and `\N` as the null token.
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            escape: Some(b'\\'),
            null_string: "\\N".to_string(),
            ..Self::default()
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            escape: None,
            has_header_record: false,
            header_separator: ".".to_string(),
            has_trailing_delimiter: false,
            ignore_empty_lines: true,
            null_string: String::new(),
            unit_string: "()".to_string(),
            max_depth: 128,
        }
    }
}
