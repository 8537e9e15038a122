//! The `options!` shorthand.
//!
//! Dialect settings are usually a handful of overrides on top of the RFC 4180
//! defaults; the macro spells out only those.

/// Build [`crate::Options`] from the defaults, overriding the listed fields.
///
/// ```rust
/// let tsv_with_headers = serde_dsv::options! {
///     delimiter: b'\t',
///     has_header_record: true,
///     null_string: "NULL".to_string(),
/// };
/// assert_eq!(tsv_with_headers.quote, b'"');
/// assert_eq!(tsv_with_headers.null_string, "NULL");
/// ```
#[macro_export]
macro_rules! options {
    ( $( $field:ident : $value:expr ),* $(,)? ) => {
        $crate::Options {
            $( $field: $value, )*
            ..$crate::Options::default()
        }
    };
}
