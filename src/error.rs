//! Defines error and its location
use std::fmt;

use serde::de::{self};

/// Line/column location within the source text (1-indexed).
///
/// `line` is the physical line where the record starts, `column` is the index of
/// the field within its record (not a character offset).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    /// 1-indexed line number in the input stream.
    pub(crate) line: u64,
    /// 1-indexed field number within the record.
    pub(crate) column: u64,
}

impl Location {
    /// Sentinel value meaning "location unknown".
    ///
    /// Used when a precise position is not yet available at error creation time.
    pub const UNKNOWN: Self = Self { line: 0, column: 0 };

    /// Create a new location record.
    ///
    /// Arguments:
    /// - `line`: 1-indexed line.
    /// - `column`: 1-indexed field within the record.
    pub(crate) const fn new(line: u64, column: u64) -> Self {
        Self { line, column }
    }

    /// Line where the offending record starts.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Field number within the record.
    pub fn column(&self) -> u64 {
        self.column
    }
}

/// Error type compatible with `serde::de::Error`.
#[derive(Debug)]
pub enum Error {
    /// Free-form error with optional source location.
    Message {
        msg: String,
        location: Location,
    },
    /// A column could not be parsed as the requested numeric or boolean type.
    ValueFormat {
        raw: String,
        target: &'static str,
        location: Location,
    },
    /// A `char` column did not hold exactly one character.
    InvalidCharLength {
        raw: String,
        location: Location,
    },
    /// A null was decoded but the column did not hold the null sentinel.
    NullSentinelMismatch {
        raw: String,
        expected: String,
        location: Location,
    },
    /// A unit value was decoded but the column did not hold the unit sentinel.
    UnitSentinelMismatch {
        raw: String,
        expected: String,
        location: Location,
    },
    /// The column names no variant of the target enumeration.
    UnknownEnumVariant {
        raw: String,
        location: Location,
    },
    /// The discriminator column names no registered variant of a tagged union.
    UnknownVariantTag {
        raw: String,
        location: Location,
    },
    /// The descriptor has no structural category this format can decode here.
    UnsupportedStructure {
        name: String,
        reason: &'static str,
        location: Location,
    },
    /// A collection or record ran out of columns before its declared size.
    StructuralUnderflow {
        expected: usize,
        found: usize,
        location: Location,
    },
    /// A column was requested past the end of the current record.
    UnexpectedEnd {
        location: Location,
    },
    /// Columns or records were left over after the value was complete.
    TrailingColumns {
        count: usize,
        location: Location,
    },
    /// Structures nested deeper than [`crate::Options::max_depth`].
    DepthLimitExceeded {
        depth: usize,
        location: Location,
    },
    /// The tokenizer rejected the input.
    Csv {
        cause: csv::Error,
        location: Location,
    },
    /// Unexpected I/O error. This may happen only when deserializing from a reader.
    IOError {
        cause: std::io::Error,
    },
}

impl Error {
    /// Construct a `Message` error with no known location.
    ///
    /// Called by:
    /// - Serde custom errors and the value bridge.
    pub(crate) fn msg<S: Into<String>>(s: S) -> Self {
        Error::Message {
            msg: s.into(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn value_format(raw: &str, target: &'static str) -> Self {
        Error::ValueFormat {
            raw: raw.to_owned(),
            target,
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn unsupported(name: &str, reason: &'static str) -> Self {
        Error::UnsupportedStructure {
            name: name.to_owned(),
            reason,
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn underflow(expected: usize, found: usize) -> Self {
        Error::StructuralUnderflow {
            expected,
            found,
            location: Location::UNKNOWN,
        }
    }

    /// Construct an unexpected end-of-record error with unknown location.
    pub(crate) fn unexpected_end() -> Self {
        Error::UnexpectedEnd {
            location: Location::UNKNOWN,
        }
    }

    /// Map a tokenizer failure. The cursor attaches the line.
    pub(crate) fn from_csv(cause: csv::Error) -> Self {
        if cause.is_io_error() {
            // Unwrap the I/O error so callers can match on `IOError` like other readers.
            return match cause.into_kind() {
                csv::ErrorKind::Io(cause) => Error::IOError { cause },
                other => Error::msg(format!("{other:?}")),
            };
        }
        Error::Csv {
            cause,
            location: Location::UNKNOWN,
        }
    }

    /// Attach/override a concrete location to this error and return it.
    ///
    /// Errors that already carry a known location keep it: the innermost failure
    /// is the most precise one.
    pub(crate) fn with_location(mut self, set_location: Location) -> Self {
        match &mut self {
            Error::Message { location, .. }
            | Error::ValueFormat { location, .. }
            | Error::InvalidCharLength { location, .. }
            | Error::NullSentinelMismatch { location, .. }
            | Error::UnitSentinelMismatch { location, .. }
            | Error::UnknownEnumVariant { location, .. }
            | Error::UnknownVariantTag { location, .. }
            | Error::UnsupportedStructure { location, .. }
            | Error::StructuralUnderflow { location, .. }
            | Error::UnexpectedEnd { location }
            | Error::TrailingColumns { location, .. }
            | Error::DepthLimitExceeded { location, .. }
            | Error::Csv { location, .. } => {
                if *location == Location::UNKNOWN {
                    *location = set_location;
                }
            }
            Error::IOError { .. } => {} // this error does not support location
        }
        self
    }

    /// If the error has a known location, return it.
    ///
    /// Returns:
    /// - `Some(Location)` when coordinates are known; `None` otherwise.
    pub fn location(&self) -> Option<Location> {
        match self {
            Error::Message { location, .. }
            | Error::ValueFormat { location, .. }
            | Error::InvalidCharLength { location, .. }
            | Error::NullSentinelMismatch { location, .. }
            | Error::UnitSentinelMismatch { location, .. }
            | Error::UnknownEnumVariant { location, .. }
            | Error::UnknownVariantTag { location, .. }
            | Error::UnsupportedStructure { location, .. }
            | Error::StructuralUnderflow { location, .. }
            | Error::UnexpectedEnd { location }
            | Error::TrailingColumns { location, .. }
            | Error::DepthLimitExceeded { location, .. }
            | Error::Csv { location, .. } => {
                if location != &Location::UNKNOWN {
                    Some(*location)
                } else {
                    None
                }
            }
            Error::IOError { .. } => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Message { msg, location } => fmt_with_location(f, msg, location),
            Error::ValueFormat { raw, target, location } => {
                fmt_with_location(f, &format!("invalid {target}: `{raw}`"), location)
            }
            Error::InvalidCharLength { raw, location } => fmt_with_location(
                f,
                &format!("invalid char: expected exactly one character, found `{raw}`"),
                location,
            ),
            Error::NullSentinelMismatch { raw, expected, location } => fmt_with_location(
                f,
                &format!("expected null `{expected}` but was `{raw}`"),
                location,
            ),
            Error::UnitSentinelMismatch { raw, expected, location } => fmt_with_location(
                f,
                &format!("expected unit `{expected}` but was `{raw}`"),
                location,
            ),
            Error::UnknownEnumVariant { raw, location } => {
                fmt_with_location(f, &format!("unknown enum variant `{raw}`"), location)
            }
            Error::UnknownVariantTag { raw, location } => {
                fmt_with_location(f, &format!("unknown variant tag `{raw}`"), location)
            }
            Error::UnsupportedStructure { name, reason, location } => fmt_with_location(
                f,
                &format!("unsupported structure `{name}`: {reason}"),
                location,
            ),
            Error::StructuralUnderflow { expected, found, location } => fmt_with_location(
                f,
                &format!("expected {expected} elements but input ended after {found}"),
                location,
            ),
            Error::UnexpectedEnd { location } => {
                fmt_with_location(f, "unexpected end of record", location)
            }
            Error::TrailingColumns { count, location } => {
                fmt_with_location(f, &format!("{count} unexpected trailing column(s)"), location)
            }
            Error::DepthLimitExceeded { depth, location } => fmt_with_location(
                f,
                &format!("structures nested deeper than {depth} levels"),
                location,
            ),
            Error::Csv { cause, location } => fmt_with_location(f, &cause.to_string(), location),
            Error::IOError { cause } => write!(f, "IO error: {}", cause),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Csv { cause, .. } => Some(cause),
            Error::IOError { cause } => Some(cause),
            _ => None,
        }
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::msg(msg.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(cause: std::io::Error) -> Self {
        Error::IOError { cause }
    }
}

/// Print a message optionally suffixed with "at line X, column Y".
fn fmt_with_location(f: &mut fmt::Formatter<'_>, msg: &str, location: &Location) -> fmt::Result {
    if location != &Location::UNKNOWN {
        write!(f, "{msg} at line {}, column {}", location.line, location.column)
    } else {
        write!(f, "{msg}")
    }
}
