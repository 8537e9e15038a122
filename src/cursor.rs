//! Column cursor: a sequential, position-aware view of the input, one column at a time.
//!
//! Tokenizing (quotes, escapes, delimiters, line terminators) is delegated to the `csv`
//! crate. The cursor keeps one [`StringRecord`] buffered and hands its columns out left
//! to right. Lookahead is limited to nested `mark`/`reset` pairs inside that record,
//! which is all header resolution needs.
//!
//! Lines with no characters at all never reach the cursor: the tokenizer drops them.

use std::collections::VecDeque;
use std::io::{self, Read};

use csv::StringRecord;
use smallvec::SmallVec;

use crate::error::{Error, Location};
use crate::options::Options;

/// Input adapter recording the byte offsets of line breaks as the tokenizer reads.
///
/// `\r\n`, `\n` and a lone `\r` each count as one break, inside quoted fields too.
struct LineIndex<R> {
    inner: R,
    /// Bytes handed to the tokenizer so far.
    offset: u64,
    /// Breaks not yet passed by a line lookup.
    breaks: VecDeque<u64>,
    /// Breaks already dropped from `breaks`.
    passed: u64,
    after_cr: bool,
}

impl<R: Read> LineIndex<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            breaks: VecDeque::new(),
            passed: 0,
            after_cr: false,
        }
    }

    /// 1-based line of the byte at `offset`. Offsets must not decrease between calls.
    fn line_of(&mut self, offset: u64) -> u64 {
        while self.breaks.front().is_some_and(|&b| b < offset) {
            self.breaks.pop_front();
            self.passed += 1;
        }
        self.passed + 1
    }
}

impl<R: Read> Read for LineIndex<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        for (i, &byte) in buf[..n].iter().enumerate() {
            match byte {
                b'\r' => self.breaks.push_back(self.offset + i as u64),
                b'\n' if !self.after_cr => self.breaks.push_back(self.offset + i as u64),
                _ => {}
            }
            self.after_cr = byte == b'\r';
        }
        self.offset += n as u64;
        Ok(n)
    }
}

/// Line breaks inside `text`, counted the way [`LineIndex`] counts them.
fn count_breaks(text: &str) -> u64 {
    let pairs = text.matches("\r\n").count();
    (text.matches('\r').count() + text.matches('\n').count() - pairs) as u64
}

pub(crate) struct ColumnCursor<R: Read> {
    reader: csv::Reader<LineIndex<R>>,
    record: StringRecord,
    /// 1-based line the buffered record starts on.
    line: u64,
    /// Next column to hand out.
    column: usize,
    /// False once the input is exhausted.
    loaded: bool,
    /// True until the first record that is not skipped as empty is finished.
    first: bool,
    marks: SmallVec<[usize; 4]>,
    trailing_delimiter: bool,
}

impl<R: Read> ColumnCursor<R> {
    /// Build the tokenizer from `options` and buffer the first record.
    pub(crate) fn new(input: R, options: &Options) -> Result<Self, Error> {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(options.delimiter)
            .quote(options.quote)
            .escape(options.escape)
            .double_quote(options.escape.is_none());
        let mut cursor = Self {
            reader: builder.from_reader(LineIndex::new(input)),
            record: StringRecord::new(),
            line: 0,
            column: 0,
            loaded: true,
            first: true,
            marks: SmallVec::new(),
            trailing_delimiter: options.has_trailing_delimiter,
        };
        cursor.read_record()?;
        Ok(cursor)
    }

    /// Buffer the next record and the line it starts on.
    ///
    /// The tokenizer reports where it started looking for a record, which may be a
    /// leftover terminator byte or skipped blank lines. The start line is derived
    /// from where the record ended instead, minus the breaks inside its fields.
    fn read_record(&mut self) -> Result<(), Error> {
        match self.reader.read_record(&mut self.record) {
            Ok(loaded) => {
                self.loaded = loaded;
                if loaded {
                    let end = self.reader.position().byte();
                    let last_line = self.reader.get_mut().line_of(end.saturating_sub(1));
                    let inner: u64 = self.record.iter().map(count_breaks).sum();
                    self.line = last_line.saturating_sub(inner).max(1);
                }
                Ok(())
            }
            Err(cause) => {
                let location = match cause.position() {
                    Some(position) => {
                        Location::new(self.reader.get_mut().line_of(position.byte()), 0)
                    }
                    None => Location::UNKNOWN,
                };
                Err(Error::from_csv(cause).with_location(location))
            }
        }
    }

    fn load_next(&mut self) -> Result<(), Error> {
        self.marks.clear();
        self.column = 0;
        if !self.loaded {
            return Ok(());
        }
        self.read_record()
    }

    /// Number of columns in the buffered record, not counting the empty column a
    /// trailing delimiter produces.
    fn effective_len(&self) -> usize {
        let len = self.record.len();
        if self.trailing_delimiter && self.record.get(len.wrapping_sub(1)) == Some("") {
            len - 1
        } else {
            len
        }
    }

    /// True once every record has been consumed.
    pub(crate) fn is_done(&self) -> bool {
        !self.loaded
    }

    /// True while the buffered record is the first one of the input, not counting
    /// records skipped as empty lines.
    pub(crate) fn is_first_record(&self) -> bool {
        self.loaded && self.first
    }

    /// True when no column is left in the buffered record (or there is no record).
    pub(crate) fn is_end_of_record(&self) -> bool {
        !self.loaded || self.column >= self.effective_len()
    }

    /// Columns not yet handed out in the buffered record.
    pub(crate) fn remaining(&self) -> usize {
        if self.loaded {
            self.effective_len().saturating_sub(self.column)
        } else {
            0
        }
    }

    pub(crate) fn mark(&mut self) {
        self.marks.push(self.column);
    }

    /// Rewind to the most recent mark and drop it.
    pub(crate) fn reset(&mut self) {
        if let Some(column) = self.marks.pop() {
            self.column = column;
        }
    }

    /// Drop the most recent mark, keeping everything read since.
    pub(crate) fn unmark(&mut self) {
        self.marks.pop();
    }

    /// Consume the next column of the buffered record.
    pub(crate) fn read_column(&mut self) -> Result<&str, Error> {
        if self.is_end_of_record() {
            return Err(Error::unexpected_end().with_location(self.location()));
        }
        let column = self.column;
        self.column += 1;
        Ok(self.record.get(column).unwrap_or_default())
    }

    /// Peek: does the next column hold exactly `null`? False at end of record.
    pub(crate) fn is_null_token(&self, null: &str) -> bool {
        self.is_null_run(null, 1)
    }

    /// Peek: do the next `count` columns all hold exactly `null`?
    pub(crate) fn is_null_run(&self, null: &str, count: usize) -> bool {
        count > 0
            && self.remaining() >= count
            && (self.column..self.column + count).all(|i| self.record.get(i) == Some(null))
    }

    /// Skip empty lines: records holding at most one column, and that one empty.
    /// Only valid between records.
    pub(crate) fn read_empty_lines(&mut self) -> Result<(), Error> {
        while self.loaded && self.column == 0 && self.is_blank_record() {
            self.load_next()?;
        }
        Ok(())
    }

    fn is_blank_record(&self) -> bool {
        match self.effective_len() {
            0 => true,
            1 => self.record.get(0) == Some(""),
            _ => false,
        }
    }

    /// Finish the buffered record and buffer the next one.
    ///
    /// Fails with `TrailingColumns` if columns of the record were never consumed.
    pub(crate) fn read_end_of_record(&mut self) -> Result<(), Error> {
        let leftover = self.remaining();
        if leftover > 0 {
            return Err(Error::TrailingColumns {
                count: leftover,
                location: self.location(),
            });
        }
        self.first = false;
        self.load_next()
    }

    /// Location of the next column: the line its record starts on, 1-based column.
    pub(crate) fn location(&self) -> Location {
        if self.loaded {
            Location::new(self.line, self.column as u64 + 1)
        } else {
            Location::UNKNOWN
        }
    }
}
