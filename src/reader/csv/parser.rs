// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Streaming parser for Athena's quoted CSV result format.
//!
//! Rows are separated by `\n` and fields by `,`. A field is either absent
//! (null) or a double-quoted string in which `""` stands for one literal
//! quote. Quoted fields may contain commas and newlines.
//!
//! Error offsets count characters (not bytes) from the start of the stream.
//! For an unexpected character the offset is that character's index; for an
//! unexpected end of stream it is the number of characters consumed.

use crate::error::{Error, ParseError, Result};
use crate::reader::csv::char_reader::CharReader;
use tokio::io::AsyncBufRead;

/// One parsed row. `None` is a null field, `Some("")` an empty string.
pub type Row = Vec<Option<String>>;

/// Whether fields must be quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteStyle {
    /// Every non-null field is quoted. This is what Athena writes.
    #[default]
    Required,
    /// Unquoted fields are read verbatim up to the next separator. An
    /// unquoted field cannot contain `,`, `\n` or `"`; a quote inside one is
    /// a parse error.
    Optional,
}

impl QuoteStyle {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "required" => Some(QuoteStyle::Required),
            "optional" => Some(QuoteStyle::Optional),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    RowStart,
    FieldStart,
    Unquoted,
    Quoted,
    // Just saw a quote inside a quoted field: either an escape or the end.
    QuoteInQuoted,
    RowEnd,
}

#[derive(Debug)]
enum Lookahead {
    Empty,
    Row(Row),
    End,
    Failed(Error),
}

/// Pull parser yielding rows with exactly `column_count` fields.
///
/// Memory is bounded by the largest row plus the reader's buffer. Once a
/// read fails, every later call fails with the same error.
pub struct DelimitedRowParser<R> {
    input: CharReader<R>,
    column_count: usize,
    quote_style: QuoteStyle,
    offset: u64,
    lookahead: Lookahead,
}

impl<R> std::fmt::Debug for DelimitedRowParser<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelimitedRowParser")
            .field("column_count", &self.column_count)
            .field("quote_style", &self.quote_style)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl<R: AsyncBufRead + Unpin> DelimitedRowParser<R> {
    /// `column_count` must be at least one.
    pub fn new(input: R, column_count: usize) -> Self {
        Self::with_quote_style(input, column_count, QuoteStyle::default())
    }

    pub fn with_quote_style(input: R, column_count: usize, quote_style: QuoteStyle) -> Self {
        debug_assert!(column_count > 0, "a row has at least one column");
        Self {
            input: CharReader::new(input),
            column_count,
            quote_style,
            offset: 0,
            lookahead: Lookahead::Empty,
        }
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Characters consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether another row is available. Parses ahead by one row, so
    /// repeated calls without [`next_row`](Self::next_row) are idempotent.
    pub async fn has_next(&mut self) -> Result<bool> {
        self.fill_lookahead().await?;
        Ok(matches!(self.lookahead, Lookahead::Row(_)))
    }

    /// The next row, or `None` once the stream is exhausted.
    pub async fn next_row(&mut self) -> Result<Option<Row>> {
        self.fill_lookahead().await?;
        match std::mem::replace(&mut self.lookahead, Lookahead::End) {
            Lookahead::Row(row) => {
                self.lookahead = Lookahead::Empty;
                Ok(Some(row))
            }
            Lookahead::Failed(e) => {
                self.lookahead = Lookahead::Failed(e.clone());
                Err(e)
            }
            Lookahead::End | Lookahead::Empty => Ok(None),
        }
    }

    async fn fill_lookahead(&mut self) -> Result<()> {
        match &self.lookahead {
            Lookahead::Empty => {}
            Lookahead::Failed(e) => return Err(e.clone()),
            Lookahead::Row(_) | Lookahead::End => return Ok(()),
        }
        match self.read_row().await {
            Ok(Some(row)) => self.lookahead = Lookahead::Row(row),
            Ok(None) => self.lookahead = Lookahead::End,
            Err(e) => {
                self.lookahead = Lookahead::Failed(e.clone());
                return Err(e);
            }
        }
        Ok(())
    }

    async fn next_char(&mut self) -> Result<Option<char>> {
        let c = self.input.next_char().await?;
        if c.is_some() {
            self.offset += 1;
        }
        Ok(c)
    }

    async fn read_row(&mut self) -> Result<Option<Row>> {
        let mut row: Row = Vec::with_capacity(self.column_count);
        let mut field = String::new();
        let mut mode = Mode::RowStart;

        loop {
            let position = self.offset;
            let c = self.next_char().await?;

            mode = match (mode, c) {
                (Mode::RowStart, None) => return Ok(None),
                (Mode::RowStart | Mode::FieldStart, Some('"')) => Mode::Quoted,
                (Mode::RowStart | Mode::FieldStart, Some(',' | '\n'))
                | (Mode::FieldStart, None) => {
                    row.push(None);
                    self.field_end(c, position, row.len())?
                }
                (Mode::RowStart | Mode::FieldStart, Some(other)) => match self.quote_style {
                    QuoteStyle::Required => {
                        return Err(unexpected("quote", other, position).into());
                    }
                    QuoteStyle::Optional => {
                        field.push(other);
                        Mode::Unquoted
                    }
                },
                (Mode::Unquoted, Some(',' | '\n') | None) => {
                    row.push(Some(std::mem::take(&mut field)));
                    self.field_end(c, position, row.len())?
                }
                (Mode::Unquoted, Some('"')) => {
                    let expected = if row.len() + 1 >= self.column_count {
                        "newline"
                    } else {
                        "comma"
                    };
                    return Err(unexpected(expected, '"', position).into());
                }
                (Mode::Unquoted, Some(other)) => {
                    field.push(other);
                    Mode::Unquoted
                }
                (Mode::Quoted, Some('"')) => Mode::QuoteInQuoted,
                (Mode::Quoted, Some(other)) => {
                    field.push(other);
                    Mode::Quoted
                }
                (Mode::Quoted, None) => {
                    return Err(ParseError::new("Unexpected end of stream", position).into());
                }
                (Mode::QuoteInQuoted, Some('"')) => {
                    field.push('"');
                    Mode::Quoted
                }
                (Mode::QuoteInQuoted, _) => {
                    row.push(Some(std::mem::take(&mut field)));
                    self.field_end(c, position, row.len())?
                }
                (Mode::RowEnd, _) => Mode::RowEnd,
            };

            if mode == Mode::RowEnd {
                return Ok(Some(row));
            }
        }
    }

    /// Decide what follows a completed field. `completed` counts the fields
    /// of the current row including the one just finished.
    fn field_end(&self, c: Option<char>, position: u64, completed: usize) -> Result<Mode> {
        let expect_newline = completed >= self.column_count;
        match c {
            Some(',') if !expect_newline => Ok(Mode::FieldStart),
            Some('\n') if expect_newline => Ok(Mode::RowEnd),
            // A missing final newline still ends the row.
            None if expect_newline => Ok(Mode::RowEnd),
            None => Err(ParseError::new("Unexpected end of stream", position).into()),
            Some(other) if expect_newline => Err(unexpected("newline", other, position).into()),
            Some(other) => Err(unexpected("comma", other, position).into()),
        }
    }
}

fn unexpected(expected: &str, found: char, offset: u64) -> ParseError {
    ParseError::new(
        format!("Expected {} but found \"{}\"", expected, escape_char(found)),
        offset,
    )
}

fn escape_char(c: char) -> String {
    match c {
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        other => other.to_string(),
    }
}
