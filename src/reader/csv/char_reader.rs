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

//! Incremental UTF-8 decoding of an async byte stream.

use std::collections::VecDeque;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Pulls characters out of a buffered byte stream one at a time.
///
/// Holds at most one buffer's worth of decoded characters plus an
/// incomplete multi-byte sequence carried over to the next read. Invalid
/// sequences decode to U+FFFD.
#[derive(Debug)]
pub struct CharReader<R> {
    inner: R,
    decoded: VecDeque<char>,
    // Tail of the last read that does not yet form a complete character.
    carry: Vec<u8>,
    eof: bool,
}

impl<R: AsyncBufRead + Unpin> CharReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            decoded: VecDeque::new(),
            carry: Vec::new(),
            eof: false,
        }
    }

    /// Next character, or `None` at end of stream.
    pub async fn next_char(&mut self) -> std::io::Result<Option<char>> {
        loop {
            if let Some(c) = self.decoded.pop_front() {
                return Ok(Some(c));
            }
            if self.eof {
                return Ok(None);
            }
            self.fill().await?;
        }
    }

    async fn fill(&mut self) -> std::io::Result<()> {
        let buf = self.inner.fill_buf().await?;
        if buf.is_empty() {
            self.eof = true;
            if !self.carry.is_empty() {
                self.carry.clear();
                self.decoded.push_back(char::REPLACEMENT_CHARACTER);
            }
            return Ok(());
        }

        self.carry.extend_from_slice(buf);
        let read = buf.len();
        self.inner.consume(read);
        self.decode_carry();
        Ok(())
    }

    fn decode_carry(&mut self) {
        let mut start = 0;
        while start < self.carry.len() {
            match std::str::from_utf8(&self.carry[start..]) {
                Ok(text) => {
                    self.decoded.extend(text.chars());
                    start = self.carry.len();
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&self.carry[start..valid_end]) {
                        self.decoded.extend(text.chars());
                    }
                    match e.error_len() {
                        Some(len) => {
                            self.decoded.push_back(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        // Incomplete sequence at the end; wait for more bytes.
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.carry.drain(..start);
    }
}
