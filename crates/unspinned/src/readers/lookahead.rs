//! Rune-level lookahead over a byte stream.
//!
//! Characters are decoded one source byte at a time and parked in a ring of
//! `char`s until they are consumed. The ring only grows as far as the deepest
//! peek, so nothing past that point is ever pulled from the source. This is
//! what lets a caller hand the rest of a socket to another decoder after
//! peeking at the first few characters.
//!
//! Invariants
//! - `length <= buf.len()`.
//! - Logical offset `i` lives at `buf[(start + i) % buf.len()]`.
//! - Growth doubles the ring and re-lays it out so that `start == 0`.

use std::io::{self, Cursor, Read};

use super::Concat;

/// A peekable character reader with unbounded lookahead.
#[derive(Debug)]
pub struct Lookahead<R> {
    source: R,
    buf: Vec<char>,
    start: usize,
    length: usize,
}

impl<R: Read> Lookahead<R> {
    /// Wraps `source` with an empty buffer. Nothing is read until a peek.
    pub fn new(source: R) -> Self {
        Self {
            source,
            buf: Vec::new(),
            start: 0,
            length: 0,
        }
    }

    /// Returns the character `depth` positions past the next unread one
    /// without consuming anything.
    ///
    /// `Ok(None)` means the source ended before that position.
    ///
    /// # Errors
    ///
    /// Propagates any non-interrupt error of the underlying source.
    pub fn peek(&mut self, depth: usize) -> io::Result<Option<char>> {
        while self.length <= depth {
            if !self.fill()? {
                return Ok(None);
            }
        }
        Ok(Some(self.buf[self.slot(depth)]))
    }

    /// Consumes and returns the next character.
    ///
    /// # Errors
    ///
    /// Propagates any non-interrupt error of the underlying source.
    pub fn read_char(&mut self) -> io::Result<Option<char>> {
        let ch = self.peek(0)?;
        if ch.is_some() {
            self.start = (self.start + 1) % self.buf.len();
            self.length -= 1;
        }
        Ok(ch)
    }

    /// Drops up to `count` characters that have already been peeked.
    ///
    /// Returns how many were dropped. Never touches the source.
    pub fn discard(&mut self, count: usize) -> usize {
        let count = count.min(self.length);
        if count > 0 {
            self.start = (self.start + count) % self.buf.len();
            self.length -= count;
        }
        count
    }

    /// Characters decoded but not yet consumed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether no decoded character is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Slots in the ring before it next doubles.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// The underlying source.
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// The unconsumed characters, UTF-8 encoded, as a fresh stream.
    ///
    /// A region that wraps the end of the ring comes back as two members of
    /// one [`Concat`], tail segment first.
    #[must_use]
    pub fn buffered<'b>(&self) -> Concat<'b> {
        let end = self.start + self.length;
        let capacity = self.buf.len();
        if end <= capacity {
            Concat::new().then(encode(&self.buf[self.start..end]))
        } else {
            Concat::new()
                .then(encode(&self.buf[self.start..]))
                .then(encode(&self.buf[..end - capacity]))
        }
    }

    /// Splits into the unconsumed characters and the untouched source.
    ///
    /// Reading the first half and then the second yields exactly the bytes
    /// this reader would have produced from here on.
    pub fn into_parts<'b>(self) -> (Concat<'b>, R) {
        (self.buffered(), self.source)
    }

    fn slot(&self, offset: usize) -> usize {
        (self.start + offset) % self.buf.len()
    }

    /// Decodes one more character onto the end of the ring.
    fn fill(&mut self) -> io::Result<bool> {
        let Some(ch) = self.decode_next()? else {
            return Ok(false);
        };
        if self.length == self.buf.len() {
            self.grow();
        }
        let slot = self.slot(self.length);
        self.buf[slot] = ch;
        self.length += 1;
        Ok(true)
    }

    fn grow(&mut self) {
        if self.buf.is_empty() {
            self.buf = vec!['\0'; 1];
            return;
        }

        // Only called when full, so every slot is live.
        let old = self.buf.len();
        let mut grown = vec!['\0'; old * 2];
        let tail = old - self.start;
        grown[..tail].copy_from_slice(&self.buf[self.start..]);
        grown[tail..old].copy_from_slice(&self.buf[..self.start]);
        self.buf = grown;
        self.start = 0;
    }

    /// Reads exactly one UTF-8 sequence from the source.
    ///
    /// The sequence width comes from the count of leading one bits in the
    /// first byte. A sequence cut short by end of input is dropped.
    fn decode_next(&mut self) -> io::Result<Option<char>> {
        let Some(lead) = self.read_byte()? else {
            return Ok(None);
        };

        let width = match lead.leading_ones() {
            n @ 2..=4 => n as usize,
            _ => 1,
        };

        let mut bytes = [lead, 0, 0, 0];
        for slot in &mut bytes[1..width] {
            match self.read_byte()? {
                Some(b) => *slot = b,
                None => return Ok(None),
            }
        }

        let (ch, _) = bstr::decode_utf8(&bytes[..width]);
        Ok(Some(ch.unwrap_or(char::REPLACEMENT_CHARACTER)))
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.source.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}

fn encode(chars: &[char]) -> Cursor<Vec<u8>> {
    Cursor::new(chars.iter().collect::<String>().into_bytes())
}
