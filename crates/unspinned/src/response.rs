//! Decoding of TheSkyX socket replies.
//!
//! A reply is one of two shapes:
//!
//! - a JSON object, or
//! - free text ending in ` Error = <N>.` and possibly a trailing sentence,
//!
//! and in both cases the packet ends with a `|` somewhere after the body. The
//! first character tells the shapes apart. Whatever follows the body, up to
//! and including the `|`, is drained so the next exchange starts clean.
//!
//! The JSON branch is the awkward one. `serde_json` reads through a
//! [`BufReader`], and the buffer may hold bytes past the closing brace. Those
//! bytes are put back in front of the rest of the stream with a [`Concat`]
//! before the drain. [`read_response`] keeps that buffer at one byte so the
//! stream is never read past the terminator; [`read_response_buffered`]
//! widens it.

use std::io::{BufReader, Cursor, Read};

use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use crate::{
    error::{Error, ProtocolError, Result},
    readers::{Concat, Lookahead},
};

/// Ends every reply packet.
pub const PACKET_TERMINATOR: char = '|';

/// Follows the space that precedes an error code.
const ERROR_LITERAL: &str = "Error = ";

/// Reads one complete reply from `source`.
///
/// On return the stream is positioned just past the packet terminator, or at
/// end of input if the terminator never came. Nothing past the terminator is
/// consumed, so several replies can be read back to back from one stream.
///
/// # Errors
///
/// - [`Error::Protocol`] when the remote reported an error.
/// - [`Error::Decode`] when a JSON body does not decode as `T`.
/// - [`Error::ConnectionClosed`] when the stream ends before the first byte.
/// - [`Error::Io`] on transport failure.
pub fn read_response<T, R>(source: R) -> Result<T>
where
    T: DeserializeOwned,
    R: Read,
{
    read_response_buffered(source, 1)
}

/// Like [`read_response`], but lets the JSON reader pull up to `read_ahead`
/// bytes from `source` per read.
///
/// Bytes it buffers past the end of the document are fed back into the tail
/// drain. Any that land past the packet terminator are dropped with the
/// buffer, so only use a wide read-ahead on a source that never holds more
/// than the current reply, such as a request/response socket.
///
/// # Errors
///
/// As for [`read_response`].
pub fn read_response_buffered<T, R>(source: R, read_ahead: usize) -> Result<T>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut input = Lookahead::new(source);

    match input.peek(0)? {
        None => Err(Error::ConnectionClosed),
        Some('{') => read_document(input, read_ahead.max(1)),
        Some(_) => {
            let err = read_protocol_error(&mut input)?;
            debug!(
                remote_message = %err.message,
                error_number = ?err.error_number,
                "remote reported an error"
            );
            drain_to_terminator(&mut input);
            Err(err.into())
        }
    }
}

fn read_document<T, R>(input: Lookahead<R>, read_ahead: usize) -> Result<T>
where
    T: DeserializeOwned,
    R: Read,
{
    let (peeked, source) = input.into_parts();
    let mut reader = BufReader::with_capacity(read_ahead, peeked.then(source));

    let decoded = {
        let mut de = serde_json::Deserializer::from_reader(&mut reader);
        T::deserialize(&mut de)
    };

    let residue = reader.buffer().to_vec();
    trace!(residue = residue.len(), "reattaching bytes buffered past the document");
    let rest = Concat::new()
        .then(Cursor::new(residue))
        .then_concat(reader.into_inner());

    drain_to_terminator(&mut Lookahead::new(rest));

    decoded.map_err(|e| {
        if e.is_io() {
            Error::Io(e.into())
        } else {
            Error::Decode(e)
        }
    })
}

/// Scans an error reply up to and including `Error = <N>.`.
///
/// Text is accumulated until a space that starts the error-code suffix. A
/// space that turns out not to start one is kept in the message and scanning
/// resumes right after it, so a false match loses nothing. End of input
/// yields the message collected so far with no code; once the whole
/// `Error = ` literal has been seen, that message stops before its space.
pub(crate) fn read_protocol_error<R: Read>(
    input: &mut Lookahead<R>,
) -> std::io::Result<ProtocolError> {
    let mut message = String::new();

    loop {
        let Some(ch) = input.read_char()? else {
            return Ok(ProtocolError::truncated(message));
        };

        if ch != ' ' {
            message.push(ch);
            continue;
        }

        match match_error_code(input)? {
            Suffix::Code { number, len } => {
                input.discard(len);
                return Ok(match number {
                    Some(n) => ProtocolError::new(message, n),
                    None => ProtocolError::truncated(message),
                });
            }
            Suffix::Mismatch => message.push(ch),
            Suffix::EndOfInput => return Ok(ProtocolError::truncated(message)),
        }
    }
}

/// Outcome of looking for `Error = <digits>.` right after a space.
#[derive(Debug, PartialEq, Eq)]
enum Suffix {
    /// Matched; `len` characters make up the suffix. `number` is `None` only
    /// when the digits overflow.
    Code { number: Option<i64>, len: usize },
    Mismatch,
    /// The literal matched but input ended before the `.`.
    EndOfInput,
}

/// Peeks for the error-code suffix without consuming anything.
fn match_error_code<R: Read>(input: &mut Lookahead<R>) -> std::io::Result<Suffix> {
    let mut depth = 0;

    // Input that stops short of the whole literal never matched it.
    for expected in ERROR_LITERAL.chars() {
        match input.peek(depth)? {
            Some(c) if c == expected => depth += 1,
            Some(_) | None => return Ok(Suffix::Mismatch),
        }
    }

    let mut digits = String::new();
    loop {
        match input.peek(depth)? {
            None => return Ok(Suffix::EndOfInput),
            Some(c) if c.is_ascii_digit() => {
                digits.push(c);
                depth += 1;
            }
            Some(_) => break,
        }
    }

    if digits.is_empty() {
        return Ok(Suffix::Mismatch);
    }

    match input.peek(depth)? {
        Some('.') => Ok(Suffix::Code {
            number: digits.parse().ok(),
            len: depth + 1,
        }),
        Some(_) => Ok(Suffix::Mismatch),
        None => Ok(Suffix::EndOfInput),
    }
}

/// Discards characters through the next packet terminator.
///
/// Running out of input first is fine. So is a transport error; it is logged
/// and left for the next exchange to trip over.
pub(crate) fn drain_to_terminator<R: Read>(input: &mut Lookahead<R>) {
    let mut skipped = 0usize;
    loop {
        match input.read_char() {
            Ok(Some(PACKET_TERMINATOR)) => {
                trace!(skipped, "reached packet terminator");
                return;
            }
            Ok(Some(_)) => skipped += 1,
            Ok(None) => {
                debug!(skipped, "stream ended before packet terminator");
                return;
            }
            Err(error) => {
                warn!(%error, skipped, "transport error while draining reply tail");
                return;
            }
        }
    }
}
