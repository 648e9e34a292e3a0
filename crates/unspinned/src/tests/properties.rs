use std::{collections::BTreeMap, io::Read};

use quickcheck::{QuickCheck, TestResult};
use quickcheck_macros::quickcheck;

use crate::{
    AltAz, Degrees, Error, State, read_response, read_response_buffered,
    readers::{Concat, Lookahead},
};

fn test_count() -> u64 {
    #[cfg(not(miri))]
    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    #[cfg(miri)]
    let tests = 10;
    tests
}

/// Property: peeking never changes what later reads return, whatever the
/// order and depth of the peeks.
#[test]
fn peeks_agree_with_reads() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(input: String, depths: Vec<usize>) -> bool {
        let chars: Vec<char> = input.chars().collect();
        let mut la = Lookahead::new(input.as_bytes());

        let mut seen = BTreeMap::new();
        for d in depths {
            let d = d % (chars.len() + 2);
            let peeked = la.peek(d).unwrap();
            if peeked != chars.get(d).copied() {
                return false;
            }
            if let Some(ch) = peeked {
                seen.insert(d, ch);
            }
        }

        let read: Vec<char> = std::iter::from_fn(|| la.read_char().unwrap()).collect();
        read == chars && seen.iter().all(|(d, ch)| read[*d] == *ch)
    }

    QuickCheck::new()
        .tests(test_count())
        .quickcheck(prop as fn(String, Vec<usize>) -> bool);
}

/// Property: a single deep peek grows the ring as needed and lands on the
/// right character.
#[quickcheck]
fn deep_peek_grows_transparently(input: String, depth: usize) -> bool {
    let chars: Vec<char> = input.chars().collect();
    let depth = depth % (chars.len() + 1);
    let mut la = Lookahead::new(input.as_bytes());
    let peeked = la.peek(depth).unwrap();
    peeked == chars.get(depth).copied() && la.capacity() >= la.len()
}

/// Property: interleaving reads and peeks, then snapshotting what is left,
/// reproduces the original input exactly.
#[quickcheck]
fn buffered_plus_source_is_lossless(input: String, ops: Vec<(bool, u8)>) -> bool {
    let mut la = Lookahead::new(input.as_bytes());
    let mut consumed = String::new();
    for (is_read, n) in ops {
        if is_read {
            if let Some(ch) = la.read_char().unwrap() {
                consumed.push(ch);
            }
        } else {
            la.peek(usize::from(n % 16)).unwrap();
        }
    }

    let (buffered, source) = la.into_parts();
    let mut rest = String::new();
    buffered.then(source).read_to_string(&mut rest).unwrap();
    consumed + &rest == input
}

/// Property: a concatenation reads as the plain concatenation of its parts,
/// however the parts are nested and however the reads are sized.
#[quickcheck]
fn concat_is_byte_concatenation(parts: Vec<Vec<u8>>, nest_at: usize, read_size: u8) -> bool {
    let expected: Vec<u8> = parts.concat();
    let split = if parts.is_empty() {
        0
    } else {
        nest_at % parts.len()
    };

    let inner = parts[split..]
        .iter()
        .fold(Concat::new(), |c, p| c.then(p.as_slice()));
    let mut concat = parts[..split]
        .iter()
        .fold(Concat::new(), |c, p| c.then(p.as_slice()))
        .then_concat(inner);

    let mut buf = vec![0u8; usize::from(read_size).max(1)];
    let mut got = Vec::new();
    loop {
        let n = concat.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        got.extend_from_slice(&buf[..n]);
    }
    got == expected && concat.is_empty()
}

/// Property: `<text> Error = <N>.<anything>|` always decodes to `(text, N)`
/// and leaves the stream after the terminator.
#[quickcheck]
fn error_bodies_decode(text: String, code: u32, trailing: String) -> TestResult {
    if text.starts_with('{') || text.contains(" Error = ") || trailing.contains('|') {
        return TestResult::discard();
    }

    let wire = format!("{text} Error = {code}.{trailing}|next");
    let mut rest = wire.as_bytes();
    match read_response::<State, _>(&mut rest) {
        Err(Error::Protocol(e)) => TestResult::from_bool(
            e.message == text && e.error_number == Some(i64::from(code)) && rest == b"next",
        ),
        _ => TestResult::failed(),
    }
}

/// Property: JSON followed by any terminator-free gap decodes exactly, with
/// or without a wide read-ahead.
#[quickcheck]
fn json_bodies_decode(angles: (i16, i16, i16, i16, i16), gap: String) -> TestResult {
    if gap.contains('|') {
        return TestResult::discard();
    }

    let deg = |x: i16| Degrees(f64::from(x) / 8.0);
    let state = State {
        longitude: deg(angles.0),
        latitude: deg(angles.1),
        rotator_angle: deg(angles.2),
        pointing_at: AltAz {
            alt: deg(angles.3),
            az: deg(angles.4),
        },
    };
    let wire = format!("{}{gap}|next", serde_json::to_string(&state).unwrap());

    let mut rest = wire.as_bytes();
    let exact: State = match read_response(&mut rest) {
        Ok(s) => s,
        Err(_) => return TestResult::failed(),
    };
    let buffered: State = match read_response_buffered(wire.as_bytes(), 32) {
        Ok(s) => s,
        Err(_) => return TestResult::failed(),
    };

    TestResult::from_bool(exact == state && buffered == state && rest == b"next")
}
