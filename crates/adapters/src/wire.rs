// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format for external adapter processes.
//!
//! Adapters speak a line-oriented protocol on stdout:
//! - `T<float>` sets the timestamp for the next datagram line
//! - `<prefix><hex-pairs>` is a datagram; `<prefix>` is one character from
//!   the configured prefix set, bytes follow as pairs of hex digits
//! - `+<seconds> [comment]` is a synthetic delay, honored in test mode only
//! - anything else is reported as an unknown-prefix line

use thiserror::Error;

/// Line prefix that carries a timestamp for the following datagram.
pub const TIMESTAMP_PREFIX: char = 'T';

/// One decoded adapter output line.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Blank line; ignored.
    Empty,
    /// Timestamp for the next datagram.
    Timestamp(f64),
    /// A datagram with its prefix character and decoded payload.
    Datagram { prefix: char, bytes: Vec<u8> },
    /// Synthetic test-mode delay, with an optional comment.
    TestDelay { seconds: f64, comment: String },
    /// Line with an unrecognized prefix character.
    Unknown { prefix: char, rest: String },
}

/// Decoding failures that become adapter error events.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("odd-length hex payload: {0}")]
    OddLength(String),
    #[error("bad number: {0}")]
    BadNumber(String),
}

/// Decode one stdout line. `prefixes` is the configured datagram prefix
/// set; `test_mode` enables `+<seconds>` delay lines.
pub fn decode_line(line: &str, prefixes: &str, test_mode: bool) -> Result<Decoded, WireError> {
    let mut chars = line.chars();
    let Some(first) = chars.next() else {
        return Ok(Decoded::Empty);
    };
    let rest = chars.as_str();

    if prefixes.contains(first) {
        return Ok(Decoded::Datagram {
            prefix: first,
            bytes: decode_hex(rest)?,
        });
    }
    if first == TIMESTAMP_PREFIX {
        let stamp: f64 = rest
            .trim()
            .parse()
            .map_err(|_| WireError::BadNumber(rest.to_string()))?;
        return Ok(Decoded::Timestamp(stamp));
    }
    if first == '+' && test_mode {
        let (num, comment) = match rest.split_once(' ') {
            Some((n, c)) => (n, c.to_string()),
            None => (rest, String::new()),
        };
        let seconds: f64 = num
            .trim()
            .parse()
            .map_err(|_| WireError::BadNumber(num.to_string()))?;
        return Ok(Decoded::TestDelay { seconds, comment });
    }
    Ok(Decoded::Unknown {
        prefix: first,
        rest: rest.to_string(),
    })
}

/// Decode pairs of hex digits. Odd input length is an error.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, WireError> {
    let digits: Vec<char> = s.trim().chars().collect();
    if digits.len() % 2 != 0 {
        return Err(WireError::OddLength(s.to_string()));
    }
    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for pair in digits.chunks(2) {
        let hi = pair[0]
            .to_digit(16)
            .ok_or_else(|| WireError::BadNumber(s.to_string()))?;
        let lo = pair[1]
            .to_digit(16)
            .ok_or_else(|| WireError::BadNumber(s.to_string()))?;
        bytes.push((hi * 16 + lo) as u8);
    }
    Ok(bytes)
}

/// Encode bytes as lowercase hex pairs.
pub fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
