use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an ISBN was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IsbnError {
    /// Neither a 10-character nor a 13-digit ISBN after stripping separators.
    #[error("Invalid ISBN format. Use ISBN-10 or ISBN-13.")]
    Malformed,
    /// ISBN-10 weighted sum is not divisible by 11.
    #[error("Invalid ISBN-10 checksum.")]
    InvalidIsbn10Checksum,
    /// ISBN-13 check digit does not match.
    #[error("Invalid ISBN-13 checksum.")]
    InvalidIsbn13Checksum,
}

/// A checksum-valid ISBN-10 or ISBN-13.
///
/// Stored without hyphens or spaces, so `0-306-40615-2` and `0306406152`
/// are the same catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isbn(String);

impl Isbn {
    pub fn parse(raw: &str) -> Result<Self, IsbnError> {
        let isbn: String = raw.chars().filter(|c| *c != '-' && *c != ' ').collect();
        let bytes = isbn.as_bytes();

        match bytes.len() {
            10 if is_isbn10_shape(bytes) => {
                if isbn10_checksum(bytes) % 11 != 0 {
                    return Err(IsbnError::InvalidIsbn10Checksum);
                }
            }
            13 if bytes.iter().all(u8::is_ascii_digit) => {
                if !isbn13_check_digit_matches(bytes) {
                    return Err(IsbnError::InvalidIsbn13Checksum);
                }
            }
            _ => return Err(IsbnError::Malformed),
        }

        Ok(Self(isbn))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Nine digits followed by a digit or an uppercase `X`.
fn is_isbn10_shape(bytes: &[u8]) -> bool {
    match bytes.split_last() {
        Some((last, head)) => {
            head.iter().all(u8::is_ascii_digit) && (last.is_ascii_digit() || *last == b'X')
        }
        None => false,
    }
}

fn isbn10_checksum(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let digit = if *b == b'X' { 10 } else { u32::from(b - b'0') };
            (i as u32 + 1) * digit
        })
        .sum()
}

fn isbn13_check_digit_matches(bytes: &[u8]) -> bool {
    let total: u32 = bytes[..12]
        .iter()
        .enumerate()
        .map(|(i, b)| u32::from(b - b'0') * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    let check_digit = (10 - total % 10) % 10;
    check_digit == u32::from(bytes[12] - b'0')
}

impl TryFrom<String> for Isbn {
    type Error = IsbnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Isbn> for String {
    fn from(isbn: Isbn) -> Self {
        isbn.0
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
