#![forbid(unsafe_code)]

//! Argument tokenizer.
//!
//! Splits one command line into argv-style tokens. A token is either a run of
//! non-space bytes or a double-quoted substring (quotes excluded, spaces
//! inside are literal). The command word itself is token 0.
//!
//! Counting and splitting share one span scanner, so they agree on token
//! boundaries by construction.

use std::error::Error;
use std::fmt;
use std::ops::Range;

/// Errors from tokenizing a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizeError {
    /// A `"` was opened but never closed before end of line.
    UnclosedLiteral,
}

impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizeError::UnclosedLiteral => {
                write!(f, "unclosed string literal in command")
            }
        }
    }
}

impl Error for TokenizeError {}

/// Scan `line` into token byte ranges.
///
/// An unterminated quote fails the whole line; no partial token list is
/// produced. A closing quote always emits its span, even an empty one.
pub fn token_spans(line: &str) -> Result<Vec<Range<usize>>, TokenizeError> {
    let bytes = line.as_bytes();
    let mut spans = Vec::new();
    let mut word_start: Option<usize> = None;
    let mut quote_start: Option<usize> = None;

    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'"' => {
                if let Some(start) = quote_start.take() {
                    spans.push(start + 1..i);
                } else {
                    // An opening quote terminates any word in progress.
                    if let Some(start) = word_start.take() {
                        spans.push(start..i);
                    }
                    quote_start = Some(i);
                }
            }
            b' ' if quote_start.is_none() => {
                if let Some(start) = word_start.take() {
                    spans.push(start..i);
                }
            }
            _ => {
                if quote_start.is_none() && word_start.is_none() {
                    word_start = Some(i);
                }
            }
        }
    }

    if quote_start.is_some() {
        return Err(TokenizeError::UnclosedLiteral);
    }
    if let Some(start) = word_start {
        spans.push(start..bytes.len());
    }
    Ok(spans)
}

/// Count the tokens `split_tokens` would produce.
pub fn count_tokens(line: &str) -> Result<usize, TokenizeError> {
    token_spans(line).map(|spans| spans.len())
}

/// Split `line` into its tokens.
pub fn split_tokens(line: &str) -> Result<Vec<&str>, TokenizeError> {
    token_spans(line).map(|spans| spans.into_iter().map(|span| &line[span]).collect())
}
