#![forbid(unsafe_code)]

//! Autocomplete.
//!
//! Candidate lists are built once per Tab press sequence and cycled through
//! until the user picks one (by typing on or submitting) or exhausts the
//! cycle. Commands may register their own [`CompletionProvider`]; without one
//! the session falls back to matching registered command names.

use std::borrow::Cow;

use crate::registry::CommandRegistry;
use crate::tokenizer::token_spans;

/// What a completion provider gets asked.
pub struct CompletionQuery<'a> {
    /// The line text up to the cursor.
    pub line: &'a str,
    /// The token under the cursor (may be empty).
    pub token: &'a str,
    /// Byte offset where that token starts; the chosen candidate replaces
    /// everything from here on.
    pub token_start: usize,
}

/// A provider's answer.
pub struct Completions {
    /// Candidate strings, in the order they should cycle.
    pub items: Vec<String>,
    /// Byte offset where candidates splice into the line.
    pub start: usize,
}

/// Completion hook a command can register.
///
/// Runs in the session context while the user presses Tab, so it must not
/// block.
pub trait CompletionProvider: Send + Sync {
    /// Produce candidates for the token in `query`.
    fn complete(&self, query: &CompletionQuery<'_>) -> Completions;
}

/// A provider that completes from a fixed word list (flags, subcommands).
pub struct WordListCompleter {
    words: Vec<String>,
}

impl WordListCompleter {
    /// Complete from `words`.
    #[must_use]
    pub fn new(words: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }
}

impl CompletionProvider for WordListCompleter {
    fn complete(&self, query: &CompletionQuery<'_>) -> Completions {
        Completions {
            items: self
                .words
                .iter()
                .filter(|word| word.starts_with(query.token))
                .cloned()
                .collect(),
            start: query.token_start,
        }
    }
}

/// Registered command names matching `prefix`, in registry order.
#[must_use]
pub fn command_name_matches(registry: &CommandRegistry, prefix: &str) -> Vec<String> {
    registry
        .iter()
        .filter(|cmd| cmd.name().starts_with(prefix))
        .map(|cmd| cmd.name().to_owned())
        .collect()
}

/// Wrap a candidate in quotes when splicing it bare would change its
/// tokenization.
#[must_use]
pub fn quoted(candidate: &str) -> Cow<'_, str> {
    if candidate.contains(' ') {
        Cow::Owned(format!("\"{candidate}\""))
    } else {
        Cow::Borrowed(candidate)
    }
}

/// Locate the token under the cursor in `prefix` (the line text up to the
/// cursor). Returns the token's start offset and content.
///
/// Inside an unterminated quote the open quote itself is the start, so a
/// spliced candidate replaces it and re-quotes as needed.
pub(crate) fn current_token(prefix: &str) -> (usize, &str) {
    match token_spans(prefix) {
        Ok(spans) => match spans.last() {
            Some(span) if span.end == prefix.len() => (span.start, &prefix[span.clone()]),
            _ => (prefix.len(), ""),
        },
        Err(_) => {
            let quote = prefix.rfind('"').unwrap_or(prefix.len());
            (quote, &prefix[(quote + 1).min(prefix.len())..])
        }
    }
}

/// One in-flight completion cycle.
///
/// `selected == 0` means no candidate is picked yet; Tab and Shift-Tab step
/// through 1..=len and report `None` when the cycle wraps back to "nothing
/// selected" (the caller restores the original line and drops the cycle).
#[derive(Debug)]
pub(crate) struct CandidateCycle {
    items: Vec<String>,
    start: usize,
    selected: usize,
}

impl CandidateCycle {
    pub(crate) fn new(completions: Completions) -> Self {
        Self {
            items: completions.items,
            start: completions.start,
            selected: 0,
        }
    }

    pub(crate) fn start(&self) -> usize {
        self.start
    }

    /// The candidate currently picked, if any.
    pub(crate) fn selected(&self) -> Option<&str> {
        if self.selected == 0 {
            None
        } else {
            self.items.get(self.selected - 1).map(String::as_str)
        }
    }

    /// Step forward. `None` means the cycle wrapped past the last candidate.
    pub(crate) fn cycle_forward(&mut self) -> Option<&str> {
        if self.selected >= self.items.len() {
            self.selected = 0;
            return None;
        }
        self.selected += 1;
        self.items.get(self.selected - 1).map(String::as_str)
    }

    /// Step backward. `None` means the cycle wrapped past the first
    /// candidate.
    pub(crate) fn cycle_back(&mut self) -> Option<&str> {
        if self.selected == 0 {
            self.selected = self.items.len();
        } else {
            self.selected -= 1;
        }
        if self.selected == 0 {
            return None;
        }
        self.items.get(self.selected - 1).map(String::as_str)
    }
}
