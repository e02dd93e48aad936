#![forbid(unsafe_code)]

//! The line-edit buffer.
//!
//! A capacity-bounded byte buffer with an explicit cursor. All mutation goes
//! through checked operations; writes past capacity are rejected with
//! [`EditError::BufferFull`] instead of growing the buffer.

use std::error::Error;
use std::fmt;

/// Errors from edit-buffer mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditError {
    /// The buffer is at capacity; the byte was not inserted.
    BufferFull,
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::BufferFull => write!(f, "input buffer is full"),
        }
    }
}

impl Error for EditError {}

/// Capacity-bounded edit buffer with a cursor.
///
/// Invariant: `cursor <= len() <= capacity`. Contents are the raw bytes the
/// user typed; the editor only ever inserts printable ASCII, so `as_str` is
/// total in practice.
#[derive(Debug, Clone)]
pub struct EditBuffer {
    bytes: Vec<u8>,
    cursor: usize,
    capacity: usize,
}

impl EditBuffer {
    /// Create an empty buffer that holds at most `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            cursor: 0,
            capacity,
        }
    }

    /// Shift the tail starting at `start` by `offset` positions.
    ///
    /// A positive offset opens a gap at `start` (gap contents unspecified,
    /// the caller overwrites them); a negative offset deletes the bytes just
    /// before `start`. Callers keep the result within `start..=capacity`.
    fn shift(&mut self, start: usize, offset: isize) {
        let len = self.bytes.len();
        if offset > 0 {
            let off = offset.unsigned_abs();
            self.bytes.resize(len + off, 0);
            self.bytes.copy_within(start..len, start + off);
        } else if offset < 0 {
            let off = offset.unsigned_abs();
            self.bytes.copy_within(start..len, start - off);
            self.bytes.truncate(len - off);
        }
    }

    /// Insert a byte at the cursor, advancing it.
    pub fn insert(&mut self, b: u8) -> Result<(), EditError> {
        if self.bytes.len() >= self.capacity {
            return Err(EditError::BufferFull);
        }
        if self.cursor == self.bytes.len() {
            self.bytes.push(b);
        } else {
            self.shift(self.cursor, 1);
            self.bytes[self.cursor] = b;
        }
        self.cursor += 1;
        Ok(())
    }

    /// Delete the byte before the cursor. Returns false (and does nothing) at
    /// the start of the buffer.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.shift(self.cursor, -1);
        self.cursor -= 1;
        true
    }

    /// Move the cursor one byte left. Returns whether it moved.
    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Move the cursor one byte right. Returns whether it moved.
    pub fn move_right(&mut self) -> bool {
        if self.cursor >= self.bytes.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Move the cursor to the start, returning how many positions it moved.
    pub fn home(&mut self) -> usize {
        let moved = self.cursor;
        self.cursor = 0;
        moved
    }

    /// Move the cursor to the end, returning how many positions it moved.
    pub fn end(&mut self) -> usize {
        let moved = self.bytes.len() - self.cursor;
        self.cursor = self.bytes.len();
        moved
    }

    /// Clear the buffer and reset the cursor.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.cursor = 0;
    }

    /// Replace the contents with `text` (truncated at capacity), cursor at
    /// the end.
    pub fn set_text(&mut self, text: &str) {
        self.bytes.clear();
        let take = fit_on_char_boundary(text, self.capacity);
        self.bytes.extend_from_slice(&text.as_bytes()[..take]);
        self.cursor = self.bytes.len();
    }

    /// Replace everything from `start` onward with `text` (truncated at
    /// capacity), cursor at the end.
    pub fn splice_at(&mut self, start: usize, text: &str) {
        self.bytes.truncate(start);
        let room = self.capacity - self.bytes.len();
        let take = fit_on_char_boundary(text, room);
        self.bytes.extend_from_slice(&text.as_bytes()[..take]);
        self.cursor = self.bytes.len();
    }

    /// The buffer contents as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // The editor inserts ASCII and text replacement keeps character
        // boundaries, so the empty fallback is unreachable from within.
        std::str::from_utf8(&self.bytes).unwrap_or("")
    }

    /// The raw buffer contents.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Current logical length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Current cursor position (0..=len).
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether the cursor sits at the end of the buffer.
    #[must_use]
    pub fn cursor_at_end(&self) -> bool {
        self.cursor == self.bytes.len()
    }
}

/// Largest prefix length of `text` that fits in `limit` bytes without
/// splitting a character.
fn fit_on_char_boundary(text: &str, limit: usize) -> usize {
    let mut take = text.len().min(limit);
    while !text.is_char_boundary(take) {
        take -= 1;
    }
    take
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(text: &str) -> EditBuffer {
        let mut buf = EditBuffer::new(128);
        buf.set_text(text);
        buf
    }

    #[test]
    fn append_at_end() {
        let mut buf = EditBuffer::new(8);
        buf.insert(b'h').unwrap();
        buf.insert(b'i').unwrap();
        assert_eq!(buf.as_str(), "hi");
        assert_eq!(buf.cursor(), 2);
    }

    #[test]
    fn insert_mid_buffer_shifts_tail() {
        let mut buf = filled("abcd");
        buf.move_left();
        buf.move_left();
        buf.insert(b'X').unwrap();
        assert_eq!(buf.as_str(), "abXcd");
        assert_eq!(buf.cursor(), 3);
    }

    #[test]
    fn insert_at_capacity_is_rejected() {
        let mut buf = EditBuffer::new(2);
        buf.insert(b'a').unwrap();
        buf.insert(b'b').unwrap();
        assert_eq!(buf.insert(b'c'), Err(EditError::BufferFull));
        assert_eq!(buf.as_str(), "ab");
        assert_eq!(buf.cursor(), 2);
    }

    #[test]
    fn backspace_at_end() {
        let mut buf = filled("abc");
        assert!(buf.backspace());
        assert_eq!(buf.as_str(), "ab");
        assert_eq!(buf.cursor(), 2);
    }

    #[test]
    fn backspace_mid_buffer() {
        let mut buf = filled("abcd");
        buf.move_left();
        buf.move_left();
        assert!(buf.backspace());
        assert_eq!(buf.as_str(), "acd");
        assert_eq!(buf.cursor(), 1);
    }

    #[test]
    fn backspace_at_start_is_noop() {
        let mut buf = filled("ab");
        buf.home();
        assert!(!buf.backspace());
        assert_eq!(buf.as_str(), "ab");
        assert_eq!(buf.cursor(), 0);
    }

    #[test]
    fn insert_then_backspace_restores() {
        let mut buf = filled("hello");
        buf.move_left();
        buf.move_left();
        buf.insert(b'Z').unwrap();
        buf.backspace();
        assert_eq!(buf.as_str(), "hello");
        assert_eq!(buf.cursor(), 3);
    }

    #[test]
    fn home_and_end_report_distance() {
        let mut buf = filled("abcd");
        assert_eq!(buf.home(), 4);
        assert_eq!(buf.cursor(), 0);
        assert_eq!(buf.end(), 4);
        assert_eq!(buf.cursor(), 4);
        assert_eq!(buf.end(), 0);
    }

    #[test]
    fn set_text_truncates_at_capacity() {
        let mut buf = EditBuffer::new(3);
        buf.set_text("abcdef");
        assert_eq!(buf.as_str(), "abc");
        assert_eq!(buf.cursor(), 3);
    }

    #[test]
    fn splice_replaces_tail() {
        let mut buf = filled("echo he");
        buf.splice_at(5, "hello world");
        assert_eq!(buf.as_str(), "echo hello world");
        assert!(buf.cursor_at_end());
    }

    #[test]
    fn splice_truncates_on_a_char_boundary() {
        let mut buf = EditBuffer::new(7);
        buf.set_text("abc");
        // Four bytes of room; taking all four would split the second 'ü'.
        buf.splice_at(3, "düüü");
        assert_eq!(buf.as_str(), "abcdü");
        assert!(buf.cursor_at_end());
    }

    #[test]
    fn set_text_truncates_on_a_char_boundary() {
        let mut buf = EditBuffer::new(4);
        buf.set_text("aüü");
        assert_eq!(buf.as_str(), "aü");
        assert_eq!(buf.cursor(), 3);
    }
}
