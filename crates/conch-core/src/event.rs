#![forbid(unsafe_code)]

//! Key events produced by the escape-sequence decoder.
//!
//! The decoder turns a raw byte stream into a sequence of [`KeyEvent`]s. Most
//! bytes pass through as [`KeyEvent::Byte`]; recognized VT100 escape
//! sequences are collapsed into the dedicated variants.

/// Direction of a parameterized cursor-movement sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `CSI <n> A`
    Up,
    /// `CSI <n> B`
    Down,
    /// `CSI <n> C`
    Forward,
    /// `CSI <n> D`
    Back,
}

/// A single decoded key event.
///
/// Plain bytes (including control bytes that are not part of an escape
/// sequence) decode to [`KeyEvent::Byte`]. A recognized escape sequence
/// decodes to exactly one of the other variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEvent {
    /// A literal byte that was not consumed by an escape sequence.
    Byte(u8),

    /// Cursor up (`ESC [ A` with no parameters).
    CursorUp,

    /// Cursor down (`ESC [ B` with no parameters).
    CursorDown,

    /// Cursor forward (`ESC [ C` with no parameters).
    CursorForward,

    /// Cursor back (`ESC [ D` with no parameters).
    CursorBack,

    /// Home key (`ESC [ H` with no parameters).
    Home,

    /// End key (`ESC [ F` with no parameters).
    End,

    /// Shift-Tab (`ESC [ Z`).
    BackTab,

    /// Insert key (`ESC [ 2 ~`).
    Insert,

    /// Delete key (`ESC [ 3 ~`).
    Delete,

    /// Page up (`ESC [ 5 ~`).
    PageUp,

    /// Page down (`ESC [ 6 ~`).
    PageDown,

    /// Terminal reset request (`ESC c`).
    Reset,

    /// A cursor-movement sequence that carried an explicit count, such as
    /// `ESC [ 4 D`. Reported for observability; the line editor moves one
    /// cell per key press and does not act on these.
    CursorMove {
        /// Which way the sequence asked to move.
        direction: Direction,
        /// The count parsed from the parameter bytes (0 if unparsable).
        count: u16,
    },

    /// A sequence that terminated but matched no recognized shape, or that
    /// grew past the decoder's parameter buffer.
    Invalid,
}

impl KeyEvent {
    /// Returns true for a printable ASCII byte event (0x20..=0x7E).
    #[must_use]
    pub fn is_printable(&self) -> bool {
        matches!(self, KeyEvent::Byte(b) if (0x20..=0x7E).contains(b))
    }
}
