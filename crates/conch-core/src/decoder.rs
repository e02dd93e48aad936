#![forbid(unsafe_code)]

//! VT100 input decoder.
//!
//! This decoder is a deterministic state machine that converts a raw keyboard
//! byte stream into a sequence of [`KeyEvent`]s for the line editor. It
//! covers:
//!
//! - plain bytes (printable and control) -> [`KeyEvent::Byte`]
//! - `ESC c` -> [`KeyEvent::Reset`]
//! - bare CSI cursor/navigation sequences -> dedicated events
//! - `CSI <digit> ~` keypad sequences (Insert/Delete/PageUp/PageDown)
//! - parameterized cursor moves -> [`KeyEvent::CursorMove`]
//! - everything else degrades to literal bytes or [`KeyEvent::Invalid`]
//!
//! The decoder never blocks and never buffers ordinary bytes; only bytes
//! inside an escape sequence are withheld until the sequence resolves.

use crate::event::{Direction, KeyEvent};

/// Longest run of CSI parameter bytes accepted before the sequence is
/// abandoned as [`KeyEvent::Invalid`].
pub const MAX_CSI_PARAMS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Ordinary bytes pass straight through.
    Ground,
    /// A lone `0x1B` was seen.
    Esc,
    /// Inside `ESC [`, collecting parameter bytes.
    Csi,
}

/// Keyboard escape-sequence decoder state.
#[derive(Debug, Clone)]
pub struct KeyDecoder {
    state: State,
    /// Parameter bytes of the CSI sequence in flight (the `[` introducer is
    /// not stored).
    params: Vec<u8>,
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDecoder {
    /// Create a new decoder in ground state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            params: Vec::new(),
        }
    }

    /// Feed a chunk of bytes and return the decoded events.
    #[must_use]
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<KeyEvent> {
        let mut out = Vec::new();
        for &b in bytes {
            self.advance(b, &mut out);
        }
        out
    }

    /// Advance the decoder by one byte, pushing any completed events.
    ///
    /// A single byte can resolve to zero, one, or two events (an abandoned
    /// escape degrades to two literal bytes).
    pub fn advance(&mut self, b: u8, out: &mut Vec<KeyEvent>) {
        match self.state {
            State::Ground => self.advance_ground(b, out),
            State::Esc => self.advance_esc(b, out),
            State::Csi => self.advance_csi(b, out),
        }
    }

    fn advance_ground(&mut self, b: u8, out: &mut Vec<KeyEvent>) {
        if b == 0x1B {
            self.state = State::Esc;
        } else {
            out.push(KeyEvent::Byte(b));
        }
    }

    fn advance_esc(&mut self, b: u8, out: &mut Vec<KeyEvent>) {
        match b {
            b'[' => {
                self.state = State::Csi;
                self.params.clear();
            }
            b'c' => {
                self.state = State::Ground;
                out.push(KeyEvent::Reset);
            }
            // A second ESC restarts the sequence.
            0x1B => {}
            // Unrecognized escape: both bytes fall through as literals. The
            // ESC byte is emitted directly rather than re-fed, so it cannot
            // re-arm the state machine.
            _ => {
                self.state = State::Ground;
                out.push(KeyEvent::Byte(0x1B));
                out.push(KeyEvent::Byte(b));
            }
        }
    }

    fn advance_csi(&mut self, b: u8, out: &mut Vec<KeyEvent>) {
        if b.is_ascii_alphabetic() || b == b'~' {
            let event = self.interpret(b);
            self.state = State::Ground;
            self.params.clear();
            if let Some(event) = event {
                out.push(event);
            }
            return;
        }
        if self.params.len() >= MAX_CSI_PARAMS {
            crate::debug!(byte = b, "escape sequence too long, abandoning");
            self.state = State::Ground;
            self.params.clear();
            out.push(KeyEvent::Invalid);
            return;
        }
        self.params.push(b);
    }

    /// Interpret a terminated CSI sequence.
    ///
    /// Sequences that terminate cleanly but match nothing we act on (status
    /// queries, parameterized Home/End) produce no event.
    fn interpret(&self, terminator: u8) -> Option<KeyEvent> {
        let bare = self.params.is_empty();
        match terminator {
            b'A' => self.cursor_event(bare, Direction::Up, KeyEvent::CursorUp),
            b'B' => self.cursor_event(bare, Direction::Down, KeyEvent::CursorDown),
            b'C' => self.cursor_event(bare, Direction::Forward, KeyEvent::CursorForward),
            b'D' => self.cursor_event(bare, Direction::Back, KeyEvent::CursorBack),
            b'H' if bare => Some(KeyEvent::Home),
            b'F' if bare => Some(KeyEvent::End),
            b'Z' => Some(KeyEvent::BackTab),
            b'~' => Some(match self.params.first() {
                Some(b'2') => KeyEvent::Insert,
                Some(b'3') => KeyEvent::Delete,
                Some(b'5') => KeyEvent::PageUp,
                Some(b'6') => KeyEvent::PageDown,
                _ => KeyEvent::Invalid,
            }),
            _ => {
                crate::trace!(
                    terminator,
                    params = ?self.params,
                    "ignoring unsupported escape sequence"
                );
                None
            }
        }
    }

    fn cursor_event(&self, bare: bool, direction: Direction, simple: KeyEvent) -> Option<KeyEvent> {
        if bare {
            Some(simple)
        } else {
            Some(KeyEvent::CursorMove {
                direction,
                count: leading_count(&self.params),
            })
        }
    }
}

/// Parse the leading decimal digits of the parameter bytes, saturating at
/// `u16::MAX`. Returns 0 when the parameters do not start with a digit.
fn leading_count(params: &[u8]) -> u16 {
    let mut count: u16 = 0;
    for &b in params {
        if !b.is_ascii_digit() {
            break;
        }
        count = count
            .saturating_mul(10)
            .saturating_add(u16::from(b - b'0'));
    }
    count
}
