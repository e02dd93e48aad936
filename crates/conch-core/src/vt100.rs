#![forbid(unsafe_code)]

//! The VT100 output codes the renderer actually emits.
//!
//! Only the handful of sequences used by the line editor live here; this is
//! not a general escape-code table.

/// Erase the entire current line (`EL 2`).
pub const ERASE_LINE: &str = "\x1b[2K";

/// Erase from the cursor to the end of the line (`EL 0`).
pub const ERASE_LINE_END: &str = "\x1b[K";

/// Clear the screen and home the cursor.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[1;1H";

/// Full terminal reset (`RIS`).
pub const RESET: &str = "\x1bc";

/// Move the cursor to the top-left corner.
pub const CURSOR_HOME: &str = "\x1b[H";

/// Audible bell.
pub const BELL: &str = "\x07";

/// Move the cursor back by `n` columns (`CUB`).
#[must_use]
pub fn cursor_back_by(n: usize) -> String {
    format!("\x1b[{n}D")
}

/// Move the cursor forward by `n` columns (`CUF`).
#[must_use]
pub fn cursor_forward_by(n: usize) -> String {
    format!("\x1b[{n}C")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movers_format_count() {
        assert_eq!(cursor_back_by(1), "\x1b[1D");
        assert_eq!(cursor_back_by(12), "\x1b[12D");
        assert_eq!(cursor_forward_by(3), "\x1b[3C");
    }
}
