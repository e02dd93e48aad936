#![forbid(unsafe_code)]

//! Command history.
//!
//! A fixed-size ring of owned lines. `write` always points at the slot the
//! next submission will land in, so the retrievable entries sit at depths
//! 1..=N behind it (newest first). Browsing tracks a read position separate
//! from the live edit buffer; `None` means the user is on the live line.

/// Fixed-capacity history ring.
#[derive(Debug)]
pub struct HistoryRing {
    slots: Vec<Option<String>>,
    write: usize,
    read: Option<usize>,
}

impl HistoryRing {
    /// Create a ring with `slots` entries (at least one).
    #[must_use]
    pub fn new(slots: usize) -> Self {
        Self {
            slots: vec![None; slots.max(1)],
            write: 0,
            read: None,
        }
    }

    /// Record a submitted line, replacing the oldest entry once the ring is
    /// full, and leave browsing mode.
    pub fn submit(&mut self, line: &str) {
        self.slots[self.write] = Some(line.to_owned());
        self.write = (self.write + 1) % self.slots.len();
        self.read = None;
    }

    /// Whether a history browse is in progress.
    #[must_use]
    pub fn browsing(&self) -> bool {
        self.read.is_some()
    }

    /// How many slots deep the read position currently is (0 = live line).
    fn depth(&self) -> usize {
        let n = self.slots.len();
        match self.read {
            None => 0,
            Some(r) => ((self.write + n - r - 1) % n) + 1,
        }
    }

    /// Step to the next older entry, skipping empty slots.
    ///
    /// Returns the entry to preview, or `None` when the oldest entry was
    /// already shown. The failed step wraps back to the live line, so no
    /// browse is left pending and there is nothing to commit.
    pub fn up(&mut self) -> Option<&str> {
        let n = self.slots.len();
        for depth in self.depth() + 1..=n {
            let idx = (self.write + n - depth) % n;
            if self.slots[idx].is_some() {
                self.read = Some(idx);
                return self.slots[idx].as_deref();
            }
        }
        self.read = None;
        None
    }

    /// Step to the next newer entry, skipping empty slots.
    ///
    /// Returns the entry to preview, or `None` when the walk reaches the
    /// live line again (browsing mode is then left).
    pub fn down(&mut self) -> Option<&str> {
        let n = self.slots.len();
        let mut depth = self.depth();
        while depth > 1 {
            depth -= 1;
            let idx = (self.write + n - depth) % n;
            if self.slots[idx].is_some() {
                self.read = Some(idx);
                return self.slots[idx].as_deref();
            }
        }
        self.read = None;
        None
    }

    /// Take the line currently browsed, resetting to the live line.
    ///
    /// Used by the commit-on-transition rule: the caller copies the result
    /// into the edit buffer.
    pub fn commit_browse(&mut self) -> Option<String> {
        let line = self
            .read
            .and_then(|idx| self.slots.get(idx).cloned().flatten());
        self.read = None;
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn up_walks_newest_first() {
        let mut ring = HistoryRing::new(4);
        ring.submit("one");
        ring.submit("two");
        ring.submit("three");
        assert_eq!(ring.up(), Some("three"));
        assert_eq!(ring.up(), Some("two"));
        assert_eq!(ring.up(), Some("one"));
        // The failed step falls back to the live line; nothing is left to
        // commit.
        assert_eq!(ring.up(), None);
        assert!(!ring.browsing());
        assert_eq!(ring.commit_browse(), None);
        // Browsing starts over from the newest entry.
        assert_eq!(ring.up(), Some("three"));
    }

    #[test]
    fn down_returns_to_live_line() {
        let mut ring = HistoryRing::new(4);
        ring.submit("one");
        ring.submit("two");
        ring.up();
        ring.up();
        assert_eq!(ring.down(), Some("two"));
        assert_eq!(ring.down(), None);
        assert!(!ring.browsing());
    }

    #[test]
    fn down_without_browse_is_a_bell() {
        let mut ring = HistoryRing::new(4);
        ring.submit("one");
        assert_eq!(ring.down(), None);
        assert!(!ring.browsing());
    }

    #[test]
    fn full_ring_keeps_last_n() {
        let mut ring = HistoryRing::new(3);
        for line in ["a", "b", "c", "d"] {
            ring.submit(line);
        }
        assert_eq!(ring.up(), Some("d"));
        assert_eq!(ring.up(), Some("c"));
        assert_eq!(ring.up(), Some("b"));
        assert_eq!(ring.up(), None);
    }

    #[test]
    fn empty_ring_has_nothing() {
        let mut ring = HistoryRing::new(4);
        assert_eq!(ring.up(), None);
        assert!(!ring.browsing());
    }

    #[test]
    fn submit_resets_browse() {
        let mut ring = HistoryRing::new(4);
        ring.submit("one");
        ring.up();
        ring.submit("two");
        assert!(!ring.browsing());
        assert_eq!(ring.up(), Some("two"));
    }

    #[test]
    fn commit_without_browse_is_none() {
        let mut ring = HistoryRing::new(4);
        ring.submit("one");
        assert_eq!(ring.commit_browse(), None);
    }
}
