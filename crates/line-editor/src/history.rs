//! Bounded history ring with a browse cursor (§4.4.2).

/// Line history for the single/multi-line edit loops.
#[derive(Debug)]
pub struct History {
    entries: Vec<String>,
    /// -1 means "not currently browsing".
    index: i64,
    max_size: usize,
    /// The input the user had typed before they started browsing, saved
    /// so `next()` can restore it once browsing runs past the last entry.
    current: Option<String>,
}

impl History {
    /// `max_size` is clamped to at least 1.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: -1,
            max_size: max_size.max(1),
            current: None,
        }
    }

    /// `max_size` from `EZ_HISTORY_MAX`, defaulting to 100 (SPEC_FULL
    /// ambient config section).
    pub fn from_env() -> Self {
        let max_size = std::env::var("EZ_HISTORY_MAX")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(100);
        Self::new(max_size)
    }

    /// Ignores empty strings and consecutive duplicates. Drops from the
    /// front when over `max_size`. Resets browse state.
    pub fn add(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        if entry.is_empty() {
            return;
        }
        if self.entries.last().is_some_and(|last| last == &entry) {
            return;
        }
        self.entries.push(entry);
        while self.entries.len() > self.max_size {
            self.entries.remove(0);
        }
        self.index = -1;
        self.current = None;
    }

    /// Step backward through history. On the first call, saves
    /// `current_input` and starts at the most recent entry; subsequent
    /// calls saturate at the first entry.
    pub fn previous(&mut self, current_input: &str) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        if self.index == -1 {
            self.current = Some(current_input.to_string());
            self.index = self.entries.len() as i64 - 1;
        } else if self.index > 0 {
            self.index -= 1;
        }
        self.entries.get(self.index as usize).cloned()
    }

    /// Step forward through history. Returns the saved input and clears
    /// browse state once stepping past the last entry; returns `None` on
    /// every call thereafter until `previous` is called again.
    pub fn next(&mut self) -> Option<String> {
        if self.index == -1 {
            return None;
        }
        if (self.index as usize) + 1 < self.entries.len() {
            self.index += 1;
            self.entries.get(self.index as usize).cloned()
        } else {
            self.index = -1;
            self.current.take()
        }
    }

    /// Defensive copy of the recorded entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_ignores_empty_strings() {
        let mut h = History::new(10);
        h.add("");
        assert_eq!(h.len(), 0);
    }

    #[test]
    fn add_ignores_consecutive_duplicates() {
        let mut h = History::new(10);
        h.add("a");
        h.add("a");
        assert_eq!(h.entries(), vec!["a".to_string()]);
    }

    #[test]
    fn add_allows_non_consecutive_duplicates() {
        let mut h = History::new(10);
        h.add("a");
        h.add("b");
        h.add("a");
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn add_drops_from_front_when_over_capacity() {
        let mut h = History::new(2);
        h.add("a");
        h.add("b");
        h.add("c");
        assert_eq!(h.entries(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn max_size_is_clamped_to_at_least_one() {
        let h = History::new(0);
        assert_eq!(h.max_size, 1);
    }

    #[test]
    fn previous_then_enough_next_calls_restores_original_input() {
        let mut h = History::new(10);
        h.add("first");
        h.add("second");

        assert_eq!(h.previous("typing..."), Some("second".to_string()));
        assert_eq!(h.previous("typing..."), Some("first".to_string()));
        // saturates at the first entry
        assert_eq!(h.previous("typing..."), Some("first".to_string()));

        assert_eq!(h.next(), Some("second".to_string()));
        assert_eq!(h.next(), Some("typing...".to_string()));
        assert_eq!(h.next(), None);
    }

    #[test]
    fn previous_on_empty_history_returns_none() {
        let mut h = History::new(10);
        assert_eq!(h.previous("x"), None);
    }

    #[test]
    fn next_without_previous_returns_none() {
        let mut h = History::new(10);
        h.add("a");
        assert_eq!(h.next(), None);
    }
}
