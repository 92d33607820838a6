// src/history.rs
use serde::Serialize;

/// The parts of the address bar the router reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub pathname: String,
    /// Query string including its leading `?`, or empty.
    pub search: String,
}

impl Location {
    #[must_use]
    pub fn from_href(href: &str) -> Self {
        // Fragments never reach the router
        let href = href.split('#').next().unwrap_or(href);
        let (pathname, query) = match href.split_once('?') {
            Some((path, query)) => (path, query),
            None => (href, ""),
        };
        let pathname = if pathname.is_empty() { "/" } else { pathname };
        Self {
            pathname: pathname.to_string(),
            search: if query.is_empty() { String::new() } else { format!("?{query}") },
        }
    }

    #[must_use]
    pub fn href(&self) -> String {
        format!("{}{}", self.pathname, self.search)
    }
}

pub trait LocationSource {
    fn location(&self) -> Location;
}

/// Writes browser history entries. Only the navigation controller holds a
/// mutable handle; back/forward handling works through [`LocationSource`].
pub trait HistoryWriter: LocationSource {
    fn push(&mut self, url: &str);
    fn replace(&mut self, url: &str);
}

/// Browser-like session history kept in memory.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<Location>,
    cursor: usize,
    pushes: usize,
}

impl MemoryHistory {
    #[must_use]
    pub fn new(initial_href: &str) -> Self {
        Self { entries: vec![Location::from_href(initial_href)], cursor: 0, pushes: 0 }
    }

    #[must_use]
    pub fn entries(&self) -> &[Location] {
        &self.entries
    }

    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of `push` calls made against this history.
    #[must_use]
    pub const fn push_count(&self) -> usize {
        self.pushes
    }

    /// Moves one entry back. Returns `false` at the start of the history.
    pub fn back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn forward(&mut self) -> bool {
        if self.cursor + 1 >= self.entries.len() {
            return false;
        }
        self.cursor += 1;
        true
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl LocationSource for MemoryHistory {
    fn location(&self) -> Location {
        self.entries.get(self.cursor).cloned().unwrap_or_default()
    }
}

impl HistoryWriter for MemoryHistory {
    fn push(&mut self, url: &str) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(Location::from_href(url));
        self.cursor = self.entries.len() - 1;
        self.pushes += 1;
    }

    fn replace(&mut self, url: &str) {
        let location = Location::from_href(url);
        match self.entries.get_mut(self.cursor) {
            Some(slot) => *slot = location,
            None => {
                self.entries.push(location);
                self.cursor = self.entries.len() - 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_splits_query_and_drops_fragment() {
        let loc = Location::from_href("/workout-detail?id=7#top");
        assert_eq!(loc.pathname, "/workout-detail");
        assert_eq!(loc.search, "?id=7");
        assert_eq!(loc.href(), "/workout-detail?id=7");
        assert_eq!(Location::from_href("").pathname, "/");
    }

    #[test]
    fn push_truncates_forward_entries() {
        let mut history = MemoryHistory::new("/");
        history.push("/login");
        history.push("/rankings");
        assert!(history.back());
        assert_eq!(history.location().pathname, "/login");
        history.push("/terms");
        assert!(!history.forward());
        let paths: Vec<_> = history.entries().iter().map(|l| l.pathname.as_str()).collect();
        assert_eq!(paths, vec!["/", "/login", "/terms"]);
        assert_eq!(history.push_count(), 3);
    }

    #[test]
    fn replace_does_not_add_entries() {
        let mut history = MemoryHistory::new("/coach-home");
        history.replace("/");
        assert_eq!(history.entries().len(), 1);
        assert_eq!(history.push_count(), 0);
        assert!(!history.back());
    }
}
