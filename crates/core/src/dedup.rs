//! Seen-key tracking for a deduplication run

use crate::key_dedup::KeyKind;
use ahash::AHashMap;

/// Keys seen so far in a run, each mapped to the line of its first occurrence
///
/// A context is owned by the caller and passed into every pass. Reusing a
/// context carries keys over between passes; a fresh one starts clean.
#[derive(Debug, Clone, Default)]
pub struct DedupContext {
    seen_emails: AHashMap<String, usize>,
    seen_usernames: AHashMap<String, usize>,
}

impl DedupContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    fn keys(&self, kind: KeyKind) -> &AHashMap<String, usize> {
        match kind {
            KeyKind::Email => &self.seen_emails,
            KeyKind::Username => &self.seen_usernames,
        }
    }

    fn keys_mut(&mut self, kind: KeyKind) -> &mut AHashMap<String, usize> {
        match kind {
            KeyKind::Email => &mut self.seen_emails,
            KeyKind::Username => &mut self.seen_usernames,
        }
    }

    /// Line of the first occurrence of `key`, if it has been seen
    pub fn first_seen(&self, kind: KeyKind, key: &str) -> Option<usize> {
        self.keys(kind).get(key).copied()
    }

    /// Record `key` as seen at `line`. An earlier occurrence is kept.
    pub fn remember(&mut self, kind: KeyKind, key: &str, line: usize) {
        if !self.keys(kind).contains_key(key) {
            self.keys_mut(kind).insert(key.to_string(), line);
        }
    }

    /// Number of distinct keys of `kind` seen
    pub fn unique_count(&self, kind: KeyKind) -> usize {
        self.keys(kind).len()
    }

    /// Forget all seen keys
    pub fn clear(&mut self) {
        self.seen_emails.clear();
        self.seen_usernames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remember_keeps_first_line() {
        let mut ctx = DedupContext::new();

        assert_eq!(ctx.first_seen(KeyKind::Email, "a@gmail.com"), None);
        ctx.remember(KeyKind::Email, "a@gmail.com", 2);
        ctx.remember(KeyKind::Email, "a@gmail.com", 9);

        assert_eq!(ctx.first_seen(KeyKind::Email, "a@gmail.com"), Some(2));
        assert_eq!(ctx.unique_count(KeyKind::Email), 1);
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut ctx = DedupContext::new();
        ctx.remember(KeyKind::Username, "jdoe", 1);

        assert_eq!(ctx.first_seen(KeyKind::Username, "jdoe"), Some(1));
        assert_eq!(ctx.first_seen(KeyKind::Email, "jdoe"), None);
        assert_eq!(ctx.unique_count(KeyKind::Email), 0);
    }

    #[test]
    fn test_clear() {
        let mut ctx = DedupContext::new();
        ctx.remember(KeyKind::Username, "jdoe", 1);
        ctx.remember(KeyKind::Email, "j@gmail.com", 1);

        ctx.clear();

        assert_eq!(ctx.unique_count(KeyKind::Username), 0);
        assert_eq!(ctx.unique_count(KeyKind::Email), 0);
    }
}
