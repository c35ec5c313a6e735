//! Key-based duplicate detection for user records
//!
//! A record is a duplicate when one of its keys (email, username, or
//! either, depending on the mode) was already seen in the run's
//! [`DedupContext`]. The first occurrence of a key always wins.

use crate::{DedupContext, Error};
use serde::{Deserialize, Serialize};
use sqldedup_formats::UserRecord;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Which record field a key comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Email,
    Username,
}

impl KeyKind {
    /// The raw field value for this kind
    pub fn value<'a>(&self, record: &'a UserRecord) -> &'a str {
        match self {
            KeyKind::Email => &record.email,
            KeyKind::Username => &record.username,
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Email => f.write_str("email"),
            KeyKind::Username => f.write_str("username"),
        }
    }
}

/// Which keys decide that a record is a duplicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupMode {
    /// Same email as an earlier record
    Email,
    /// Same username as an earlier record
    Username,
    /// Same email or same username as an earlier kept record
    #[default]
    Either,
}

impl DedupMode {
    /// Key kinds checked in this mode
    pub fn kinds(&self) -> &'static [KeyKind] {
        match self {
            DedupMode::Email => &[KeyKind::Email],
            DedupMode::Username => &[KeyKind::Username],
            DedupMode::Either => &[KeyKind::Username, KeyKind::Email],
        }
    }
}

impl fmt::Display for DedupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupMode::Email => f.write_str("email"),
            DedupMode::Username => f.write_str("username"),
            DedupMode::Either => f.write_str("either"),
        }
    }
}

impl FromStr for DedupMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "email" => Ok(DedupMode::Email),
            "username" => Ok(DedupMode::Username),
            "either" => Ok(DedupMode::Either),
            other => Err(Error::InvalidConfig(format!(
                "unknown dedup mode '{}', expected 'email', 'username' or 'either'",
                other
            ))),
        }
    }
}

/// Normalized form of a key: trimmed and lower-cased
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// One duplicate relationship between a record and an earlier one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateMatch {
    pub kind: KeyKind,
    /// Key value as written in the duplicate record
    pub value: String,
    /// Name on the duplicate record
    pub name: String,
    /// Line of the first record with this key
    pub original_line: usize,
    /// Line of the duplicate record
    pub duplicate_line: usize,
}

/// Outcome of checking one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// First occurrence; its keys are now remembered
    Unique,
    /// At least one key was already seen
    Duplicate(Vec<DuplicateMatch>),
}

impl Verdict {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Verdict::Duplicate(_))
    }
}

/// Statistics for deduplication operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    /// Total number of records seen
    pub total_seen: usize,
    /// Number of duplicates found
    pub duplicates_found: usize,
    /// Number of unique records
    pub unique_count: usize,
}

impl DedupStats {
    /// Get the deduplication rate as a percentage
    pub fn dedup_rate(&self) -> f64 {
        if self.total_seen == 0 {
            0.0
        } else {
            (self.duplicates_found as f64 / self.total_seen as f64) * 100.0
        }
    }
}

/// Classifies records as first-seen or duplicate against a [`DedupContext`]
#[derive(Debug, Clone)]
pub struct KeyDeduplicator {
    mode: DedupMode,
    normalize: bool,
    stats: DedupStats,
}

impl KeyDeduplicator {
    /// Create a deduplicator comparing keys exactly
    pub fn new(mode: DedupMode) -> Self {
        Self {
            mode,
            normalize: false,
            stats: DedupStats::default(),
        }
    }

    /// Compare trimmed, lower-cased keys instead of raw ones
    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn mode(&self) -> DedupMode {
        self.mode
    }

    fn key<'a>(&self, kind: KeyKind, record: &'a UserRecord) -> Cow<'a, str> {
        let value = kind.value(record);
        if self.normalize {
            Cow::Owned(normalize_key(value))
        } else {
            Cow::Borrowed(value)
        }
    }

    /// Check a record against the context
    ///
    /// A unique record has all of its mode's keys remembered. A duplicate
    /// leaves the context untouched and reports every key that matched.
    pub fn check(&mut self, record: &UserRecord, ctx: &mut DedupContext) -> Verdict {
        self.stats.total_seen += 1;

        let matches: Vec<DuplicateMatch> = self
            .mode
            .kinds()
            .iter()
            .filter_map(|&kind| {
                let key = self.key(kind, record);
                ctx.first_seen(kind, &key).map(|original_line| DuplicateMatch {
                    kind,
                    value: kind.value(record).to_string(),
                    name: record.name.clone(),
                    original_line,
                    duplicate_line: record.line_number,
                })
            })
            .collect();

        if matches.is_empty() {
            for &kind in self.mode.kinds() {
                let key = self.key(kind, record);
                ctx.remember(kind, &key, record.line_number);
            }
            self.stats.unique_count += 1;
            Verdict::Unique
        } else {
            debug!(
                "Line {} duplicates line {} by {}",
                record.line_number, matches[0].original_line, matches[0].kind
            );
            self.stats.duplicates_found += 1;
            Verdict::Duplicate(matches)
        }
    }

    /// Get current statistics
    pub fn stats(&self) -> &DedupStats {
        &self.stats
    }

    /// Reset statistics; the context is owned by the caller and left alone
    pub fn reset_stats(&mut self) {
        self.stats = DedupStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(line: usize, email: &str, username: &str) -> UserRecord {
        UserRecord::new(line, format!("User {}", line), email, username)
    }

    #[test]
    fn test_email_mode() {
        let mut dedup = KeyDeduplicator::new(DedupMode::Email);
        let mut ctx = DedupContext::new();

        assert_eq!(dedup.check(&user(1, "a@gmail.com", "a"), &mut ctx), Verdict::Unique);
        assert!(dedup.check(&user(2, "a@gmail.com", "b"), &mut ctx).is_duplicate());
        // Username reuse does not matter in email mode
        assert_eq!(dedup.check(&user(3, "c@gmail.com", "a"), &mut ctx), Verdict::Unique);

        assert_eq!(dedup.stats().unique_count, 2);
        assert_eq!(dedup.stats().duplicates_found, 1);
        assert_eq!(dedup.stats().total_seen, 3);
    }

    #[test]
    fn test_username_mode_reports_original_line() {
        let mut dedup = KeyDeduplicator::new(DedupMode::Username);
        let mut ctx = DedupContext::new();

        dedup.check(&user(4, "a@gmail.com", "jdoe"), &mut ctx);
        let verdict = dedup.check(&user(9, "b@gmail.com", "jdoe"), &mut ctx);

        match verdict {
            Verdict::Duplicate(matches) => {
                assert_eq!(matches.len(), 1);
                assert_eq!(matches[0].kind, KeyKind::Username);
                assert_eq!(matches[0].value, "jdoe");
                assert_eq!(matches[0].name, "User 9");
                assert_eq!(matches[0].original_line, 4);
                assert_eq!(matches[0].duplicate_line, 9);
            }
            Verdict::Unique => panic!("expected a duplicate"),
        }
    }

    #[test]
    fn test_either_mode() {
        let mut dedup = KeyDeduplicator::new(DedupMode::Either);
        let mut ctx = DedupContext::new();

        assert!(!dedup.check(&user(1, "a@gmail.com", "a"), &mut ctx).is_duplicate());
        // Same email, new username: duplicate, and "b" is not remembered
        assert!(dedup.check(&user(2, "a@gmail.com", "b"), &mut ctx).is_duplicate());
        assert!(!dedup.check(&user(3, "c@gmail.com", "b"), &mut ctx).is_duplicate());
        // Same username only
        assert!(dedup.check(&user(4, "d@gmail.com", "a"), &mut ctx).is_duplicate());

        assert_eq!(dedup.stats().duplicates_found, 2);
    }

    #[test]
    fn test_either_mode_reports_both_keys() {
        let mut dedup = KeyDeduplicator::new(DedupMode::Either);
        let mut ctx = DedupContext::new();

        dedup.check(&user(1, "a@gmail.com", "a"), &mut ctx);
        match dedup.check(&user(2, "a@gmail.com", "a"), &mut ctx) {
            Verdict::Duplicate(matches) => {
                let kinds: Vec<_> = matches.iter().map(|m| m.kind).collect();
                assert_eq!(kinds, vec![KeyKind::Username, KeyKind::Email]);
            }
            Verdict::Unique => panic!("expected a duplicate"),
        }
    }

    #[test]
    fn test_normalized_keys() {
        let mut dedup = KeyDeduplicator::new(DedupMode::Email).with_normalization(true);
        let mut ctx = DedupContext::new();

        assert!(!dedup.check(&user(1, "John@Gmail.com", "a"), &mut ctx).is_duplicate());
        assert!(dedup.check(&user(2, " john@gmail.com ", "b"), &mut ctx).is_duplicate());

        let mut exact = KeyDeduplicator::new(DedupMode::Email);
        let mut ctx = DedupContext::new();
        assert!(!exact.check(&user(1, "John@Gmail.com", "a"), &mut ctx).is_duplicate());
        assert!(!exact.check(&user(2, "john@gmail.com", "b"), &mut ctx).is_duplicate());
    }

    #[test]
    fn test_context_carries_over() {
        let mut ctx = DedupContext::new();
        let mut first = KeyDeduplicator::new(DedupMode::Username);
        first.check(&user(1, "a@gmail.com", "jdoe"), &mut ctx);

        let mut second = KeyDeduplicator::new(DedupMode::Username);
        assert!(second.check(&user(1, "a@gmail.com", "jdoe"), &mut ctx).is_duplicate());

        let mut fresh = DedupContext::new();
        assert!(!second.check(&user(1, "a@gmail.com", "jdoe"), &mut fresh).is_duplicate());
    }

    #[test]
    fn test_dedup_rate_calculation() {
        let mut dedup = KeyDeduplicator::new(DedupMode::Email);
        let mut ctx = DedupContext::new();

        dedup.check(&user(1, "a@gmail.com", "a"), &mut ctx);
        dedup.check(&user(2, "a@gmail.com", "b"), &mut ctx);
        dedup.check(&user(3, "c@gmail.com", "c"), &mut ctx);

        let rate = dedup.stats().dedup_rate();
        assert!((rate - 33.333333333333336).abs() < 0.0001);

        dedup.reset_stats();
        assert_eq!(dedup.stats(), &DedupStats::default());
        assert_eq!(dedup.stats().dedup_rate(), 0.0);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("email".parse::<DedupMode>().unwrap(), DedupMode::Email);
        assert_eq!("USERNAME".parse::<DedupMode>().unwrap(), DedupMode::Username);
        assert_eq!("either".parse::<DedupMode>().unwrap(), DedupMode::Either);
        assert!(matches!("name".parse::<DedupMode>(), Err(Error::InvalidConfig(_))));
        assert_eq!(DedupMode::Username.to_string(), "username");
    }

    #[test]
    fn test_large_scale() {
        let mut dedup = KeyDeduplicator::new(DedupMode::Either);
        let mut ctx = DedupContext::new();

        for i in 0..10_000 {
            let record = user(i + 1, &format!("u{}@gmail.com", i), &format!("u{}", i));
            assert!(!dedup.check(&record, &mut ctx).is_duplicate());
        }
        for i in 0..10_000 {
            let record = user(i + 10_001, &format!("u{}@gmail.com", i), &format!("u{}", i));
            assert!(dedup.check(&record, &mut ctx).is_duplicate());
        }

        assert_eq!(dedup.stats().dedup_rate(), 50.0);
        assert_eq!(ctx.unique_count(KeyKind::Email), 10_000);
    }
}
