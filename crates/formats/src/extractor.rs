//! User record extraction from `INSERT` value tuples
//!
//! A user row in the dump looks like
//!
//! ```text
//! (NULL, 'name', 'email', 'username', <remember_token>, '<password>', <role>, <deleted_at>, '<created_at>', '<updated_at>'),
//! ```
//!
//! The leading `NULL` is the auto-increment id placeholder. Only the first
//! tuple on a line is considered.

use crate::UserRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::debug;

/// Shape a line must have to count as a user record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSchema {
    /// `NULL` id, three quoted fields, then any trailing fields
    #[default]
    Lenient,
    /// The full nine-column users row
    Strict,
}

static LENIENT_REGEX: OnceLock<Regex> = OnceLock::new();
static STRICT_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_lenient_regex() -> &'static Regex {
    LENIENT_REGEX.get_or_init(|| {
        Regex::new(r"\(NULL,\s*'([^']*)',\s*'([^']*)',\s*'([^']*)',.*?\)")
            .expect("Failed to compile lenient record regex")
    })
}

fn get_strict_regex() -> &'static Regex {
    STRICT_REGEX.get_or_init(|| {
        Regex::new(concat!(
            r"\(NULL,\s*'([^']*)',\s*'([^']*)',\s*'([^']*)',",
            r"\s*[^,]*,\s*'[^']*',\s*\d+,\s*[^,]*,\s*'[^']*',\s*'[^']*'\)",
        ))
        .expect("Failed to compile strict record regex")
    })
}

impl RecordSchema {
    fn regex(&self) -> &'static Regex {
        match self {
            RecordSchema::Lenient => get_lenient_regex(),
            RecordSchema::Strict => get_strict_regex(),
        }
    }
}

impl fmt::Display for RecordSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordSchema::Lenient => f.write_str("lenient"),
            RecordSchema::Strict => f.write_str("strict"),
        }
    }
}

impl FromStr for RecordSchema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lenient" => Ok(RecordSchema::Lenient),
            "strict" => Ok(RecordSchema::Strict),
            other => Err(format!(
                "unknown record schema '{}', expected 'lenient' or 'strict'",
                other
            )),
        }
    }
}

/// Extracts user records from dump lines
#[derive(Debug, Clone, Default)]
pub struct RecordExtractor {
    schema: RecordSchema,
    /// Email-domain markers a candidate line must contain (empty = any line)
    domains: Vec<String>,
}

impl RecordExtractor {
    /// Create an extractor for the given schema with no domain filter
    pub fn new(schema: RecordSchema) -> Self {
        Self {
            schema,
            domains: Vec::new(),
        }
    }

    /// Only consider lines containing at least one of these markers,
    /// e.g. `@gmail.com`
    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.domains = domains;
        self
    }

    pub fn schema(&self) -> RecordSchema {
        self.schema
    }

    fn passes_domain_filter(&self, line: &str) -> bool {
        self.domains.is_empty() || self.domains.iter().any(|d| line.contains(d.as_str()))
    }

    /// Extract the record held by `line`, if any
    ///
    /// Lines that do not match are not errors; they are simply not records.
    pub fn extract(&self, line: &str, line_number: usize) -> Option<UserRecord> {
        if !line.contains("(NULL,") || !self.passes_domain_filter(line) {
            return None;
        }

        let caps = match self.schema.regex().captures(line) {
            Some(caps) => caps,
            None => {
                debug!(
                    "Line {} looks like an insert but does not match the {} schema",
                    line_number, self.schema
                );
                return None;
            }
        };

        Some(UserRecord::new(line_number, &caps[1], &caps[2], &caps[3]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_ROW: &str = "(NULL, 'John Doe', 'john@gmail.com', 'jdoe', NULL, '$2y$10$abc', 1, NULL, '2024-01-01 00:00:00', '2024-01-01 00:00:00'),";
    const SHORT_ROW: &str = "(NULL, 'Jane Roe', 'jane@yahoo.com', 'jroe', 2),";

    #[test]
    fn test_lenient_extracts_full_row() {
        let extractor = RecordExtractor::new(RecordSchema::Lenient);
        let record = extractor.extract(FULL_ROW, 7).unwrap();

        assert_eq!(record.line_number, 7);
        assert_eq!(record.name, "John Doe");
        assert_eq!(record.email, "john@gmail.com");
        assert_eq!(record.username, "jdoe");
    }

    #[test]
    fn test_lenient_extracts_short_row() {
        let extractor = RecordExtractor::default();
        let record = extractor.extract(SHORT_ROW, 1).unwrap();
        assert_eq!(record.username, "jroe");
    }

    #[test]
    fn test_strict_ignores_short_row() {
        let extractor = RecordExtractor::new(RecordSchema::Strict);
        assert!(extractor.extract(SHORT_ROW, 1).is_none());
        assert_eq!(extractor.extract(FULL_ROW, 1).unwrap().username, "jdoe");
    }

    #[test]
    fn test_non_record_lines() {
        let extractor = RecordExtractor::default();

        assert!(extractor.extract("INSERT INTO `users` VALUES", 1).is_none());
        assert!(extractor.extract("", 2).is_none());
        assert!(extractor.extract("(1, 'a', 'b', 'c', 2),", 3).is_none());
        // Missing trailing field after the username
        assert!(extractor.extract("(NULL, 'a', 'b', 'c')", 4).is_none());
    }

    #[test]
    fn test_first_tuple_wins() {
        let extractor = RecordExtractor::default();
        let line = "(NULL, 'A', 'a@gmail.com', 'a', 1), (NULL, 'B', 'b@gmail.com', 'b', 1);";
        assert_eq!(extractor.extract(line, 1).unwrap().username, "a");
    }

    #[test]
    fn test_domain_filter() {
        let extractor = RecordExtractor::default()
            .with_domains(vec!["@mitrakab.go.id".to_string(), "@gmail.com".to_string()]);

        assert!(extractor.extract(FULL_ROW, 1).is_some());
        assert!(extractor.extract(SHORT_ROW, 2).is_none());
    }

    #[test]
    fn test_schema_from_str() {
        assert_eq!("strict".parse::<RecordSchema>().unwrap(), RecordSchema::Strict);
        assert_eq!("Lenient".parse::<RecordSchema>().unwrap(), RecordSchema::Lenient);
        assert!("loose".parse::<RecordSchema>().is_err());
        assert_eq!(RecordSchema::Strict.to_string(), "strict");
    }
}
