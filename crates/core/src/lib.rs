//! Duplicate detection and removal for SQL dump user records
//!
//! Records come from [`sqldedup_formats`]. Every pass takes an explicit
//! [`DedupContext`] holding the keys seen so far, so repeated invocations
//! never share hidden state.

pub mod dedup;
pub mod error;
pub mod key_dedup;
pub mod pipeline;
pub mod report;

pub use dedup::DedupContext;
pub use error::{Error, Result};
pub use key_dedup::{DedupMode, DedupStats, DuplicateMatch, KeyDeduplicator, KeyKind, Verdict};
pub use pipeline::{audit_duplicates, remove_duplicates, report_email_duplicates, RemovalOutcome, RemovalPass};
pub use report::{DuplicateGroup, EmailReport};
