//! Single-pass report, audit and removal over a loaded dump
//!
//! Every pass walks the dump's lines in order and takes the caller's
//! [`DedupContext`]; nothing is kept between calls except through it.

use crate::key_dedup::{DedupMode, DedupStats, DuplicateMatch, KeyDeduplicator, Verdict};
use crate::report::EmailReport;
use crate::DedupContext;
use sqldedup_formats::{RecordExtractor, SqlDump, UserRecord};
use std::collections::HashSet;
use tracing::{debug, info};

/// Result of a removal pass
#[derive(Debug, Clone)]
pub struct RemovalOutcome {
    /// Dump text with duplicate lines omitted
    pub body: String,
    /// 1-based line numbers that were dropped, ascending
    pub removed_lines: Vec<usize>,
    /// Every duplicate relationship behind the dropped lines
    pub matches: Vec<DuplicateMatch>,
    pub stats: DedupStats,
}

impl RemovalOutcome {
    pub fn removed_count(&self) -> usize {
        self.removed_lines.len()
    }
}

/// Incremental removal pass, fed one line at a time
///
/// Useful when the caller wants to report progress between lines; see
/// [`remove_duplicates`] for the one-shot form.
pub struct RemovalPass<'a> {
    extractor: &'a RecordExtractor,
    deduplicator: KeyDeduplicator,
    ctx: &'a mut DedupContext,
    excluded: HashSet<usize>,
    removed_lines: Vec<usize>,
    matches: Vec<DuplicateMatch>,
    lines_seen: usize,
}

impl<'a> RemovalPass<'a> {
    pub fn new(
        extractor: &'a RecordExtractor,
        deduplicator: KeyDeduplicator,
        ctx: &'a mut DedupContext,
    ) -> Self {
        info!(
            "Removing duplicates by {} ({} schema)",
            deduplicator.mode(),
            extractor.schema()
        );
        Self {
            extractor,
            deduplicator,
            ctx,
            excluded: HashSet::new(),
            removed_lines: Vec::new(),
            matches: Vec::new(),
            lines_seen: 0,
        }
    }

    /// Process one line. Returns `false` when the line is a duplicate to drop.
    ///
    /// Lines that are not records are always kept.
    pub fn feed(&mut self, line_number: usize, line: &str) -> bool {
        self.lines_seen += 1;

        let record = match self.extractor.extract(line, line_number) {
            Some(record) => record,
            None => return true,
        };

        match self.deduplicator.check(&record, self.ctx) {
            Verdict::Unique => true,
            Verdict::Duplicate(matches) => {
                info!("{}", removal_message(self.deduplicator.mode(), &record, &matches));
                self.excluded.insert(line_number);
                self.removed_lines.push(line_number);
                self.matches.extend(matches);
                false
            }
        }
    }

    pub fn stats(&self) -> &DedupStats {
        self.deduplicator.stats()
    }

    pub fn lines_seen(&self) -> usize {
        self.lines_seen
    }

    pub fn removed_count(&self) -> usize {
        self.removed_lines.len()
    }

    /// Render the cleaned body of `dump`, the dump this pass was fed from
    pub fn finish(self, dump: &SqlDump) -> RemovalOutcome {
        info!("Total duplicates removed: {}", self.removed_lines.len());

        RemovalOutcome {
            body: dump.render_without(&self.excluded),
            removed_lines: self.removed_lines,
            matches: self.matches,
            stats: self.deduplicator.stats().clone(),
        }
    }
}

/// Log line for one dropped record, naming every key that matched
fn removal_message(mode: DedupMode, record: &UserRecord, matches: &[DuplicateMatch]) -> String {
    let kinds: Vec<String> = matches.iter().map(|m| m.kind.to_string()).collect();
    match mode {
        DedupMode::Either => format!(
            "Removing duplicate {}: {} (username: {}, email: {}, line {})",
            kinds.join("+"),
            record.name,
            record.username,
            record.email,
            record.line_number
        ),
        _ => format!(
            "Removing duplicate {}: {} (line {})",
            kinds.join("+"),
            matches.first().map(|m| m.value.as_str()).unwrap_or_default(),
            record.line_number
        ),
    }
}

/// Drop every record line whose key was already seen, keeping the first
pub fn remove_duplicates(
    dump: &SqlDump,
    extractor: &RecordExtractor,
    deduplicator: KeyDeduplicator,
    ctx: &mut DedupContext,
) -> RemovalOutcome {
    let mut pass = RemovalPass::new(extractor, deduplicator, ctx);
    for (idx, line) in dump.lines().enumerate() {
        pass.feed(idx + 1, line);
    }
    pass.finish(dump)
}

/// List every duplicate relationship without removing anything
///
/// Usernames and emails are tracked independently: a record whose username
/// repeats still registers its email, and vice versa.
pub fn audit_duplicates(
    dump: &SqlDump,
    extractor: &RecordExtractor,
    normalize: bool,
    ctx: &mut DedupContext,
) -> Vec<DuplicateMatch> {
    let mut by_username = KeyDeduplicator::new(DedupMode::Username).with_normalization(normalize);
    let mut by_email = KeyDeduplicator::new(DedupMode::Email).with_normalization(normalize);
    let mut found = Vec::new();

    for record in dump.records(extractor) {
        for dedup in [&mut by_username, &mut by_email] {
            if let Verdict::Duplicate(matches) = dedup.check(&record, ctx) {
                found.extend(matches);
            }
        }
    }

    debug!("Audit found {} duplicate relationships", found.len());
    found
}

/// Group the dump's records by email
pub fn report_email_duplicates(
    dump: &SqlDump,
    extractor: &RecordExtractor,
    normalize: bool,
) -> EmailReport {
    info!("Searching for duplicate emails...");
    EmailReport::build(dump.records(extractor), normalize)
}
