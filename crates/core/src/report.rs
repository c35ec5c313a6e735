//! Duplicate email report

use crate::key_dedup::normalize_key;
use ahash::AHashMap;
use serde::Serialize;
use sqldedup_formats::UserRecord;

/// All records sharing one email, in input order
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub email: String,
    pub records: Vec<UserRecord>,
}

/// Records grouped by email, groups in order of first appearance
#[derive(Debug, Clone, Default)]
pub struct EmailReport {
    groups: Vec<DuplicateGroup>,
    total_records: usize,
}

impl EmailReport {
    /// Group records by email
    ///
    /// With `normalize` the grouping key is the trimmed, lower-cased email;
    /// the group is labelled with the first spelling seen.
    pub fn build<I>(records: I, normalize: bool) -> Self
    where
        I: IntoIterator<Item = UserRecord>,
    {
        let mut index: AHashMap<String, usize> = AHashMap::new();
        let mut groups: Vec<DuplicateGroup> = Vec::new();
        let mut total_records = 0;

        for record in records {
            total_records += 1;
            let key = if normalize {
                normalize_key(&record.email)
            } else {
                record.email.clone()
            };

            match index.get(&key) {
                Some(&i) => groups[i].records.push(record),
                None => {
                    index.insert(key, groups.len());
                    groups.push(DuplicateGroup {
                        email: record.email.clone(),
                        records: vec![record],
                    });
                }
            }
        }

        Self {
            groups,
            total_records,
        }
    }

    /// Groups with more than one record
    pub fn duplicates(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.groups.iter().filter(|g| g.records.len() > 1)
    }

    pub fn has_duplicates(&self) -> bool {
        self.duplicates().next().is_some()
    }

    /// Number of records that were grouped
    pub fn total_records(&self) -> usize {
        self.total_records
    }

    /// Number of distinct emails
    pub fn unique_emails(&self) -> usize {
        self.groups.len()
    }

    /// Human-readable report text
    pub fn render(&self) -> String {
        if !self.has_duplicates() {
            return "No duplicate emails found!\n".to_string();
        }

        let mut out = String::new();
        for group in self.duplicates() {
            out.push_str(&format!("\n=== DUPLICATE EMAIL: {} ===\n", group.email));
            for (i, record) in group.records.iter().enumerate() {
                out.push_str(&format!("  {}. Name: {}\n", i + 1, record.name));
                out.push_str(&format!("     Username: {}\n", record.username));
                out.push_str(&format!("     Line: {}\n\n", record.line_number));
            }
        }
        out
    }
}
