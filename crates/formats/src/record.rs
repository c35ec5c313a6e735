//! User record extracted from a dump line

use serde::Serialize;

/// A single user insertion record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    /// 1-based line number in the source dump
    pub line_number: usize,
    pub name: String,
    pub email: String,
    pub username: String,
}

impl UserRecord {
    /// Create a new record
    pub fn new(
        line_number: usize,
        name: impl Into<String>,
        email: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            line_number,
            name: name.into(),
            email: email.into(),
            username: username.into(),
        }
    }
}
