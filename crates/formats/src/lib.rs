//! SQL dump formats for user record deduplication
//!
//! This crate loads and writes SQL dump text and extracts user records
//! from `INSERT` value tuples according to a documented record schema.

pub mod dump;
pub mod error;
pub mod extractor;
pub mod record;

pub use dump::{write_text, SqlDump};
pub use error::{Error, Result};
pub use extractor::{RecordExtractor, RecordSchema};
pub use record::UserRecord;
