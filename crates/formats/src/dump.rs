//! Whole-file SQL dump loading and writing
//!
//! A dump is held in memory as a single string. Lines are produced by
//! splitting on `\n` only, and rendering joins the kept lines back with
//! `\n`, so an untouched dump renders byte-for-byte identical to its input.

use crate::{Error, RecordExtractor, Result, UserRecord};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

/// An SQL dump loaded into memory
#[derive(Debug, Clone)]
pub struct SqlDump {
    text: String,
    source: Option<PathBuf>,
}

impl SqlDump {
    /// Read a dump file, decompressing `.gz` files
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)?;

        let mut bytes = Vec::new();
        if is_gzip(path) {
            debug!("Opening gzip-compressed dump: {:?}", path);
            GzDecoder::new(file).read_to_end(&mut bytes)?;
        } else {
            debug!("Opening plain dump: {:?}", path);
            file.read_to_end(&mut bytes)?;
        }

        let text = String::from_utf8(bytes).map_err(|_| Error::Encoding {
            path: path.to_path_buf(),
        })?;

        info!("Loaded dump {:?} ({} bytes)", path, text.len());

        Ok(Self {
            text,
            source: Some(path.to_path_buf()),
        })
    }

    /// Build a dump from in-memory text
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: None,
        }
    }

    /// Path the dump was read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Lines of the dump, split on `\n`
    pub fn lines(&self) -> std::str::Split<'_, char> {
        self.text.split('\n')
    }

    /// Number of lines, counting the (possibly empty) piece after a final `\n`
    pub fn line_count(&self) -> usize {
        self.text.matches('\n').count() + 1
    }

    /// Records in input order, with 1-based line numbers
    pub fn records<'a>(
        &'a self,
        extractor: &'a RecordExtractor,
    ) -> impl Iterator<Item = UserRecord> + 'a {
        self.lines()
            .enumerate()
            .filter_map(move |(idx, line)| extractor.extract(line, idx + 1))
    }

    /// Reconstruct the dump without the given 1-based line numbers
    pub fn render_without(&self, excluded: &HashSet<usize>) -> String {
        if excluded.is_empty() {
            return self.text.clone();
        }

        let kept: Vec<&str> = self
            .lines()
            .enumerate()
            .filter(|(idx, _)| !excluded.contains(&(idx + 1)))
            .map(|(_, line)| line)
            .collect();
        kept.join("\n")
    }
}

/// Write text to `path` in full, creating or overwriting it
///
/// Paths ending in `.gz` are gzip-compressed.
pub fn write_text<P: AsRef<Path>>(path: P, text: &str) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;

    if is_gzip(path) {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        encoder.write_all(text.as_bytes())?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = BufWriter::new(file);
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
    }

    info!("Wrote {} bytes to {:?}", text.len(), path);
    Ok(())
}
