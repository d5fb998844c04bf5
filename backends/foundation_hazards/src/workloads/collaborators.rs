//! Stand-ins for the slow or external work that scenarios put on threads.
//!
//! None of this is interesting as concurrency; it only has to be slow,
//! blocking, or fallible in realistic ways.

use core::time::Duration;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::thread;

use regex::Regex;
use sha1::{Digest, Sha1};
use walkdir::WalkDir;

use crate::errors::{HazardError, HazardResult};

static TITLE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok());

/// CPU-bound filler: SHA-1 of `text`, re-hashed `rounds` times, as hex.
#[must_use]
pub fn slow_hash(text: &str, rounds: u32) -> String {
    let mut digest = Sha1::digest(text.as_bytes());
    for _ in 1..rounds.max(1) {
        digest = Sha1::digest(digest);
    }
    to_hex(&digest)
}

fn to_hex(bytes: &[u8]) -> String {
    use core::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// # Errors
///
/// [`HazardError::Io`] when the file cannot be read as UTF-8 text.
pub fn read_file(path: &Path) -> HazardResult<String> {
    Ok(fs::read_to_string(path)?)
}

/// Every non-overlapping match of `pattern` in `text`, in order.
///
/// # Errors
///
/// [`HazardError::Pattern`] when `pattern` does not compile.
pub fn find_matches(text: &str, pattern: &str) -> HazardResult<Vec<String>> {
    let regex = Regex::new(pattern)?;
    Ok(regex.find_iter(text).map(|m| m.as_str().to_string()).collect())
}

/// Trimmed contents of the first `<title>` element, if any.
#[must_use]
pub fn extract_title(html: &str) -> Option<String> {
    let captures = TITLE.as_ref()?.captures(html)?;
    let title = captures.get(1)?.as_str().trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// Files under `dir` (recursively) whose extension is `extension`, sorted.
///
/// # Errors
///
/// [`HazardError::Io`] when the walk cannot read a directory.
pub fn list_files(dir: &Path, extension: &str) -> HazardResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == extension)
        {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

pub type Row = BTreeMap<String, String>;

/// Something that answers queries with rows, possibly slowly.
pub trait TabularSource: Send + Sync {
    /// # Errors
    ///
    /// [`HazardError::DataAccess`] when the query cannot be answered.
    fn query(&self, query: &str) -> HazardResult<Vec<Row>>;
}

/// Rows held in memory, served after an optional simulated latency.
///
/// Understands two query forms: `*` for every row and `column=value` for
/// rows whose `column` equals `value`.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    rows: Vec<Row>,
    latency: Option<Duration>,
}

impl InMemorySource {
    #[must_use]
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows, latency: None }
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn has_column(&self, column: &str) -> bool {
        self.rows.iter().any(|row| row.contains_key(column))
    }
}

impl TabularSource for InMemorySource {
    fn query(&self, query: &str) -> HazardResult<Vec<Row>> {
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }

        let query = query.trim();
        if query == "*" {
            return Ok(self.rows.clone());
        }

        let Some((column, value)) = query.split_once('=') else {
            return Err(HazardError::DataAccess(format!("unsupported query: {query:?}")));
        };
        let (column, value) = (column.trim(), value.trim());
        if column.is_empty() {
            return Err(HazardError::DataAccess(format!("missing column in query: {query:?}")));
        }
        if !self.rows.is_empty() && !self.has_column(column) {
            return Err(HazardError::DataAccess(format!("unknown column: {column}")));
        }

        Ok(self
            .rows
            .iter()
            .filter(|row| row.get(column).is_some_and(|cell| cell == value))
            .cloned()
            .collect())
    }
}
