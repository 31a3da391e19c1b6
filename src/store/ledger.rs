use std::collections::HashSet;
use std::fmt;
use std::io::ErrorKind;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::util::time::rfc3339;

use super::{append_lines, write_atomic, StoreError};

#[derive(Debug, Clone)]
pub struct LedgerPaths {
    pub processed: PathBuf,
    pub inactive: PathBuf,
    pub errors: PathBuf,
}

/// How the processed-channel file is written on flush.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerMode {
    /// Rewrite the full set (ids loaded at start plus this run's).
    #[default]
    Overwrite,
    /// Append only ids first seen this run.
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InactiveRecord {
    pub channel_id: String,
    pub channel_title: String,
    /// None when the channel has no visible uploads.
    pub last_video: Option<DateTime<Utc>>,
    pub discovered_at: DateTime<Utc>,
}

impl fmt::Display for InactiveRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = match self.last_video {
            Some(ts) => rfc3339(ts),
            None => "none found".to_string(),
        };
        write!(
            f,
            "{} ({}) | last video: {} | flagged: {}",
            self.channel_id,
            self.channel_title,
            last,
            rfc3339(self.discovered_at)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub channel_title: String,
    pub channel_id: String,
    pub error: String,
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // keep each record on one line
        let error = self.error.replace(['\n', '\r'], " ");
        write!(f, "{} (ID: {}) | {}", self.channel_title, self.channel_id, error)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushSummary {
    pub processed_total: usize,
    pub processed_new: usize,
    pub inactive_written: usize,
    pub errors_written: usize,
}

/// Durable record of which channels have been evaluated, plus the inactive/error side logs.
/// Mutations stay in memory until `flush`.
#[derive(Debug)]
pub struct ProgressLedger {
    paths: LedgerPaths,
    mode: LedgerMode,
    processed: HashSet<String>,
    // ids first seen this run, in processing order
    added: Vec<String>,
    inactive: Vec<InactiveRecord>,
    errors: Vec<ErrorRecord>,
}

impl ProgressLedger {
    pub fn open(paths: LedgerPaths, mode: LedgerMode) -> Result<Self, StoreError> {
        let processed = Self::load_processed(&paths.processed)?;
        Ok(Self { paths, mode, processed, added: Vec::new(), inactive: Vec::new(), errors: Vec::new() })
    }

    /// One trimmed id per line; blank lines ignored; a missing file is an empty set.
    pub fn load_processed(path: &Path) -> Result<HashSet<String>, StoreError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(StoreError::io(path)(e)),
        };
        Ok(raw.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
    }

    pub fn is_processed(&self, channel_id: &str) -> bool {
        self.processed.contains(channel_id)
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn record_processed(&mut self, channel_id: &str) {
        if self.processed.insert(channel_id.to_string()) {
            self.added.push(channel_id.to_string());
        }
    }

    pub fn record_inactive(&mut self, rec: InactiveRecord) {
        self.inactive.push(rec);
    }

    pub fn record_error(&mut self, rec: ErrorRecord) {
        self.errors.push(rec);
    }

    /// Persist: inactive and error entries appended first, then the processed set per `mode`.
    /// A failure part-way can leave a channel unprocessed, never processed without its verdict.
    /// Buffers are drained as each file lands, so a second flush writes no duplicates.
    pub fn flush(&mut self) -> Result<FlushSummary, StoreError> {
        let inactive_written = append_lines(&self.paths.inactive, self.inactive.iter().map(|r| r.to_string()))?;
        self.inactive.clear();
        let errors_written = append_lines(&self.paths.errors, self.errors.iter().map(|r| r.to_string()))?;
        self.errors.clear();

        let processed_new = self.added.len();
        match self.mode {
            LedgerMode::Overwrite => {
                let mut ids: Vec<&str> = self.processed.iter().map(String::as_str).collect();
                ids.sort_unstable();
                let mut body = ids.join("\n");
                if !body.is_empty() { body.push('\n'); }
                write_atomic(&self.paths.processed, body.as_bytes())?;
            }
            LedgerMode::Append => {
                append_lines(&self.paths.processed, &self.added)?;
            }
        }
        self.added.clear();

        Ok(FlushSummary { processed_total: self.processed.len(), processed_new, inactive_written, errors_written })
    }
}

/// Holds the ledger for one run. `finish` flushes; dropping an unfinished guard flushes best-effort.
pub struct LedgerGuard {
    ledger: ProgressLedger,
    flushed: bool,
}

impl LedgerGuard {
    pub fn new(ledger: ProgressLedger) -> Self {
        Self { ledger, flushed: false }
    }

    pub fn finish(mut self) -> Result<FlushSummary, StoreError> {
        self.flushed = true;
        self.ledger.flush()
    }
}

impl Deref for LedgerGuard {
    type Target = ProgressLedger;
    fn deref(&self) -> &ProgressLedger { &self.ledger }
}

impl DerefMut for LedgerGuard {
    fn deref_mut(&mut self) -> &mut ProgressLedger { &mut self.ledger }
}

impl Drop for LedgerGuard {
    fn drop(&mut self) {
        if self.flushed { return; }
        self.flushed = true;
        match self.ledger.flush() {
            Ok(s) => tracing::warn!(processed = s.processed_total, "ledger flushed on unwind"),
            Err(e) => tracing::error!(error = %e, "ledger flush on unwind failed"),
        }
    }
}
