use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod ledger;
pub mod subscriptions;

pub use ledger::{ErrorRecord, FlushSummary, InactiveRecord, LedgerGuard, LedgerMode, LedgerPaths, ProgressLedger};
pub use subscriptions::SubscriptionStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt snapshot {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
        move |source| StoreError::Io { path: path.to_path_buf(), source }
    }
}

/// Replace `path` with `bytes` via a sibling temp file so readers never see a half-written file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(StoreError::io(parent))?;
    }
    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    std::fs::write(&tmp, bytes).map_err(StoreError::io(&tmp))?;
    std::fs::rename(&tmp, path).map_err(StoreError::io(path))
}

pub(crate) fn append_lines<I, S>(path: &Path, lines: I) -> Result<usize, StoreError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    use std::io::{Read, Seek, SeekFrom, Write};

    let mut buf = String::new();
    let mut n = 0usize;
    for line in lines {
        buf.push_str(line.as_ref());
        buf.push('\n');
        n += 1;
    }
    if n == 0 { return Ok(0); }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(StoreError::io(parent))?;
    }
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .map_err(StoreError::io(path))?;
    // a hand-edited file may lack its final newline
    if f.metadata().map_err(StoreError::io(path))?.len() > 0 {
        let mut last = [0u8; 1];
        f.seek(SeekFrom::End(-1)).and_then(|_| f.read_exact(&mut last)).map_err(StoreError::io(path))?;
        if last[0] != b'\n' { buf.insert(0, '\n'); }
    }
    f.write_all(buf.as_bytes()).map_err(StoreError::io(path))?;
    f.sync_data().map_err(StoreError::io(path))?;
    Ok(n)
}
