//! Append-only outcome ledger: one JSON object per line, one line per terminal file outcome.

use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::debug;

use crate::error::LedgerError;
use crate::types::{LedgerEntry, Status};

pub struct OutcomeLedger {
    path: PathBuf,
    /// Serializes appends across in-flight pipelines; reads take it too so they see only
    /// complete lines.
    file: Mutex<File>,
}

impl OutcomeLedger {
    /// Open (or create) the ledger for appending. Creates missing parent directories.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let open_err = |source| LedgerError::Open {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(open_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(open_err)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry and sync it to disk before returning.
    pub fn record(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut file = self.file.lock().map_err(|_| LedgerError::Poisoned)?;
        file.write_all(line.as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|source| LedgerError::Write {
                path: self.path.clone(),
                source,
            })
    }

    /// All committed entries in file order. Lines that are not ledger entries (the transform
    /// is handed this path and may log to it, in any encoding) are skipped.
    pub fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let _guard = self.file.lock().map_err(|_| LedgerError::Poisoned)?;
        let bytes = std::fs::read(&self.path).map_err(|source| LedgerError::Open {
            path: self.path.clone(),
            source,
        })?;
        let mut entries = Vec::new();
        for (n, raw) in bytes.split(|b| *b == b'\n').enumerate() {
            let Ok(line) = std::str::from_utf8(raw) else {
                debug!("{}:{}: not UTF-8, skipped", self.path.display(), n + 1);
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LedgerEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => debug!("{}:{}: not a ledger entry ({})", self.path.display(), n + 1, e),
            }
        }
        Ok(entries)
    }

    /// Source paths whose most recent entry is a success.
    pub fn succeeded_sources(&self) -> Result<HashSet<String>, LedgerError> {
        let mut latest: HashMap<String, Status> = HashMap::new();
        for entry in self.entries()? {
            latest.insert(entry.source_path, entry.status);
        }
        Ok(latest
            .into_iter()
            .filter(|(_, status)| *status == Status::Success)
            .map(|(path, _)| path)
            .collect())
    }
}
