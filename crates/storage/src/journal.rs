// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only change journal.
//!
//! One line per commit: a [`JournalEntry`] holding the whole change batch,
//! so a multi-record transaction is durable atomically. `append` flushes
//! before returning; that flush is the commit point.
//!
//! A corrupt tail (torn write, disk garbage) is handled on open: the
//! damaged file is rotated to `.bak` and the valid prefix is rewritten,
//! so recovery never loses committed entries that parse.

use crate::change::StateChange;
use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// How many rotated `.bak` files to keep around after corruption.
const MAX_BACKUPS: u32 = 3;

/// One committed batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub changes: Vec<StateChange>,
}

/// Append-only journal of [`JournalEntry`] lines.
pub struct Journal {
    path: PathBuf,
    writer: BufWriter<File>,
    write_seq: u64,
}

impl Journal {
    /// Open (or create) the journal, returning it plus the valid entries
    /// found on disk, in order.
    pub fn open(path: &Path) -> Result<(Self, Vec<JournalEntry>), StoreError> {
        let (entries, corrupt) = read_entries(path)?;

        if corrupt {
            rotate_backups(path)?;
            // Rewrite only the valid prefix.
            let mut writer = BufWriter::new(File::create(path)?);
            for entry in &entries {
                let line = serde_json::to_string(entry)?;
                writer.write_all(line.as_bytes())?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }

        let write_seq = entries.last().map(|e| e.seq).unwrap_or(0);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let journal =
            Self { path: path.to_path_buf(), writer: BufWriter::new(file), write_seq };
        Ok((journal, entries))
    }

    /// Sequence number of the last appended entry (0 if none).
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Raise the write sequence to at least `seq`.
    ///
    /// Called after snapshot load: a truncated journal restarts at 0 on
    /// disk, but new entries must stay ahead of the snapshot watermark.
    pub fn advance_to(&mut self, seq: u64) {
        if seq > self.write_seq {
            self.write_seq = seq;
        }
    }

    /// Append one commit batch and flush. Returns the assigned sequence.
    pub fn append(&mut self, changes: &[StateChange]) -> Result<u64, StoreError> {
        let seq = self.write_seq + 1;
        let entry = JournalEntry { seq, changes: changes.to_vec() };
        let line = serde_json::to_string(&entry)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.write_seq = seq;
        Ok(seq)
    }

    /// Drop all entries (called after a snapshot has captured them).
    ///
    /// The write sequence is preserved so post-compaction entries stay
    /// ahead of the snapshot watermark.
    pub fn truncate(&mut self) -> Result<(), StoreError> {
        let file = File::create(&self.path)?;
        self.writer = BufWriter::new(file);
        Ok(())
    }
}

/// Read entries from disk. Returns the valid prefix and whether trailing
/// corruption was found.
fn read_entries(path: &Path) -> Result<(Vec<JournalEntry>, bool), StoreError> {
    let mut raw = Vec::new();
    match File::open(path) {
        Ok(mut file) => {
            file.read_to_end(&mut raw)?;
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok((Vec::new(), false));
        }
        Err(err) => return Err(err.into()),
    }

    let text = match std::str::from_utf8(&raw) {
        Ok(text) => text,
        Err(_) => {
            tracing::warn!(path = %path.display(), "journal contains non-UTF-8 data");
            return Ok((Vec::new(), true));
        }
    };

    let mut entries = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JournalEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    entries = entries.len(),
                    "journal corruption, keeping valid prefix"
                );
                return Ok((entries, true));
            }
        }
    }
    Ok((entries, false))
}

/// Rotate the damaged file to `.bak`, shifting older backups.
fn rotate_backups(path: &Path) -> Result<(), StoreError> {
    for n in (2..=MAX_BACKUPS).rev() {
        let from = backup_path(path, n - 1);
        if from.exists() {
            std::fs::rename(&from, backup_path(path, n))?;
        }
    }
    if path.exists() {
        std::fs::rename(path, backup_path(path, 1))?;
    }
    Ok(())
}

fn backup_path(path: &Path, n: u32) -> PathBuf {
    if n == 1 {
        path.with_extension("bak")
    } else {
        path.with_extension(format!("bak.{n}"))
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
