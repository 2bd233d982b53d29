// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! zstd-compressed state snapshots.
//!
//! A snapshot captures the materialized state up to a journal sequence
//! watermark; journal entries past the watermark are replayed on top at
//! open. Snapshots are written to a temp file and renamed, so a crash
//! mid-compaction leaves the previous snapshot intact.

use crate::state::CoreState;
use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

const ZSTD_LEVEL: i32 = 3;

/// State plus the journal watermark it covers.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub seq: u64,
    pub state: CoreState,
}

/// Write a snapshot atomically (tmp + rename).
pub(crate) fn write(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    {
        let file = File::create(&tmp)?;
        let mut encoder = zstd::Encoder::new(file, ZSTD_LEVEL)?;
        serde_json::to_writer(&mut encoder, snapshot)?;
        encoder.finish()?.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Read the snapshot if one exists.
///
/// A corrupt snapshot is rotated to `.bak` and treated as absent; the
/// journal replay then rebuilds whatever it still covers.
pub(crate) fn read(path: &Path) -> Result<Option<Snapshot>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let decoder = match zstd::Decoder::new(file) {
        Ok(decoder) => decoder,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "unreadable snapshot, ignoring");
            std::fs::rename(path, path.with_extension("bak"))?;
            return Ok(None);
        }
    };

    match serde_json::from_reader(decoder) {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "corrupt snapshot, ignoring");
            std::fs::rename(path, path.with_extension("bak"))?;
            Ok(None)
        }
    }
}
