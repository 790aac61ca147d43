// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log of [`Event`]s.
//!
//! One JSON object per line: `{"seq": N, "event": {...}}`. Appends are
//! buffered and written on [`Wal::flush`], which also fsyncs. A torn or
//! corrupt tail found on open is moved aside to a `.bak` file and the valid
//! prefix is kept.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tb_core::Event;
use thiserror::Error;
use tracing::warn;

use crate::snapshot::rotate_bak_path;

/// Buffered entries that force a flush.
const FLUSH_THRESHOLD: usize = 100;
/// Maximum time an entry may sit in the buffer.
const FLUSH_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

pub struct Wal {
    path: PathBuf,
    file: File,
    buffer: Vec<u8>,
    buffered: usize,
    oldest_buffered: Option<Instant>,
    write_seq: u64,
    processed_seq: u64,
    /// Byte offset of the next entry `next_unprocessed` reads.
    read_offset: u64,
}

impl Wal {
    /// Open (or create) the log. Entries up to `processed_seq` are treated
    /// as already applied.
    pub fn open(path: &Path, processed_seq: u64) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        if path.exists() {
            repair(path)?;
        }
        let file = OpenOptions::new().create(true).append(true).read(true).open(path)?;

        let entries = read_entries(path)?;
        let write_seq = entries.last().map(|e| e.seq).unwrap_or(0);

        let mut wal = Self {
            path: path.to_path_buf(),
            file,
            buffer: Vec::new(),
            buffered: 0,
            oldest_buffered: None,
            write_seq,
            processed_seq,
            read_offset: 0,
        };
        wal.read_offset = wal.offset_after(processed_seq)?;
        Ok(wal)
    }

    /// Buffer an event and return its sequence number.
    pub fn append(&mut self, event: &Event) -> Result<u64, WalError> {
        let seq = self.write_seq + 1;
        let entry = WalEntry { seq, event: event.clone() };
        serde_json::to_writer(&mut self.buffer, &entry)?;
        self.buffer.push(b'\n');
        self.write_seq = seq;
        self.buffered += 1;
        self.oldest_buffered.get_or_insert_with(Instant::now);
        Ok(seq)
    }

    /// Write buffered entries and fsync.
    pub fn flush(&mut self) -> Result<(), WalError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.file.write_all(&self.buffer)?;
        self.file.sync_data()?;
        self.buffer.clear();
        self.buffered = 0;
        self.oldest_buffered = None;
        Ok(())
    }

    /// Drop entries appended since the last flush and rewind the sequence.
    pub fn discard_buffered(&mut self) {
        self.write_seq -= self.buffered as u64;
        self.buffer.clear();
        self.buffered = 0;
        self.oldest_buffered = None;
    }

    pub fn needs_flush(&self) -> bool {
        self.buffered >= FLUSH_THRESHOLD
            || self.oldest_buffered.is_some_and(|t| t.elapsed() >= FLUSH_INTERVAL)
    }

    /// Next entry after the processed mark, or `None` at the end of the log.
    ///
    /// A corrupt line is skipped and reported as `None`; the following call
    /// resumes after it.
    pub fn next_unprocessed(&mut self) -> Result<Option<WalEntry>, WalError> {
        self.flush()?;
        let mut reader = BufReader::new(File::open(&self.path)?);
        loop {
            reader.seek(SeekFrom::Start(self.read_offset))?;
            let mut line = Vec::new();
            let n = reader.read_until(b'\n', &mut line)?;
            if n == 0 {
                return Ok(None);
            }
            self.read_offset += n as u64;
            match serde_json::from_slice::<WalEntry>(trim_newline(&line)) {
                Ok(entry) if entry.seq <= self.processed_seq => continue,
                Ok(entry) => return Ok(Some(entry)),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "skipping corrupt WAL entry");
                    return Ok(None);
                }
            }
        }
    }

    pub fn mark_processed(&mut self, seq: u64) {
        if seq > self.processed_seq {
            self.processed_seq = seq;
        }
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Flushed entries with `seq > after`, stopping at the first corrupt line.
    pub fn entries_after(&self, after: u64) -> Result<Vec<WalEntry>, WalError> {
        Ok(read_entries(&self.path)?.into_iter().filter(|e| e.seq > after).collect())
    }

    /// Drop entries with `seq < seq` (they are covered by a snapshot).
    pub fn truncate_before(&mut self, seq: u64) -> Result<(), WalError> {
        self.flush()?;
        let keep: Vec<WalEntry> = read_entries(&self.path)?.into_iter().filter(|e| e.seq >= seq).collect();
        write_entries(&self.path, &keep)?;
        self.file = OpenOptions::new().append(true).read(true).open(&self.path)?;
        self.read_offset = self.offset_after(self.processed_seq)?;
        Ok(())
    }

    fn offset_after(&self, seq: u64) -> Result<u64, WalError> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut offset = 0u64;
        let mut line = Vec::new();
        loop {
            line.clear();
            let n = reader.read_until(b'\n', &mut line)?;
            if n == 0 {
                return Ok(offset);
            }
            match serde_json::from_slice::<WalEntry>(trim_newline(&line)) {
                Ok(entry) if entry.seq <= seq => offset += n as u64,
                _ => return Ok(offset),
            }
        }
    }
}

fn trim_newline(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\n").unwrap_or(line)
}

/// Valid prefix of the log.
fn read_entries(path: &Path) -> Result<Vec<WalEntry>, WalError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        match serde_json::from_slice::<WalEntry>(trim_newline(&line)) {
            Ok(entry) => entries.push(entry),
            Err(_) => break,
        }
    }
    Ok(entries)
}

fn write_entries(path: &Path, entries: &[WalEntry]) -> Result<(), WalError> {
    let tmp = path.with_extension("tmp");
    {
        let mut out = File::create(&tmp)?;
        for entry in entries {
            serde_json::to_writer(&mut out, entry)?;
            out.write_all(b"\n")?;
        }
        out.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Move a log with a corrupt tail aside and rewrite its valid prefix.
fn repair(path: &Path) -> Result<(), WalError> {
    let valid = read_entries(path)?;
    let mut reader = BufReader::new(File::open(path)?);
    let mut total_lines = 0usize;
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if !trim_newline(&line).is_empty() {
            total_lines += 1;
        }
    }
    if total_lines == valid.len() {
        return Ok(());
    }

    let bak = rotate_bak_path(path);
    warn!(
        path = %path.display(),
        bak = %bak.display(),
        kept = valid.len(),
        "corrupt WAL tail, moving original aside"
    );
    fs::rename(path, &bak)?;
    write_entries(path, &valid)
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
