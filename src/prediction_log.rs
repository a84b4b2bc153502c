//! Append-only CSV log of every accepted prediction.
//!
//! The file is opened once in append mode and every write goes through a
//! single mutex, so concurrent requests cannot interleave or drop rows. Each
//! row is encoded in memory and written with one `write_all`; a write that
//! fails partway is truncated back, so the file only ever holds whole rows.
//! The header is written only when the file is created and must match
//! `LOG_COLUMNS` on every later open.

use crate::error::PersistenceError;
use crate::types::prediction::{PredictionRecord, PredictionRow, LOG_COLUMNS};
use csv::{ReaderBuilder, WriterBuilder};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

type Result<T> = std::result::Result<T, PersistenceError>;

/// Append target that can be rolled back to an earlier length.
trait LogSink: Write {
    fn size(&self) -> io::Result<u64>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
    fn sync(&self) -> io::Result<()>;
}

impl LogSink for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Write `bytes` as one unit: either all of them reach stable storage or the
/// sink is cut back to its previous length.
fn write_atomic<S: LogSink>(sink: &mut S, bytes: &[u8]) -> Result<()> {
    let previous_len = sink.size()?;

    let written = sink
        .write_all(bytes)
        .and_then(|_| sink.flush())
        .and_then(|_| sink.sync());

    if let Err(e) = written {
        match sink.truncate(previous_len).and_then(|_| sink.sync()) {
            Ok(()) => warn!(error = %e, len = previous_len, "Prediction log write failed, rolled back"),
            Err(rollback) => {
                error!(error = %e, rollback_error = %rollback, "Prediction log rollback failed")
            }
        }
        return Err(e.into());
    }
    Ok(())
}

/// Encode a single CSV line without touching the file.
fn encode_line<T: Serialize>(row: T) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.serialize(row)?;
    writer
        .into_inner()
        .map_err(|e| PersistenceError::Io(io::Error::new(e.error().kind(), e.error().to_string())))
}

pub struct PredictionLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl PredictionLog {
    /// Open the log at `path`, creating it (and its directory) if needed.
    ///
    /// A trailing partial line, left by a crash in the middle of a write, is
    /// cut off before the header check.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        Self::drop_partial_tail(&mut file, &path)?;
        let is_new = file.size()? == 0;

        if is_new {
            write_atomic(&mut file, &encode_line(LOG_COLUMNS)?)?;
        } else {
            Self::check_header(&path)?;
        }

        info!(path = %path.display(), created = is_new, "Prediction log opened");

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    fn drop_partial_tail(file: &mut File, path: &Path) -> Result<()> {
        let len = file.size()?;
        if len == 0 {
            return Ok(());
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::Start(len - 1))?;
        file.read_exact(&mut last)?;
        if last[0] == b'\n' {
            return Ok(());
        }

        let mut contents = Vec::with_capacity(len as usize);
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut contents)?;
        let keep = contents
            .iter()
            .rposition(|b| *b == b'\n')
            .map(|i| i as u64 + 1)
            .unwrap_or(0);

        warn!(
            path = %path.display(),
            dropped_bytes = len - keep,
            "Prediction log ends with a partial row, truncating"
        );
        file.truncate(keep)?;
        file.sync()?;
        Ok(())
    }

    fn check_header(path: &Path) -> Result<()> {
        let mut reader = ReaderBuilder::new().from_path(path)?;
        let found: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        if found.iter().map(|s| s.as_str()).ne(LOG_COLUMNS.iter().copied()) {
            return Err(PersistenceError::SchemaMismatch {
                expected: LOG_COLUMNS.iter().map(|s| s.to_string()).collect(),
                found,
            });
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and sync it to disk before returning.
    ///
    /// On error the file is left exactly as it was before the call.
    pub fn append(&self, record: &PredictionRecord) -> Result<()> {
        let line = encode_line(PredictionRow::from(record))?;

        let mut file = self
            .file
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        write_atomic(&mut *file, &line)?;

        debug!(loan_id = %record.loan_id, label = %record.label, "Prediction appended");
        Ok(())
    }

    /// Read every record currently in the log, oldest first.
    pub fn read_all(&self) -> Result<Vec<PredictionRecord>> {
        let _guard = self
            .file
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;

        let mut reader = ReaderBuilder::new().from_path(&self.path)?;
        reader
            .deserialize::<PredictionRow>()
            .map(|row| row.map(PredictionRecord::from).map_err(PersistenceError::from))
            .collect()
    }

    /// Number of records in the log.
    pub fn len(&self) -> Result<usize> {
        let _guard = self
            .file
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;

        let mut reader = ReaderBuilder::new().from_path(&self.path)?;
        let mut count = 0;
        for record in reader.records() {
            record?;
            count += 1;
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
