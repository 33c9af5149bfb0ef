use std::{
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Seek, SeekFrom, Write},
    iter::FusedIterator,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, warn};

use crate::transaction::Transaction;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Transaction log `{}` not found", .path.display())]
    NotFound { path: PathBuf },
    #[error("Transaction log I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("Corrupt record at line {line}: {source}")]
    CorruptRecord {
        line: u64,
        #[source]
        source: serde_json::Error,
    },
    #[error("Truncated record at line {line}, missing newline terminator")]
    TruncatedRecord { line: u64 },
    #[error("Failed to encode transaction: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Durable destination for accepted transactions.
///
/// [`TransactionLog`] is the only production implementation, the trait exists
/// so the mempool drain and the ledger can be exercised against failing storage.
pub trait TransactionSink {
    fn append(&mut self, tx: &Transaction) -> Result<(), LogError>;

    /// Releases the underlying storage.
    fn close(self) -> Result<(), LogError>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Append-only, newline-delimited JSON log of transactions.
///
/// The handle owns the file for as long as it's open; dropping it releases the
/// descriptor. The log is never created here, it must be provisioned upfront.
#[derive(Debug)]
pub struct TransactionLog {
    file: File,
    path: PathBuf,
}

impl TransactionLog {
    pub fn open(path: &Path) -> Result<Self, LogError> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(path)
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => LogError::NotFound {
                    path: path.to_owned(),
                },
                _ => LogError::Io(err),
            })?;
        Ok(Self {
            file,
            path: path.to_owned(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the log from the very first record, in file order.
    /// Every call starts over from the beginning of the file.
    pub fn replay(&mut self) -> Result<Replay<'_>, LogError> {
        (&self.file).seek(SeekFrom::Start(0))?;
        Ok(Replay {
            reader: BufReader::new(&self.file),
            line: 0,
            buf: Vec::new(),
            done: false,
        })
    }

    pub fn close(self) -> Result<(), LogError> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Writes one record and makes it durable with `sync`.
    ///
    /// If either step fails the file is cut back to its previous length, so a
    /// retried append never lands behind a partial or duplicated record.
    fn write_record<F>(&mut self, tx: &Transaction, sync: F) -> Result<(), LogError>
    where
        F: FnOnce(&File) -> io::Result<()>,
    {
        let mut record = serde_json::to_vec(tx).map_err(LogError::Encode)?;
        record.push(b'\n');
        let len = self.file.metadata()?.len();
        // whole record in one write, append mode puts it at the end of the file
        let written = self.file.write_all(&record).and_then(|()| sync(&self.file));
        if let Err(err) = written {
            if let Err(truncate_err) = self.file.set_len(len) {
                warn!(len, "failed to roll back transaction log: {truncate_err}");
            }
            return Err(err.into());
        }
        debug!(from = %tx.from, to = %tx.to, value = tx.value, "transaction appended");
        Ok(())
    }
}

impl TransactionSink for TransactionLog {
    fn append(&mut self, tx: &Transaction) -> Result<(), LogError> {
        self.write_record(tx, File::sync_data)
    }

    fn close(self) -> Result<(), LogError> {
        TransactionLog::close(self)
    }
}

/// Lazy iterator over logged transactions, yields `(line, transaction)`.
///
/// Stops after the first error, corrupt records are never skipped.
pub struct Replay<'a> {
    reader: BufReader<&'a File>,
    line: u64,
    buf: Vec<u8>,
    done: bool,
}

impl Replay<'_> {
    fn parse_record(&self) -> Result<(u64, Transaction), LogError> {
        let Some(record) = self.buf.strip_suffix(b"\n") else {
            return Err(LogError::TruncatedRecord { line: self.line });
        };
        serde_json::from_slice(record)
            .map(|tx| (self.line, tx))
            .map_err(|source| LogError::CorruptRecord {
                line: self.line,
                source,
            })
    }
}

impl Iterator for Replay<'_> {
    type Item = Result<(u64, Transaction), LogError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.buf.clear();
        let item = match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.done = true;
                return None;
            }
            Ok(_) => {
                self.line += 1;
                self.parse_record()
            }
            Err(err) => Err(LogError::Io(err)),
        };
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}

impl FusedIterator for Replay<'_> {}
