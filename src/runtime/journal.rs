//! Append-only turn journal
//!
//! Each dispatch is appended as one JSON line. Readers tolerate a torn final
//! line left behind by a crash mid-append; [`TurnJournal::validate_and_repair`]
//! truncates it so later appends start on a clean line.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::error::StorageResult;
use super::turn::TurnRecord;

/// JSON-lines journal of turn records
#[derive(Debug, Clone)]
pub struct TurnJournal {
    path: PathBuf,
}

impl TurnJournal {
    /// Journal stored at `path`
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Journal file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and flush it to disk
    pub fn append(&self, record: &TurnRecord) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)?;
        file.sync_data()?;
        Ok(())
    }

    /// Read every intact record, oldest first
    pub fn read_all(&self) -> StorageResult<Vec<TurnRecord>> {
        Ok(self.scan()?.0)
    }

    /// Read the newest `limit` records, oldest first
    pub fn tail(&self, limit: usize) -> StorageResult<Vec<TurnRecord>> {
        let mut records = self.read_all()?;
        let skip = records.len().saturating_sub(limit);
        Ok(records.split_off(skip))
    }

    /// Drop a torn trailing line. Returns whether the file was modified.
    pub fn validate_and_repair(&self) -> StorageResult<bool> {
        let (records, valid_len) = self.scan()?;
        if !self.path.exists() {
            return Ok(false);
        }
        let actual_len = fs::metadata(&self.path)?.len();
        if actual_len == valid_len {
            return Ok(false);
        }
        warn!(
            path = ?self.path,
            kept = records.len(),
            truncated_bytes = actual_len - valid_len,
            "truncating torn journal tail"
        );
        let file = OpenOptions::new().write(true).open(&self.path)?;
        file.set_len(valid_len)?;
        file.sync_all()?;
        Ok(true)
    }

    /// Parse records up to the first unreadable line, returning the byte
    /// length of the intact prefix.
    fn scan(&self) -> StorageResult<(Vec<TurnRecord>, u64)> {
        if !self.path.exists() {
            return Ok((Vec::new(), 0));
        }
        let mut reader = BufReader::new(fs::File::open(&self.path)?);
        let mut records = Vec::new();
        let mut valid_len = 0u64;
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader.read_line(&mut line)?;
            if read == 0 {
                break;
            }
            if !line.ends_with('\n') {
                break;
            }
            match serde_json::from_str::<TurnRecord>(line.trim_end()) {
                Ok(record) => {
                    records.push(record);
                    valid_len += read as u64;
                }
                Err(_) => break,
            }
        }
        Ok((records, valid_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::turn::{LogicalClock, SessionId, TurnId};
    use tempfile::TempDir;

    fn record(clock: u64) -> TurnRecord {
        let session = SessionId::new();
        TurnRecord {
            turn_id: TurnId::compute(session, LogicalClock(clock), "text"),
            session,
            clock: LogicalClock(clock),
            timestamp: chrono::Utc::now(),
            markers: 0,
            ignored: 0,
            applied: Vec::new(),
            failures: Vec::new(),
        }
    }

    #[test]
    fn appends_and_reads_in_order() {
        let temp = TempDir::new().unwrap();
        let journal = TurnJournal::new(temp.path().join("turns.jsonl"));
        for clock in 1..=3 {
            journal.append(&record(clock)).unwrap();
        }
        let clocks: Vec<u64> = journal.read_all().unwrap().iter().map(|r| r.clock.0).collect();
        assert_eq!(clocks, vec![1, 2, 3]);

        let tail: Vec<u64> = journal.tail(2).unwrap().iter().map(|r| r.clock.0).collect();
        assert_eq!(tail, vec![2, 3]);
    }

    #[test]
    fn repairs_torn_tail() {
        let temp = TempDir::new().unwrap();
        let journal = TurnJournal::new(temp.path().join("turns.jsonl"));
        journal.append(&record(1)).unwrap();

        let mut file = OpenOptions::new().append(true).open(journal.path()).unwrap();
        file.write_all(b"{\"turn_id\": \"trunc").unwrap();
        drop(file);

        assert_eq!(journal.read_all().unwrap().len(), 1);
        assert!(journal.validate_and_repair().unwrap());
        assert!(!journal.validate_and_repair().unwrap());

        journal.append(&record(2)).unwrap();
        assert_eq!(journal.read_all().unwrap().len(), 2);
    }

    #[test]
    fn missing_journal_is_empty() {
        let temp = TempDir::new().unwrap();
        let journal = TurnJournal::new(temp.path().join("absent.jsonl"));
        assert!(journal.read_all().unwrap().is_empty());
        assert!(!journal.validate_and_repair().unwrap());
    }
}
