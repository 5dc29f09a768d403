//! Append-only event log.
//!
//! Each line is one JSON-encoded [`EventLogRecordV1`]. Records are
//! hash-chained: every record commits to the previous record hash, so a
//! truncated or edited log fails [`verify_log`].

use attoledger_core::events::{EmittedEvent, Event, EventLog};
use attoledger_core::hash::{sha256, sha256_domain, EVENT_RECORD_DOMAIN_V1};
use attoledger_core::{Address, Hash32, LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogRecordV1 {
    pub record_version: u32,
    pub sequence: u64,
    pub prev_record_hash: Hash32,
    pub record_hash: Hash32,
    pub source: Address,
    pub event: Event,
}

pub fn record_hash_v1(
    prev_record_hash: &Hash32,
    sequence: u64,
    source: &Address,
    event: &Event,
) -> Result<Hash32> {
    let event_bytes = serde_json::to_vec(event)
        .map_err(|e| LedgerError::Io(format!("failed to serialize event: {e}")))?;
    let event_hash = sha256(&event_bytes);

    let mut bytes = Vec::with_capacity(4 + 8 + 32 + 20 + 32);
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&sequence.to_le_bytes());
    bytes.extend_from_slice(&prev_record_hash.0);
    bytes.extend_from_slice(&source.0);
    bytes.extend_from_slice(&event_hash.0);
    Ok(sha256_domain(EVENT_RECORD_DOMAIN_V1, &bytes))
}

#[derive(Debug)]
struct ChainHead {
    next_sequence: u64,
    last_hash: Hash32,
}

/// Append-only file recorder for engine events.
pub struct FileEventRecorder {
    path: PathBuf,
    /// Per-process serialization of writes; also guards the chain head.
    head: Mutex<ChainHead>,
}

impl FileEventRecorder {
    /// Opens `path`, verifying and resuming any existing chain. A missing
    /// file starts a new chain at the zero hash.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let head = if path.exists() {
            let records = verify_log(&path)?;
            match records.last() {
                Some(last) => ChainHead {
                    next_sequence: last.sequence + 1,
                    last_hash: last.record_hash,
                },
                None => ChainHead {
                    next_sequence: 0,
                    last_hash: Hash32::ZERO,
                },
            }
        } else {
            ChainHead {
                next_sequence: 0,
                last_hash: Hash32::ZERO,
            }
        };
        Ok(Self {
            path,
            head: Mutex::new(head),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_record_hash(&self) -> Result<Hash32> {
        Ok(self.lock_head()?.last_hash)
    }

    /// Appends one record and returns its hash.
    pub fn record(&self, emitted: &EmittedEvent) -> Result<Hash32> {
        let mut head = self.lock_head()?;
        let sequence = head.next_sequence;
        let record_hash = record_hash_v1(&head.last_hash, sequence, &emitted.source, &emitted.event)?;
        let record = EventLogRecordV1 {
            record_version: 1,
            sequence,
            prev_record_hash: head.last_hash,
            record_hash,
            source: emitted.source,
            event: emitted.event.clone(),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LedgerError::Io(format!("failed to open event log: {e}")))?;

        let mut line = serde_json::to_vec(&record)
            .map_err(|e| LedgerError::Io(format!("failed to serialize event log record: {e}")))?;
        line.push(b'\n');
        file.write_all(&line)
            .map_err(|e| LedgerError::Io(format!("failed to write event log record: {e}")))?;
        file.sync_all()
            .map_err(|e| LedgerError::Io(format!("failed to sync event log: {e}")))?;

        head.next_sequence = sequence + 1;
        head.last_hash = record_hash;
        debug!(sequence, event = emitted.event.name(), "Recorded event");
        Ok(record_hash)
    }

    /// Drains `log` into the file in emission order. Stops at the first
    /// failure; records already written stay written.
    pub fn persist(&self, log: &mut EventLog) -> Result<usize> {
        let pending = log.drain();
        for (i, emitted) in pending.iter().enumerate() {
            if let Err(e) = self.record(emitted) {
                warn!(written = i, pending = pending.len(), "Event log persist interrupted");
                return Err(e);
            }
        }
        Ok(pending.len())
    }

    fn lock_head(&self) -> Result<MutexGuard<'_, ChainHead>> {
        self.head
            .lock()
            .map_err(|_| LedgerError::Io("event log lock poisoned".into()))
    }
}

/// Reads every record in `path` and checks the hash chain.
pub fn verify_log(path: impl AsRef<Path>) -> Result<Vec<EventLogRecordV1>> {
    let file = File::open(path.as_ref())
        .map_err(|e| LedgerError::Io(format!("failed to open event log: {e}")))?;
    let mut records = Vec::new();
    let mut prev = Hash32::ZERO;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| LedgerError::Io(format!("failed to read event log: {e}")))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: EventLogRecordV1 = serde_json::from_str(&line)
            .map_err(|e| LedgerError::Io(format!("malformed record at line {}: {e}", index + 1)))?;
        let expected_sequence = records.len() as u64;
        if record.sequence != expected_sequence || record.prev_record_hash != prev {
            return Err(LedgerError::Io(format!(
                "event log chain broken at line {}",
                index + 1
            )));
        }
        let recomputed = record_hash_v1(&prev, record.sequence, &record.source, &record.event)?;
        if recomputed != record.record_hash {
            return Err(LedgerError::Io(format!(
                "event log record hash mismatch at line {}",
                index + 1
            )));
        }
        prev = record.record_hash;
        records.push(record);
    }
    Ok(records)
}
