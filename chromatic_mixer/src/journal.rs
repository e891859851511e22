//! Experiment journal.
//!
//! Every target activation, experiment and completion is kept in an
//! in-memory buffer and, when a path is configured, appended to a JSONL
//! file so runs can be inspected or replayed offline.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// What a journal entry describes.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum JournalEvent {
    Activated,
    Experiment,
    Matched,
    Exhausted,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub sequence: usize,
    pub tick: u64,
    pub target: usize,
    pub target_name: String,
    pub event: JournalEvent,
    pub well: Option<String>,
    pub mixture: Option<Vec<u32>>,
    pub color: Option<[f64; 3]>,
    pub distance: Option<f64>,
    /// How the mixture was chosen: the covering phase or the proposal source.
    pub source: Option<String>,
    pub details: String,
    pub timestamp_ms: u128,
}

impl JournalEntry {
    pub fn new(tick: u64, target: usize, target_name: &str, event: JournalEvent) -> Self {
        Self {
            sequence: 0,
            tick,
            target,
            target_name: target_name.to_string(),
            event,
            well: None,
            mixture: None,
            color: None,
            distance: None,
            source: None,
            details: String::new(),
            timestamp_ms: timestamp_now(),
        }
    }
}

fn append_json_line<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    serde_json::to_writer(&mut file, value)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    file.write_all(b"\n")
}

/// Sequence-numbered journal with an optional JSONL sink.
#[derive(Debug, Clone, Default)]
pub struct ExperimentJournal {
    path: Option<PathBuf>,
    sequence: usize,
    entries: Vec<JournalEntry>,
}

impl ExperimentJournal {
    /// Journal that only keeps entries in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Journal that also appends each entry to `path`, creating parent
    /// directories as needed.
    pub fn with_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path: Some(path),
            ..Self::default()
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Assign the next sequence number, buffer the entry and write it out.
    /// The entry stays buffered even if the file write fails.
    pub fn record(&mut self, mut entry: JournalEntry) -> io::Result<()> {
        self.sequence += 1;
        entry.sequence = self.sequence;
        self.entries.push(entry);

        match (&self.path, self.entries.last()) {
            (Some(path), Some(entry)) => append_json_line(path, entry),
            _ => Ok(()),
        }
    }
}

pub fn timestamp_now() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_records_sequence_in_order() {
        let mut journal = ExperimentJournal::in_memory();
        for tick in 0..5 {
            let entry = JournalEntry::new(tick, 0, "teal", JournalEvent::Experiment);
            journal.record(entry).unwrap();
        }

        let sequences: Vec<usize> = journal.entries().iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
        assert!(journal.path().is_none());
    }

    #[test]
    fn file_journal_writes_one_line_per_entry() {
        let path = std::env::temp_dir()
            .join(format!("mixer_journal_{}", uuid::Uuid::new_v4()))
            .join("run.jsonl");
        let mut journal = ExperimentJournal::with_file(&path).unwrap();

        let mut entry = JournalEntry::new(3, 1, "ochre", JournalEvent::Matched);
        entry.well = Some("B4".to_string());
        entry.mixture = Some(vec![40, 0, 160]);
        entry.distance = Some(12.5);
        journal.record(entry).unwrap();
        journal
            .record(JournalEntry::new(4, 2, "sage", JournalEvent::Activated))
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["sequence"], 1);
        assert_eq!(first["event"], "matched");
        assert_eq!(first["targetName"], "ochre");
        assert_eq!(first["well"], "B4");
        assert_eq!(first["mixture"][2], 160);

        if let Some(dir) = path.parent() {
            fs::remove_dir_all(dir).ok();
        }
    }
}
