//! Line-delimited JSON snapshot codec.
//!
//! Save is a full in-order traversal: one JSON object per line under a
//! `#`-comment header, ascending by id. Load is a *replay* of the same
//! operations used at runtime — each record is rebuilt field by field, its
//! sub-list by repeated `append`, and inserted into a fresh index — so a
//! loaded index is indistinguishable from one built live.
//!
//! Comment and blank lines are skipped on load. serde_json escapes any
//! newline inside string values, so the one-record-per-line invariant
//! holds by construction.

use crate::index::{IndexError, OrderedIndex};
use crate::record::{FieldValue, Record, RecordId, SubRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Header line written at the start of every snapshot file.
pub const SNAPSHOT_HEADER: &str = "# docket snapshot v1";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur while writing or replaying a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// I/O failure on the underlying reader/writer.
    #[error("snapshot I/O error: {0}")]
    Io(#[from] io::Error),

    /// A record failed to serialize.
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A line is not a valid record object.
    #[error("snapshot line {line}: malformed record: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Replaying a line against the index failed (duplicate id).
    #[error("snapshot line {line}: replay rejected: {source}")]
    Replay {
        line: usize,
        #[source]
        source: IndexError,
    },
}

/// On-disk shape of one record line. Mirrors [`Record`]'s serialized form
/// so that load can replay construction explicitly.
#[derive(Debug, Serialize, Deserialize)]
struct RecordLine {
    id: RecordId,
    #[serde(default)]
    fields: BTreeMap<String, FieldValue>,
    #[serde(default)]
    entries: Vec<SubRecord>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Emit the full index as a snapshot: header line, then one record per
/// line in ascending id order.
///
/// # Errors
///
/// [`SnapshotError::Io`] on write failure, [`SnapshotError::Serialize`]
/// when a record cannot be encoded.
pub fn save<W: Write>(index: &OrderedIndex, mut writer: W) -> Result<(), SnapshotError> {
    writeln!(writer, "{SNAPSHOT_HEADER}")?;
    for record in index {
        let line = serde_json::to_string(record)?;
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

/// Rebuild an index by replaying every record line from `reader`.
///
/// # Errors
///
/// [`SnapshotError::Io`] on read failure; [`SnapshotError::Parse`] with a
/// 1-based line number for malformed lines; [`SnapshotError::Replay`] when
/// a line carries an id the index already holds.
pub fn load<R: BufRead>(reader: R) -> Result<OrderedIndex, SnapshotError> {
    let mut index = OrderedIndex::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parsed: RecordLine = serde_json::from_str(trimmed).map_err(|source| {
            SnapshotError::Parse {
                line: line_no + 1,
                source,
            }
        })?;

        // Replay: same set_field/append/insert calls a live caller makes.
        let mut record = Record::new(parsed.id);
        for (name, value) in parsed.fields {
            record.set_field(name, value);
        }
        for entry in parsed.entries {
            record.entries_mut().append(entry);
        }
        index
            .insert(record)
            .map_err(|source| SnapshotError::Replay {
                line: line_no + 1,
                source,
            })?;
    }
    Ok(index)
}

/// Write a snapshot to `path`, truncating any existing file.
///
/// # Errors
///
/// Propagates [`SnapshotError::Io`] / [`SnapshotError::Serialize`].
pub fn save_to_path(index: &OrderedIndex, path: &Path) -> Result<(), SnapshotError> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    save(index, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Load a snapshot from `path`.
///
/// # Errors
///
/// Propagates every [`SnapshotError`] variant, including
/// [`SnapshotError::Io`] when the file does not exist — callers that treat
/// a missing file as an empty index check for existence first.
pub fn load_from_path(path: &Path) -> Result<OrderedIndex, SnapshotError> {
    let file = fs::File::open(path)?;
    load(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::{SnapshotError, load, load_from_path, save, save_to_path};
    use crate::index::{IndexError, OrderedIndex};
    use crate::record::{FieldValue, Record, RecordId, SubRecord};

    fn sample_index() -> OrderedIndex {
        let mut index = OrderedIndex::new();
        let mut regatta = Record::new(RecordId(30))
            .with_field("name", FieldValue::Text("regatta".into()))
            .with_field("importance", FieldValue::Level(1));
        regatta
            .entries_mut()
            .append(SubRecord::new("Ada", "555-0100"));
        regatta
            .entries_mut()
            .append(SubRecord::new("Grace", "555-0101"));
        index.insert(regatta).unwrap();
        index
            .insert(Record::new(RecordId(50)).with_field("name", FieldValue::Text("gala".into())))
            .unwrap();
        index.insert(Record::new(RecordId(20))).unwrap();
        index
    }

    #[test]
    fn snapshot_round_trips_through_a_buffer() {
        let index = sample_index();
        let mut buf = Vec::new();
        save(&index, &mut buf).unwrap();

        let loaded = load(buf.as_slice()).unwrap();
        assert_eq!(loaded.len(), index.len());
        let original: Vec<&Record> = index.iter().collect();
        let replayed: Vec<&Record> = loaded.iter().collect();
        assert_eq!(original, replayed);
    }

    #[test]
    fn snapshot_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.snapshot");
        let index = sample_index();

        save_to_path(&index, &path).unwrap();
        let loaded = load_from_path(&path).unwrap();
        let ids: Vec<u64> = loaded.iter().map(|r| r.id().0).collect();
        assert_eq!(ids, vec![20, 30, 50]);
        assert_eq!(loaded.find(RecordId(30)).unwrap().entries().len(), 2);
    }

    #[test]
    fn save_emits_header_and_ascending_lines() {
        let mut buf = Vec::new();
        save(&sample_index(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], super::SNAPSHOT_HEADER);
        assert!(lines[1].contains("\"id\":20"));
        assert!(lines[2].contains("\"id\":30"));
        assert!(lines[3].contains("\"id\":50"));
    }

    #[test]
    fn load_skips_comments_and_blank_lines() {
        let input = "# docket snapshot v1\n\n# trailing note\n{\"id\":7}\n";
        let index = load(input.as_bytes()).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.contains(RecordId(7)));
    }

    #[test]
    fn load_reports_malformed_line_numbers() {
        let input = "# docket snapshot v1\n{\"id\":7}\nnot-json\n";
        let err = load(input.as_bytes()).unwrap_err();
        assert!(matches!(err, SnapshotError::Parse { line: 3, .. }));
    }

    #[test]
    fn load_rejects_duplicate_ids() {
        let input = "{\"id\":7}\n{\"id\":7}\n";
        let err = load(input.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::Replay {
                line: 2,
                source: IndexError::DuplicateKey(RecordId(7)),
            }
        ));
    }

    #[test]
    fn sub_list_order_survives_replay() {
        let mut buf = Vec::new();
        save(&sample_index(), &mut buf).unwrap();
        let loaded = load(buf.as_slice()).unwrap();
        let names: Vec<&str> = loaded
            .find(RecordId(30))
            .unwrap()
            .entries()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["Ada", "Grace"]);
    }
}
