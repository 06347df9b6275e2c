//! JSON Lines table
//!
//! Loads a `.jsonl` file (one JSON document per line) into a
//! [`MemoryTable`]. The table name is the file stem, so `users.jsonl` is
//! scanned as table `users`. Blank lines are skipped.

use super::{MemoryTable, Page, PageRequest, SegmentReader};
use crate::error::{StorageError, StorageResult};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// A table backed by a JSON Lines file
#[derive(Debug, Clone)]
pub struct JsonLinesTable {
    inner: MemoryTable<Value>,
}

impl JsonLinesTable {
    /// Load a table from a `.jsonl` file
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let reader = BufReader::new(File::open(path)?);
        let mut items = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let value = serde_json::from_str(&line).map_err(|e| StorageError::Decode {
                line: idx + 1,
                reason: e.to_string(),
            })?;
            items.push(value);
        }

        debug!(path = %path.display(), table = %name, records = items.len(), "Loaded JSON Lines table");

        Ok(Self {
            inner: MemoryTable::new(name, items),
        })
    }

    /// Table name (file stem)
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Number of records in the file
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the file held no records
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl SegmentReader for JsonLinesTable {
    type Item = Value;
    type Cursor = usize;

    fn read_page(&self, request: PageRequest<'_, usize>) -> StorageResult<Page<Value, usize>> {
        self.inner.read_page(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_open_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orders.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(file, r#"{{"id": 1}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"id": 2}}"#).unwrap();
        drop(file);

        let table = JsonLinesTable::open(&path).unwrap();
        assert_eq!(table.name(), "orders");
        assert_eq!(table.len(), 2);

        let page = table
            .read_page(PageRequest {
                table: "orders",
                segment: 0,
                total_segments: 1,
                start: None,
                limit: None,
            })
            .unwrap();
        assert_eq!(page.items[1]["id"], 2);
        assert!(page.is_last());
    }

    #[test]
    fn test_decode_error_reports_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"ok\": true}\nnot json\n").unwrap();

        match JsonLinesTable::open(&path) {
            Err(StorageError::Decode { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected decode error, got {:?}", other),
        }
    }
}
