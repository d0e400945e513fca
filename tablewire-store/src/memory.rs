//! In-memory record source.

use crate::error::StoreError;
use crate::query::{Filter, Query, SortKey};
use crate::source::RecordSource;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tablewire_protocol::{Row, RowMap};

/// Rows held in memory, optionally loaded from a JSON file.
///
/// The file holds a JSON array of rows in either row shape:
///
/// ```json
/// [
///   {"first_name": "Airi", "last_name": "Satou"},
///   ["Angelica", "Ramos"]
/// ]
/// ```
///
/// Row metadata (`DT_Row*` keys) in the file is ignored.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<RowMap>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<RowMap>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Loads rows from a JSON file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let rows: Vec<Row> = serde_json::from_reader(reader)?;

        tracing::info!("Loaded {} rows from {}", rows.len(), path.display());

        Ok(Self::with_rows(rows.into_iter().map(|r| r.data).collect()))
    }

    pub fn insert(&self, row: RowMap) {
        self.rows.write().push(row);
    }

    /// Replaces every row.
    pub fn replace(&self, rows: Vec<RowMap>) {
        *self.rows.write() = rows;
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl RecordSource for MemoryStore {
    fn count_all(&self) -> Result<u64, StoreError> {
        Ok(self.rows.read().len() as u64)
    }

    fn count_filtered(&self, filter: &Filter) -> Result<u64, StoreError> {
        if filter.is_empty() {
            return self.count_all();
        }
        let rows = self.rows.read();
        Ok(rows.iter().filter(|r| filter.matches(r)).count() as u64)
    }

    fn fetch(&self, query: &Query) -> Result<Vec<RowMap>, StoreError> {
        let rows = self.rows.read();
        let mut matched: Vec<&RowMap> = rows.iter().filter(|r| query.filter.matches(r)).collect();

        if !query.sort.is_empty() {
            matched.sort_by(|a, b| compare_rows(a, b, &query.sort));
        }

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Compares two rows key by key. Rows missing a field sort first.
fn compare_rows(a: &RowMap, b: &RowMap, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = a.get(&key.field).cmp(&b.get(&key.field));
        let ord = if key.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
