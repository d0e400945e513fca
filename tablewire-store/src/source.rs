//! The record source abstraction.

use crate::error::StoreError;
use crate::query::{Filter, Query};
use tablewire_protocol::RowMap;

/// A collection of rows that can be counted, filtered, sorted and paged.
pub trait RecordSource: Send + Sync {
    /// Counts every record, ignoring any filter.
    fn count_all(&self) -> Result<u64, StoreError>;

    /// Counts the records that pass `filter`.
    fn count_filtered(&self, filter: &Filter) -> Result<u64, StoreError>;

    /// Returns the page of records described by `query`.
    fn fetch(&self, query: &Query) -> Result<Vec<RowMap>, StoreError>;
}
