//! # tablewire-store
//!
//! Record store for tablewire.
//!
//! This crate provides:
//! - The [`RecordSource`] trait a table backend implements
//! - Translation of a table request into a filter/sort/range [`Query`]
//! - An in-memory, JSON-file backed [`MemoryStore`]
//! - [`TableService`], which answers requests from a record source

pub mod error;
pub mod memory;
pub mod query;
pub mod service;
pub mod source;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use query::{FieldMatch, Filter, Query, SortKey};
pub use service::{RowIdSource, TableService};
pub use source::RecordSource;
