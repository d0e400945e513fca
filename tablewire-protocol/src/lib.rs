//! # tablewire-protocol
//!
//! DataTables server-side processing protocol for tablewire.
//!
//! This crate provides:
//! - Request/Response/Row types
//! - Decoding of bracket-indexed form fields (`columns[0][search][value]`)
//! - The polymorphic row codec (array or object rows, `DT_Row*` metadata)
//! - JSON document encoding/decoding
//!
//! Everything here is a pure transformation: no I/O, no shared state.

pub mod codec;
pub mod error;
pub mod form;
pub mod message;
pub mod row;

pub use codec::{Decoder, Encoder};
pub use error::ProtocolError;
pub use form::{decode_form, FormValues, MAX_INDEX};
pub use message::{Column, Order, OrderDirection, Request, Response, Row, RowMap, Search};
pub use row::{is_reserved_key, RESERVED_KEYS};
