//! Answers table requests from a record source.

use crate::error::StoreError;
use crate::query::Query;
use crate::source::RecordSource;
use std::sync::Arc;
use tablewire_protocol::{Request, Response, Row, RowMap};

/// Sets `DT_RowId` from a data field, e.g. `id` = `7` with prefix `row_`
/// gives `row_7`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIdSource {
    pub field: String,
    pub prefix: String,
}

/// Turns requests into responses using a [`RecordSource`].
#[derive(Clone)]
pub struct TableService {
    source: Arc<dyn RecordSource>,
    row_id: Option<RowIdSource>,
}

impl TableService {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self {
            source,
            row_id: None,
        }
    }

    pub fn with_row_id(mut self, field: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.row_id = Some(RowIdSource {
            field: field.into(),
            prefix: prefix.into(),
        });
        self
    }

    pub fn source(&self) -> &Arc<dyn RecordSource> {
        &self.source
    }

    /// Builds the response for `request`.
    ///
    /// Store failures do not fail the call: they are reported to the client
    /// in [`Response::error`] with zero counts and no rows.
    pub fn respond(&self, request: &Request) -> Response {
        match self.try_respond(request) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Table request draw={} failed: {}", request.draw, e);
                Response::new(request.draw).with_error(e.to_string())
            }
        }
    }

    fn try_respond(&self, request: &Request) -> Result<Response, StoreError> {
        let query = Query::from_request(request)?;
        let total = self.source.count_all()?;
        let filtered = if query.filter.is_empty() {
            total
        } else {
            self.source.count_filtered(&query.filter)?
        };
        let rows: Vec<Row> = self
            .source
            .fetch(&query)?
            .into_iter()
            .map(|data| self.to_row(data))
            .collect();

        tracing::debug!(
            draw = request.draw,
            total,
            filtered,
            returned = rows.len(),
            "Answered table request"
        );

        Ok(Response::new(request.draw)
            .with_counts(total, filtered)
            .with_rows(rows))
    }

    fn to_row(&self, data: RowMap) -> Row {
        let id = self
            .row_id
            .as_ref()
            .and_then(|r| data.get(&r.field).map(|v| format!("{}{}", r.prefix, v)));
        let row = Row::from_data(data);
        match id {
            Some(id) => row.with_id(id),
            None => row,
        }
    }
}
