//! Request and response types for DataTables server-side processing.
//!
//! A client table sends a [`Request`] describing which page it wants, how it
//! is sorted and what it is filtered by. The server answers with a
//! [`Response`] carrying the counts and the [`Row`]s of the page.
//!
//! ```json
//! {
//!   "draw": 1,
//!   "start": 0,
//!   "length": 10,
//!   "search": {"value": "", "regex": false},
//!   "order": [{"column": 0, "dir": "asc"}],
//!   "columns": [
//!     {"data": "first_name", "name": "", "searchable": true, "orderable": true,
//!      "search": {"value": "", "regex": false}}
//!   ]
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// String to string mapping used for row data and row metadata.
pub type RowMap = BTreeMap<String, String>;

/// Column ordering direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl OrderDirection {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDirection::Ascending => "asc",
            OrderDirection::Descending => "desc",
        }
    }

    /// Parses the wire representation. Anything but `asc`/`desc` is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(OrderDirection::Ascending),
            "desc" => Some(OrderDirection::Descending),
            _ => None,
        }
    }

    pub fn is_descending(&self) -> bool {
        *self == OrderDirection::Descending
    }
}

/// Search term, either global or for a single column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Search {
    /// Value to search for.
    pub value: String,

    /// Whether `value` is a regular expression. When false the value is a
    /// literal and must be escaped before it is used as a pattern.
    pub regex: bool,
}

impl Search {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            regex: false,
        }
    }

    pub fn regex(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            regex: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Ordering applied to one column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    /// Index into [`Request::columns`]. Not validated: negative or
    /// out-of-range values are skipped by [`Request::ordered_columns`].
    pub column: i64,

    pub dir: OrderDirection,
}

impl Order {
    pub fn new(column: i64, dir: OrderDirection) -> Self {
        Self { column, dir }
    }
}

/// Column requested by the client table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Column {
    /// Data source key of the column (`columns.data` on the client).
    pub data: String,

    /// Display name of the column (`columns.name` on the client).
    pub name: String,

    pub searchable: bool,

    pub orderable: bool,

    /// Search applied to this column only.
    pub search: Search,
}

impl Column {
    /// Creates a searchable, orderable column for the given data key.
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            searchable: true,
            orderable: true,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_search(mut self, search: Search) -> Self {
        self.search = search;
        self
    }

    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    pub fn orderable(mut self, orderable: bool) -> Self {
        self.orderable = orderable;
        self
    }
}

/// Incoming table request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    /// Draw counter, echoed back in the response so the client can discard
    /// out-of-order answers. Untrusted input: never reflect it as text.
    pub draw: i64,

    /// Offset of the first record of the page. Negative values are kept as
    /// sent; [`Request::offset`] clamps them to zero.
    pub start: i64,

    /// Number of records on the page. Negative means all records.
    pub length: i64,

    /// Global search, applied to every searchable column.
    pub search: Search,

    #[serde(deserialize_with = "null_as_default")]
    pub order: Vec<Order>,

    #[serde(deserialize_with = "null_as_default")]
    pub columns: Vec<Column>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_draw(mut self, draw: i64) -> Self {
        self.draw = draw;
        self
    }

    pub fn with_page(mut self, start: i64, length: i64) -> Self {
        self.start = start;
        self.length = length;
        self
    }

    pub fn with_search(mut self, search: Search) -> Self {
        self.search = search;
        self
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    /// Returns the offset of the page, treating a negative `start` as zero.
    pub fn offset(&self) -> u64 {
        u64::try_from(self.start).unwrap_or(0)
    }

    /// Returns the page size, or `None` when all records were requested.
    pub fn limit(&self) -> Option<u64> {
        u64::try_from(self.length).ok()
    }

    /// Resolves every [`Order`] to the column it refers to.
    ///
    /// Orders with a negative index or one past the end of `columns` are
    /// skipped.
    pub fn ordered_columns(&self) -> impl Iterator<Item = (&Column, OrderDirection)> + '_ {
        self.order.iter().filter_map(|o| {
            let index = usize::try_from(o.column).ok()?;
            self.columns.get(index).map(|c| (c, o.dir))
        })
    }
}

/// Outgoing table data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Response {
    /// Draw counter of the request this response answers.
    pub draw: i64,

    /// Number of records before filtering.
    pub records_total: u64,

    /// Number of records after filtering, not just on this page.
    pub records_filtered: u64,

    /// Rows of the page.
    #[serde(deserialize_with = "null_as_default")]
    pub data: Vec<Row>,

    /// Error message to show on the client. Omitted when empty.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl Response {
    pub fn new(draw: i64) -> Self {
        Self {
            draw,
            ..Default::default()
        }
    }

    pub fn with_counts(mut self, total: u64, filtered: u64) -> Self {
        self.records_total = total;
        self.records_filtered = filtered;
        self
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.data = rows;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// A single table row.
///
/// Column data and row metadata are kept apart: the reserved `DT_Row*` keys
/// never appear in [`Row::data`]. Serialization lives in [`crate::row`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    /// Column data.
    pub data: RowMap,

    /// `DT_RowId`: id of the `tr` node.
    pub id: String,

    /// `DT_RowClass`: class added to the `tr` node.
    pub class: String,

    /// `DT_RowData`: data attached to the row with jQuery `data()`.
    pub row_data: RowMap,

    /// `DT_RowAttr`: attributes set on the `tr` node.
    pub attr: RowMap,
}

impl Row {
    /// Creates a row from column data, dropping any reserved keys.
    pub fn from_data(mut data: RowMap) -> Self {
        data.retain(|k, _| !crate::row::is_reserved_key(k));
        Self {
            data,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    pub fn with_row_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.row_data.insert(key.into(), value.into());
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attr.insert(key.into(), value.into());
        self
    }

    /// Returns the value of a data column.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Returns the values of a row decoded from the array shape, in position
    /// order. Keys that are not positional indices are skipped.
    pub fn positional_values(&self) -> Vec<&str> {
        let mut indexed: Vec<(usize, &str)> = self
            .data
            .iter()
            .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v.as_str())))
            .collect();
        indexed.sort_unstable_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, v)| v).collect()
    }
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_direction_wire_values() {
        assert_eq!(OrderDirection::Ascending.as_str(), "asc");
        assert_eq!(OrderDirection::Descending.as_str(), "desc");
        assert_eq!(OrderDirection::parse("desc"), Some(OrderDirection::Descending));
        assert_eq!(OrderDirection::parse("DESC"), None);
        assert_eq!(OrderDirection::default(), OrderDirection::Ascending);

        let json = serde_json::to_string(&OrderDirection::Descending).unwrap();
        assert_eq!(json, "\"desc\"");
    }

    #[test]
    fn test_request_defaults_for_missing_fields() {
        let req: Request = serde_json::from_str(r#"{"draw": 3, "search": {"value": "x"}}"#).unwrap();
        assert_eq!(req.draw, 3);
        assert_eq!(req.search, Search::new("x"));
        assert!(req.order.is_empty());
        assert!(req.columns.is_empty());
        assert_eq!(req.length, 0);
    }

    #[test]
    fn test_null_collections_decode_as_empty() {
        let req: Request = serde_json::from_str(r#"{"order": null, "columns": null}"#).unwrap();
        assert!(req.order.is_empty());
        assert!(req.columns.is_empty());

        let resp: Response =
            serde_json::from_str(r#"{"draw":1,"recordsTotal":0,"recordsFiltered":0,"data":null}"#)
                .unwrap();
        assert!(resp.data.is_empty());
    }

    #[test]
    fn test_unknown_direction_is_rejected() {
        let result = serde_json::from_str::<Order>(r#"{"column": 0, "dir": "up"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_request_limit() {
        assert_eq!(Request::new().with_page(0, 10).limit(), Some(10));
        assert_eq!(Request::new().with_page(0, -1).limit(), None);
    }

    #[test]
    fn test_negative_start_clamps_offset() {
        let req = Request::new().with_page(-5, 10);
        assert_eq!(req.start, -5);
        assert_eq!(req.offset(), 0);
        assert_eq!(Request::new().with_page(30, 10).offset(), 30);
    }

    #[test]
    fn test_negative_numbers_decode_from_json() {
        let req: Request = serde_json::from_str(
            r#"{"start": -5, "order": [{"column": -1, "dir": "desc"}]}"#,
        )
        .unwrap();
        assert_eq!(req.start, -5);
        assert_eq!(req.order, vec![Order::new(-1, OrderDirection::Descending)]);
    }

    #[test]
    fn test_ordered_columns_skips_out_of_range() {
        let req = Request::new()
            .with_column(Column::new("first_name"))
            .with_column(Column::new("last_name"))
            .with_order(Order::new(1, OrderDirection::Descending))
            .with_order(Order::new(7, OrderDirection::Ascending))
            .with_order(Order::new(-1, OrderDirection::Descending))
            .with_order(Order::new(0, OrderDirection::Ascending));

        let resolved: Vec<(&str, OrderDirection)> = req
            .ordered_columns()
            .map(|(c, d)| (c.data.as_str(), d))
            .collect();
        assert_eq!(
            resolved,
            vec![
                ("last_name", OrderDirection::Descending),
                ("first_name", OrderDirection::Ascending),
            ]
        );
    }

    #[test]
    fn test_response_error_omitted_when_empty() {
        let resp = Response::new(5).with_counts(2, 1);
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(
            json,
            r#"{"draw":5,"recordsTotal":2,"recordsFiltered":1,"data":[]}"#
        );
        assert!(!resp.is_error());

        let resp = resp.with_error("backend unavailable");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.ends_with(r#""error":"backend unavailable"}"#));
        assert!(resp.is_error());
    }

    #[test]
    fn test_row_from_data_drops_reserved_keys() {
        let mut data = RowMap::new();
        data.insert("name".to_string(), "Foo".to_string());
        data.insert("DT_RowId".to_string(), "sneaky".to_string());
        let row = Row::from_data(data);
        assert_eq!(row.get("name"), Some("Foo"));
        assert_eq!(row.get("DT_RowId"), None);
        assert!(row.id.is_empty());
    }

    #[test]
    fn test_positional_values_in_index_order() {
        let mut data = RowMap::new();
        for i in 0..12 {
            data.insert(i.to_string(), format!("v{}", i));
        }
        let row = Row::from_data(data);
        let values = row.positional_values();
        assert_eq!(values.len(), 12);
        assert_eq!(values[2], "v2");
        assert_eq!(values[10], "v10");
    }
}
