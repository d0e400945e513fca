//! Decoding of bracket-indexed form fields.
//!
//! Clients that submit the table request as a query string or an
//! `application/x-www-form-urlencoded` body flatten the nested request into
//! keys such as:
//!
//! - `draw`, `start`, `length`
//! - `search[value]`, `search[regex]`
//! - `order[0][column]`, `order[0][dir]`
//! - `columns[0][data]`, `columns[0][name]`, `columns[0][searchable]`,
//!   `columns[0][orderable]`, `columns[0][search][value]`,
//!   `columns[0][search][regex]`
//!
//! Any other key is ignored. Indices may arrive in any order; the `order`
//! and `columns` lists grow to the highest index seen, with default entries
//! filling the gaps.

use crate::error::ProtocolError;
use crate::message::{Column, OrderDirection, Request, Search};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::num::ParseIntError;
use std::str::FromStr;

/// Largest accepted `columns[i]` / `order[i]` index.
pub const MAX_INDEX: usize = 1023;

const COLUMNS: &str = "columns";
const ORDER: &str = "order";
const SEARCH: &str = "search";

/// Form fields grouped by key.
///
/// Keys iterate in sorted order, which makes decoding errors deterministic
/// when several keys are malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues(BTreeMap<String, Vec<String>>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` string, such as a URL
    /// query or a POST body. Repeated keys keep every value in order.
    pub fn parse(input: &[u8]) -> Self {
        form_urlencoded::parse(input)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Appends a value for `key`.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// Returns the first value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<String>> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = FormValues::new();
        for (k, v) in iter {
            values.append(k, v);
        }
        values
    }
}

impl<'a> IntoIterator for &'a FormValues {
    type Item = (&'a String, &'a Vec<String>);
    type IntoIter = btree_map::Iter<'a, String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Decodes form fields into a [`Request`].
///
/// Accepts any key to value-list mapping, e.g. `&HashMap<String, Vec<String>>`
/// or `&FormValues`. Only the first value of each key is used. The first
/// malformed key aborts the decode.
pub fn decode_form<I, K, V>(fields: I) -> Result<Request, ProtocolError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<[String]>,
{
    let mut request = Request::default();
    for (key, values) in fields {
        let Some(value) = values.as_ref().first() else {
            continue;
        };
        apply_field(&mut request, key.as_ref(), value)?;
    }
    Ok(request)
}

fn apply_field(request: &mut Request, key: &str, value: &str) -> Result<(), ProtocolError> {
    match key {
        "draw" => request.draw = parse_int(key, value)?,
        "start" => request.start = parse_int(key, value)?,
        "length" => request.length = parse_int(key, value)?,
        _ => {
            let Some((family, rest)) = split_family(key) else {
                return Ok(());
            };
            let segments = split_segments(key, rest)?;
            match family {
                COLUMNS => apply_column(&mut request.columns, key, &segments, value)?,
                ORDER => apply_order(request, key, &segments, value)?,
                SEARCH => apply_search(&mut request.search, key, &segments, value)?,
                _ => unreachable!("unknown key family {family}"),
            }
        }
    }
    Ok(())
}

/// `columns[i][field]` or `columns[i][search][field]`.
fn apply_column(
    columns: &mut Vec<Column>,
    key: &str,
    segments: &[&str],
    value: &str,
) -> Result<(), ProtocolError> {
    if segments.len() < 2 {
        return Err(ProtocolError::insufficient_fields(key));
    }
    let index = parse_index(key, segments[0])?;

    match (segments[1], segments.len()) {
        ("search", 2) => return Err(ProtocolError::insufficient_fields(key)),
        ("search", 3) => {
            let column = slot(columns, index);
            apply_search(&mut column.search, key, &segments[2..], value)?;
        }
        (field, 2) => {
            let column = slot(columns, index);
            match field {
                "data" => column.data = value.to_string(),
                "name" => column.name = value.to_string(),
                "searchable" => column.searchable = is_true(value),
                "orderable" => column.orderable = is_true(value),
                _ => {}
            }
        }
        _ => {}
    }
    Ok(())
}

/// `order[i][field]`.
fn apply_order(
    request: &mut Request,
    key: &str,
    segments: &[&str],
    value: &str,
) -> Result<(), ProtocolError> {
    if segments.len() < 2 {
        return Err(ProtocolError::insufficient_fields(key));
    }
    let index = parse_index(key, segments[0])?;
    if segments.len() > 2 {
        return Ok(());
    }

    let order = slot(&mut request.order, index);
    match segments[1] {
        "column" => order.column = parse_int(key, value)?,
        "dir" => {
            // Unrecognised directions keep the current one.
            if let Some(dir) = OrderDirection::parse(value) {
                order.dir = dir;
            }
        }
        _ => {}
    }
    Ok(())
}

/// `search[field]`, for the global search or the tail of a column search.
fn apply_search(
    search: &mut Search,
    key: &str,
    segments: &[&str],
    value: &str,
) -> Result<(), ProtocolError> {
    match segments {
        [] => Err(ProtocolError::insufficient_fields(key)),
        ["value"] => {
            search.value = value.to_string();
            Ok(())
        }
        ["regex"] => {
            search.regex = is_true(value);
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Matches `columns[`, `order[` and `search[` and returns the family name
/// and the bracketed remainder of the key.
///
/// The prefix includes the opening bracket, so keys such as `searchTerm`,
/// `orderBy` or a bare `columns` are not part of any family and are ignored.
fn split_family(key: &str) -> Option<(&'static str, &str)> {
    [COLUMNS, ORDER, SEARCH].into_iter().find_map(|family| {
        key.strip_prefix(family)
            .filter(|rest| rest.starts_with('['))
            .map(|rest| (family, rest))
    })
}

/// Splits `[a][b][c]` into `["a", "b", "c"]`.
///
/// Unbalanced brackets, text between groups and empty groups are all
/// reported as missing fields.
fn split_segments<'a>(key: &str, mut rest: &'a str) -> Result<Vec<&'a str>, ProtocolError> {
    let mut segments = Vec::new();
    while !rest.is_empty() {
        let inner = rest
            .strip_prefix('[')
            .ok_or_else(|| ProtocolError::insufficient_fields(key))?;
        let end = inner
            .find(']')
            .ok_or_else(|| ProtocolError::insufficient_fields(key))?;
        if end == 0 {
            return Err(ProtocolError::insufficient_fields(key));
        }
        segments.push(&inner[..end]);
        rest = &inner[end + 1..];
    }
    Ok(segments)
}

fn parse_index(key: &str, segment: &str) -> Result<usize, ProtocolError> {
    let invalid = || ProtocolError::InvalidIndex {
        key: key.to_string(),
        index: segment.to_string(),
    };
    if !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let index: usize = segment.parse().map_err(|_| invalid())?;
    if index > MAX_INDEX {
        return Err(ProtocolError::IndexOutOfRange {
            key: key.to_string(),
            index,
            max: MAX_INDEX,
        });
    }
    Ok(index)
}

fn parse_int<T>(key: &str, value: &str) -> Result<T, ProtocolError>
where
    T: FromStr<Err = ParseIntError>,
{
    value.parse().map_err(|source| ProtocolError::InvalidInteger {
        key: key.to_string(),
        value: value.to_string(),
        source,
    })
}

/// Only the literal `true` is true. Missing, malformed and `false` values
/// are all false.
fn is_true(value: &str) -> bool {
    value == "true"
}

/// Returns the entry at `index`, growing `items` with defaults if needed.
fn slot<T: Default>(items: &mut Vec<T>, index: usize) -> &mut T {
    if index >= items.len() {
        items.resize_with(index + 1, T::default);
    }
    &mut items[index]
}
