//! Translation of a table request into a store query.
//!
//! - The global search matches a row when **any** searchable column matches.
//! - Every column with its own non-empty search value must **also** match.
//! - Regex searches are compiled as given, literal searches are escaped.
//! - Each order entry on an orderable column becomes a sort key.
//! - `start` skips rows (negative: none), `length` limits them (negative: no limit).

use crate::error::StoreError;
use regex::{Regex, RegexBuilder};
use tablewire_protocol::{Request, RowMap, Search};

/// Compiled pattern size limit for client supplied expressions.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// A search pattern bound to one field.
#[derive(Debug, Clone)]
pub struct FieldMatch {
    pub field: String,
    pattern: Regex,
}

impl FieldMatch {
    pub fn new(field: impl Into<String>, search: &Search) -> Result<Self, StoreError> {
        let source = if search.regex {
            search.value.clone()
        } else {
            regex::escape(&search.value)
        };
        let pattern = RegexBuilder::new(&source)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|e| StoreError::InvalidPattern {
                pattern: search.value.clone(),
                source: e,
            })?;
        Ok(Self {
            field: field.into(),
            pattern,
        })
    }

    /// A missing field never matches.
    pub fn matches(&self, row: &RowMap) -> bool {
        row.get(&self.field)
            .map(|v| self.pattern.is_match(v))
            .unwrap_or(false)
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Row filter derived from the global and per-column searches.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Global search clauses, one per searchable column. `None` when there
    /// is no global search.
    any: Option<Vec<FieldMatch>>,
    /// Column search clauses.
    all: Vec<FieldMatch>,
}

impl Filter {
    /// Builds the filter for a request.
    pub fn from_request(request: &Request) -> Result<Self, StoreError> {
        let any = if request.search.is_empty() {
            None
        } else {
            let clauses = request
                .columns
                .iter()
                .filter(|c| c.searchable && !c.data.is_empty())
                .map(|c| FieldMatch::new(&c.data, &request.search))
                .collect::<Result<Vec<_>, _>>()?;
            Some(clauses)
        };

        let all = request
            .columns
            .iter()
            .filter(|c| !c.search.is_empty() && !c.data.is_empty())
            .map(|c| FieldMatch::new(&c.data, &c.search))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { any, all })
    }

    /// Returns whether the filter lets every row through.
    pub fn is_empty(&self) -> bool {
        self.any.is_none() && self.all.is_empty()
    }

    pub fn matches(&self, row: &RowMap) -> bool {
        let global = match &self.any {
            Some(clauses) => clauses.iter().any(|m| m.matches(row)),
            None => true,
        };
        global && self.all.iter().all(|m| m.matches(row))
    }
}

/// Sort on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Everything a record source needs to produce a page.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filter: Filter,
    pub sort: Vec<SortKey>,
    /// Rows to skip.
    pub skip: u64,
    /// Maximum rows to return, `None` for all.
    pub limit: Option<u64>,
}

impl Query {
    pub fn from_request(request: &Request) -> Result<Self, StoreError> {
        let sort = request
            .ordered_columns()
            .filter(|(c, _)| c.orderable && !c.data.is_empty())
            .map(|(c, dir)| SortKey {
                field: c.data.clone(),
                descending: dir.is_descending(),
            })
            .collect();

        Ok(Self {
            filter: Filter::from_request(request)?,
            sort,
            skip: request.offset(),
            limit: request.limit(),
        })
    }
}
