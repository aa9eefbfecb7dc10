//! Sorting and paging options for `find`.

use std::cmp::Ordering;

use serde_json::Value;

use crate::document::lookup;
use crate::filter::compare;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Options applied after filtering: sort, then skip, then limit.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Sort keys, most significant first.
    pub sort: Vec<(String, SortOrder)>,
    /// Number of matching documents to skip.
    pub skip: usize,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl FindOptions {
    /// No sorting, skipping or limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add sort keys from a spec such as `"-createdAt name"` or `"-price,name"`.
    ///
    /// A leading `-` sorts descending.
    pub fn sort_by(mut self, spec: &str) -> Self {
        for key in spec.split([',', ' ']).map(str::trim).filter(|k| !k.is_empty()) {
            let (field, order) = match key.strip_prefix('-') {
                Some(field) => (field, SortOrder::Desc),
                None => (key.trim_start_matches('+'), SortOrder::Asc),
            };
            if !field.is_empty() {
                self.sort.push((field.to_string(), order));
            }
        }
        self
    }

    /// Skip the first `n` matches.
    pub fn skip(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    /// Return at most `n` documents.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Compare two documents by the configured sort keys.
    ///
    /// Missing or null fields sort before present ones.
    pub fn compare_docs(&self, a: &Value, b: &Value) -> Ordering {
        for (field, order) in &self.sort {
            let ord = match (non_null(lookup(a, field)), non_null(lookup(b, field))) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
            };
            let ord = match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Apply sort, skip and limit to matched documents.
    pub fn apply<'a>(&self, mut docs: Vec<&'a Value>) -> Vec<&'a Value> {
        if !self.sort.is_empty() {
            docs.sort_by(|a, b| self.compare_docs(a, b));
        }
        let limit = self.limit.unwrap_or(usize::MAX);
        docs.into_iter().skip(self.skip).take(limit).collect()
    }
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}
