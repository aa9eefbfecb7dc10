//! `ApiFeatures`: turn request query parameters into a store query.
//!
//! ```rust,ignore
//! let features = ApiFeatures::new(params)
//!     .search()
//!     .filter()
//!     .sort()
//!     .paginate(2);
//! let products: Vec<Product> = db.find(features.query_filter(), features.find_options()).await?;
//! ```

use bazaar_db::{Condition, Filter, FindOptions};
use serde_json::Value;

use super::Pagination;

/// Parameters that control the listing itself and never become filters.
const RESERVED: &[&str] = &["keyword", "limit", "page", "sort"];

/// Largest page size a client may request with `limit`.
pub const MAX_PER_PAGE: usize = 100;

/// Chainable query builder over request query-string pairs.
#[derive(Debug, Clone)]
pub struct ApiFeatures {
    params: Vec<(String, String)>,
    filter: Filter,
    options: FindOptions,
    page: usize,
    per_page: Option<usize>,
}

impl ApiFeatures {
    /// Start from the raw query pairs, in request order.
    pub fn new(params: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            params: params.into_iter().collect(),
            filter: Filter::new(),
            options: FindOptions::new(),
            page: 1,
            per_page: None,
        }
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive match of `keyword` against `name`.
    ///
    /// The keyword is matched literally. An empty keyword is ignored.
    pub fn search(mut self) -> Self {
        if let Some(keyword) = self.param("keyword").map(str::trim).filter(|k| !k.is_empty()) {
            let keyword = keyword.to_string();
            self.filter = self.filter.contains_ci("name", &keyword);
        }
        self
    }

    /// Every other parameter becomes a field condition.
    ///
    /// `price[gte]=100` becomes a comparison; `category=Books` equality.
    /// Unknown bracket operators are ignored.
    pub fn filter(mut self) -> Self {
        for (key, raw) in &self.params {
            let (field, op) = split_operator(key);
            if field.is_empty() || RESERVED.contains(&field) {
                continue;
            }
            let value = parse_value(raw);
            let condition = match op {
                None => Some(Condition::Eq(value)),
                Some(op @ ("gt" | "gte" | "lt" | "lte")) => Condition::from_operator(op, value),
                Some(_) => None,
            };
            if let Some(condition) = condition {
                self.filter = self.filter.with(field, condition);
            }
        }
        self
    }

    /// Sort by the comma-separated `sort` parameter (`-price,name`).
    pub fn sort(mut self) -> Self {
        if let Some(spec) = self.param("sort") {
            let spec = spec.to_string();
            self.options = self.options.sort_by(&spec);
        }
        self
    }

    /// Sort by `spec` unless the request asked for its own order.
    pub fn default_sort(mut self, spec: &str) -> Self {
        if self.options.sort.is_empty() {
            self.options = self.options.sort_by(spec);
        }
        self
    }

    /// Restrict to one page of `res_per_page` results.
    ///
    /// `page` defaults to 1. A numeric `limit` overrides the page size and is
    /// clamped to `1..=MAX_PER_PAGE`; anything else is ignored.
    pub fn paginate(mut self, res_per_page: usize) -> Self {
        let page = self
            .param("page")
            .and_then(|p| p.trim().parse::<usize>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        let per_page = self
            .param("limit")
            .and_then(|l| l.trim().parse::<usize>().ok())
            .unwrap_or(res_per_page)
            .clamp(1, MAX_PER_PAGE);

        self.page = page;
        self.per_page = Some(per_page);
        self.options = self
            .options
            .skip(per_page.saturating_mul(page - 1))
            .limit(per_page);
        self
    }

    /// Add a condition the request cannot override. Request filters on the
    /// same field only narrow the result further.
    pub fn restrict(mut self, filter: Filter) -> Self {
        self.filter = self.filter.and(filter);
        self
    }

    /// The accumulated filter.
    pub fn query_filter(&self) -> &Filter {
        &self.filter
    }

    /// Sort, skip and limit.
    pub fn find_options(&self) -> &FindOptions {
        &self.options
    }

    /// Current page (1 unless paginated).
    pub fn page(&self) -> usize {
        self.page
    }

    /// Pagination metadata for `total` matching documents.
    pub fn pagination(&self, total: usize) -> Pagination {
        Pagination::new(self.page, self.per_page.unwrap_or(total.max(1)), total)
    }
}

/// Split `price[gte]` into (`price`, Some("gte")).
fn split_operator(key: &str) -> (&str, Option<&str>) {
    match key.strip_suffix(']').and_then(|k| k.split_once('[')) {
        Some((field, op)) => (field, Some(op)),
        None => (key, None),
    }
}

/// Numbers and booleans keep their type, everything else stays a string.
fn parse_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    match trimmed {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_keyword_search_is_case_insensitive() {
        let f = ApiFeatures::new(pairs(&[("keyword", "mouse")])).search();
        assert!(f.query_filter().matches(&json!({"name": "Wireless MOUSE"})));
        assert!(!f.query_filter().matches(&json!({"name": "Keyboard"})));
    }

    #[test]
    fn test_filter_skips_reserved_params() {
        let f = ApiFeatures::new(pairs(&[
            ("keyword", "x"),
            ("page", "2"),
            ("limit", "5"),
            ("sort", "-price"),
            ("category", "Laptops"),
        ]))
        .filter();
        assert_eq!(f.query_filter().len(), 1);
        assert!(f.query_filter().matches(&json!({"category": "Laptops"})));
    }

    #[test]
    fn test_filter_range_operators() {
        let f = ApiFeatures::new(pairs(&[("price[gte]", "100"), ("price[lt]", "500")])).filter();
        assert!(f.query_filter().matches(&json!({"price": 100.0})));
        assert!(f.query_filter().matches(&json!({"price": 499.99})));
        assert!(!f.query_filter().matches(&json!({"price": 500})));
        assert!(!f.query_filter().matches(&json!({"price": 99})));
    }

    #[test]
    fn test_unknown_operator_is_ignored() {
        let f = ApiFeatures::new(pairs(&[("price[regex]", ".*")])).filter();
        assert!(f.query_filter().is_empty());
    }

    #[test]
    fn test_paginate_skips_previous_pages() {
        let f = ApiFeatures::new(pairs(&[("page", "3")])).paginate(2);
        assert_eq!(f.find_options().skip, 4);
        assert_eq!(f.find_options().limit, Some(2));
        assert_eq!(f.page(), 3);
    }

    #[test]
    fn test_paginate_invalid_page_and_limit_override() {
        let f = ApiFeatures::new(pairs(&[("page", "abc"), ("limit", "500")])).paginate(2);
        assert_eq!(f.page(), 1);
        assert_eq!(f.find_options().skip, 0);
        assert_eq!(f.find_options().limit, Some(MAX_PER_PAGE));

        let f = ApiFeatures::new(pairs(&[("page", "0"), ("limit", "0")])).paginate(2);
        assert_eq!(f.page(), 1);
        assert_eq!(f.find_options().limit, Some(1));

        let f = ApiFeatures::new(pairs(&[("limit", "-3")])).paginate(2);
        assert_eq!(f.find_options().limit, Some(2));
    }

    #[test]
    fn test_restrict_cannot_be_widened() {
        let f = ApiFeatures::new(pairs(&[("seller", "s2"), ("category", "Rugs")]))
            .filter()
            .restrict(Filter::new().eq("seller", "s1"));
        assert!(!f.query_filter().matches(&json!({"seller": "s2", "category": "Rugs"})));
        assert!(!f.query_filter().matches(&json!({"seller": "s1", "category": "Rugs"})));

        let f = ApiFeatures::new(pairs(&[("category", "Rugs")]))
            .filter()
            .restrict(Filter::new().eq("seller", "s1"));
        assert!(f.query_filter().matches(&json!({"seller": "s1", "category": "Rugs"})));
        assert!(!f.query_filter().matches(&json!({"seller": "s2", "category": "Rugs"})));
    }

    #[test]
    fn test_sort_and_default_sort() {
        let f = ApiFeatures::new(pairs(&[("sort", "-price,name")]))
            .sort()
            .default_sort("-createdAt");
        assert_eq!(f.find_options().sort.len(), 2);
        assert_eq!(f.find_options().sort[0].0, "price");

        let f = ApiFeatures::new(Vec::new()).sort().default_sort("-createdAt");
        assert_eq!(f.find_options().sort[0].0, "createdAt");
    }

    #[test]
    fn test_pagination_metadata() {
        let f = ApiFeatures::new(pairs(&[("page", "2")])).paginate(2);
        let p = f.pagination(5);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);
    }
}
