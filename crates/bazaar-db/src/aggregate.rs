//! Single-stage grouping over matched documents (`$match` + `$group`).

use serde_json::{Map, Number, Value};

use crate::document::lookup;

/// An accumulator computed over every matched document.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Number of documents.
    Count,
    /// Sum of a numeric field. Integer when every summed value is an integer.
    Sum(String),
    /// Average of a numeric field, null when no numeric values exist.
    Avg(String),
}

/// A named set of accumulators producing one output object.
#[derive(Debug, Clone, Default)]
pub struct Group {
    outputs: Vec<(String, Accumulator)>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(mut self, name: impl Into<String>) -> Self {
        self.outputs.push((name.into(), Accumulator::Count));
        self
    }

    pub fn sum(mut self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.outputs.push((name.into(), Accumulator::Sum(field.into())));
        self
    }

    pub fn avg(mut self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.outputs.push((name.into(), Accumulator::Avg(field.into())));
        self
    }

    /// Compute the group over the given documents.
    ///
    /// Returns `None` for an empty input, like an aggregation pipeline
    /// returning no rows.
    pub fn apply(&self, docs: &[&Value]) -> Option<Map<String, Value>> {
        if docs.is_empty() {
            return None;
        }

        let mut out = Map::new();
        for (name, acc) in &self.outputs {
            let value = match acc {
                Accumulator::Count => Value::from(docs.len() as u64),
                Accumulator::Sum(field) => sum(docs, field),
                Accumulator::Avg(field) => avg(docs, field),
            };
            out.insert(name.clone(), value);
        }
        Some(out)
    }
}

fn numbers<'a>(docs: &'a [&'a Value], field: &'a str) -> impl Iterator<Item = &'a Number> + 'a {
    docs.iter().filter_map(move |d| match lookup(d, field) {
        Some(Value::Number(n)) => Some(n),
        _ => None,
    })
}

fn sum(docs: &[&Value], field: &str) -> Value {
    let mut int_total: i64 = 0;
    let mut float_total = 0.0;
    let mut all_int = true;

    for n in numbers(docs, field) {
        match n.as_i64() {
            Some(i) if all_int => match int_total.checked_add(i) {
                Some(t) => int_total = t,
                None => {
                    all_int = false;
                    float_total = int_total as f64 + i as f64;
                }
            },
            _ => {
                if all_int {
                    all_int = false;
                    float_total = int_total as f64;
                }
                float_total += n.as_f64().unwrap_or(0.0);
            }
        }
    }

    if all_int {
        Value::from(int_total)
    } else {
        Number::from_f64(float_total).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn avg(docs: &[&Value], field: &str) -> Value {
    let (total, n) = numbers(docs, field)
        .filter_map(Number::as_f64)
        .fold((0.0, 0usize), |(t, n), v| (t + v, n + 1));
    if n == 0 {
        return Value::Null;
    }
    Number::from_f64(total / n as f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_over_products() {
        let docs = [
            json!({"stock": 5, "ratings": 4.0}),
            json!({"stock": 7, "ratings": 3.0}),
            json!({"stock": 3}),
        ];
        let refs: Vec<&Value> = docs.iter().collect();
        let group = Group::new()
            .count("totalProducts")
            .sum("totalStock", "stock")
            .avg("averageRating", "ratings");

        let out = group.apply(&refs).unwrap();
        assert_eq!(out["totalProducts"], json!(3));
        assert_eq!(out["totalStock"], json!(15));
        assert_eq!(out["averageRating"], json!(3.5));
    }

    #[test]
    fn test_empty_input_yields_none() {
        assert!(Group::new().count("n").apply(&[]).is_none());
    }

    #[test]
    fn test_float_sum_and_missing_avg() {
        let docs = [json!({"price": 1.5}), json!({"price": 2})];
        let refs: Vec<&Value> = docs.iter().collect();
        let out = Group::new()
            .sum("total", "price")
            .avg("missing", "nope")
            .apply(&refs)
            .unwrap();
        assert_eq!(out["total"], json!(3.5));
        assert_eq!(out["missing"], Value::Null);
    }
}
