//! Query evaluation for the mock core.

use super::state::Failure;
use platsdk_value::{from_json, get_at_path, Value, ValueMap};
use std::cmp::Ordering;

/// Largest page the mock serves, matching the platform limit.
pub(super) const MAX_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Eq(Value),
    In(Vec<Value>),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    StartsWith(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Start {
    At(Value),
    After(Value),
}

/// A parsed query request.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Query {
    filters: Vec<(String, Condition)>,
    order: Vec<(String, bool)>,
    limit: usize,
    start: Option<Start>,
}

/// One page of results.
#[derive(Debug)]
pub(super) struct Page {
    pub documents: Vec<ValueMap>,
    pub total_count: usize,
}

fn invalid(message: impl Into<String>) -> Failure {
    Failure::invalid(message)
}

fn parse_condition(field: &str, value: Value) -> Result<Condition, Failure> {
    let Value::Map(expr) = &value else {
        return Ok(Condition::Eq(value));
    };
    let mut ops = expr.iter().filter(|(k, _)| k.starts_with('$'));
    let Some((op, operand)) = ops.next() else {
        return Ok(Condition::Eq(value));
    };
    if expr.len() != 1 {
        return Err(invalid(format!("filter on '{field}' must have exactly one operator")));
    }
    let operand = operand.clone();
    match op.as_str() {
        "$in" => match operand {
            Value::Array(items) => Ok(Condition::In(items)),
            _ => Err(invalid(format!("$in on '{field}' requires an array"))),
        },
        "$gt" => Ok(Condition::Gt(operand)),
        "$gte" => Ok(Condition::Gte(operand)),
        "$lt" => Ok(Condition::Lt(operand)),
        "$lte" => Ok(Condition::Lte(operand)),
        "$startsWith" => match operand {
            Value::Text(prefix) => Ok(Condition::StartsWith(prefix)),
            _ => Err(invalid(format!("$startsWith on '{field}' requires a string"))),
        },
        other => Err(invalid(format!("unsupported operator {other} on '{field}'"))),
    }
}

fn parse_order(value: &Value) -> Result<Vec<(String, bool)>, Failure> {
    let clauses = value
        .as_array()
        .ok_or_else(|| invalid("orderBy must be an array"))?;
    clauses
        .iter()
        .map(|clause| {
            let field = clause
                .get("field")
                .and_then(Value::as_text)
                .filter(|f| !f.is_empty())
                .ok_or_else(|| invalid("order clause requires a field"))?;
            let ascending = match clause.get("direction").and_then(Value::as_text) {
                None | Some("asc") => true,
                Some("desc") => false,
                Some(other) => return Err(invalid(format!("unknown sort direction '{other}'"))),
            };
            Ok((field.to_string(), ascending))
        })
        .collect()
}

/// Parses request JSON.
pub(super) fn parse(text: &str) -> Result<Query, Failure> {
    let root = from_json(text).map_err(|e| Failure::serialization(e.to_string()))?;
    let Value::Map(mut root) = root else {
        return Err(invalid("query must be an object"));
    };

    let filters = match root.remove("where") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Map(filters)) => filters
            .into_iter()
            .map(|(field, value)| parse_condition(&field, value).map(|c| (field, c)))
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(invalid("where must be an object")),
    };
    let order = match root.get("orderBy") {
        Some(value) => parse_order(value)?,
        None => Vec::new(),
    };
    let limit = match root.get("limit") {
        None => MAX_LIMIT,
        Some(value) => match value.as_integer() {
            Some(0) => MAX_LIMIT,
            Some(n) if n > 0 && (n as usize) <= MAX_LIMIT => n as usize,
            _ => return Err(invalid(format!("limit must be between 1 and {MAX_LIMIT}"))),
        },
    };
    let start = match (root.remove("startAt"), root.remove("startAfter")) {
        (_, Some(after)) => Some(Start::After(after)),
        (Some(at), None) => Some(Start::At(at)),
        (None, None) => None,
    };

    Ok(Query {
        filters,
        order,
        limit,
        start,
    })
}

/// Numbers compare by value whatever their representation, numeric text
/// included.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn equal(a: &Value, b: &Value) -> bool {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn matches(doc: &ValueMap, field: &str, condition: &Condition) -> bool {
    let Some(value) = get_at_path(doc, field) else {
        return false;
    };
    match condition {
        Condition::Eq(expected) => equal(value, expected),
        Condition::In(options) => options.iter().any(|o| equal(value, o)),
        Condition::Gt(bound) => compare(value, bound) == Some(Ordering::Greater),
        Condition::Gte(bound) => matches!(compare(value, bound), Some(Ordering::Greater | Ordering::Equal)),
        Condition::Lt(bound) => compare(value, bound) == Some(Ordering::Less),
        Condition::Lte(bound) => matches!(compare(value, bound), Some(Ordering::Less | Ordering::Equal)),
        Condition::StartsWith(prefix) => value.as_text().is_some_and(|s| s.starts_with(prefix.as_str())),
    }
}

fn order_docs(a: &ValueMap, b: &ValueMap, order: &[(String, bool)]) -> Ordering {
    for (field, ascending) in order {
        let ord = match (get_at_path(a, field), get_at_path(b, field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
        };
        let ord = if *ascending { ord } else { ord.reverse() };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn start_index(docs: &[ValueMap], position: &Value) -> Result<usize, Failure> {
    match position {
        Value::Text(id) => docs
            .iter()
            .position(|d| d.get("$id").and_then(Value::as_text) == Some(id.as_str()))
            .ok_or_else(|| invalid(format!("start document {id} not found"))),
        other => match other.as_integer() {
            Some(n) if n >= 0 => Ok(n as usize),
            _ => Err(invalid("start position must be a document ID or a non-negative offset")),
        },
    }
}

/// Filters, sorts and paginates `docs`.
pub(super) fn run(query: &Query, docs: Vec<ValueMap>) -> Result<Page, Failure> {
    let mut matched: Vec<ValueMap> = docs
        .into_iter()
        .filter(|doc| query.filters.iter().all(|(f, c)| matches(doc, f, c)))
        .collect();

    let default_order = [("$id".to_string(), true)];
    let order: &[(String, bool)] = if query.order.is_empty() {
        &default_order
    } else {
        &query.order
    };
    matched.sort_by(|a, b| order_docs(a, b, order));

    let total_count = matched.len();
    let skip = match &query.start {
        None => 0,
        Some(Start::At(position)) => start_index(&matched, position)?,
        Some(Start::After(position)) => start_index(&matched, position)? + 1,
    };
    let documents = matched.into_iter().skip(skip).take(query.limit).collect();

    Ok(Page {
        documents,
        total_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use platsdk_value::map_from_json;

    fn docs() -> Vec<ValueMap> {
        [
            r#"{"$id":"a1","name":"Alice","age":30,"city":{"name":"Oslo"}}"#,
            r#"{"$id":"b2","name":"Bob","age":25.0,"city":{"name":"Bergen"}}"#,
            r#"{"$id":"c3","name":"Alfred","age":"41","city":{"name":"Oslo"}}"#,
            r#"{"$id":"d4","name":"Dora","age":19}"#,
        ]
        .iter()
        .map(|s| map_from_json(s).unwrap())
        .collect()
    }

    fn ids(page: &Page) -> Vec<&str> {
        page.documents
            .iter()
            .map(|d| d.get("$id").and_then(Value::as_text).unwrap())
            .collect()
    }

    #[test]
    fn equality_and_nested_fields() {
        let q = parse(r#"{"where":{"city.name":"Oslo"}}"#).unwrap();
        let page = run(&q, docs()).unwrap();
        assert_eq!(ids(&page), vec!["a1", "c3"]);
        assert_eq!(page.total_count, 2);
    }

    #[test]
    fn numeric_comparison_normalizes_representations() {
        let q = parse(r#"{"where":{"age":{"$gte":25}},"orderBy":[{"field":"age","direction":"asc"}]}"#).unwrap();
        let page = run(&q, docs()).unwrap();
        assert_eq!(ids(&page), vec!["b2", "a1", "c3"]);
    }

    #[test]
    fn numeric_text_matches_numeric_literals() {
        let q = parse(r#"{"where":{"age":41}}"#).unwrap();
        assert_eq!(ids(&run(&q, docs()).unwrap()), vec!["c3"]);

        let q = parse(r#"{"where":{"age":"25"}}"#).unwrap();
        assert_eq!(ids(&run(&q, docs()).unwrap()), vec!["b2"]);

        let q = parse(r#"{"where":{"age":{"$in":[41.0,19]}}}"#).unwrap();
        assert_eq!(ids(&run(&q, docs()).unwrap()), vec!["c3", "d4"]);

        let q = parse(r#"{"where":{"age":{"$lt":"30"}}}"#).unwrap();
        assert_eq!(ids(&run(&q, docs()).unwrap()), vec!["b2", "d4"]);
    }

    #[test]
    fn in_and_starts_with() {
        let q = parse(r#"{"where":{"name":{"$startsWith":"Al"}}}"#).unwrap();
        assert_eq!(ids(&run(&q, docs()).unwrap()), vec!["a1", "c3"]);

        let q = parse(r#"{"where":{"age":{"$in":[19,30]}}}"#).unwrap();
        assert_eq!(ids(&run(&q, docs()).unwrap()), vec!["a1", "d4"]);
    }

    #[test]
    fn cursors_and_limit() {
        let q = parse(r#"{"limit":2,"startAfter":"a1"}"#).unwrap();
        assert_eq!(ids(&run(&q, docs()).unwrap()), vec!["b2", "c3"]);

        let q = parse(r#"{"startAt":"c3"}"#).unwrap();
        assert_eq!(ids(&run(&q, docs()).unwrap()), vec!["c3", "d4"]);

        let q = parse(r#"{"startAt":3}"#).unwrap();
        assert_eq!(ids(&run(&q, docs()).unwrap()), vec!["d4"]);

        let q = parse(r#"{"startAt":"zz"}"#).unwrap();
        assert!(run(&q, docs()).is_err());
    }

    #[test]
    fn rejects_bad_requests() {
        assert!(parse("[]").is_err());
        assert!(parse(r#"{"where":{"a":{"$near":1}}}"#).is_err());
        assert!(parse(r#"{"where":{"a":{"$in":1}}}"#).is_err());
        assert!(parse(r#"{"limit":101}"#).is_err());
        assert!(parse(r#"{"orderBy":[{"field":"a","direction":"up"}]}"#).is_err());
        assert!(parse("{").is_err());
    }

    #[test]
    fn plain_object_is_equality() {
        let q = parse(r#"{"where":{"city":{"name":"Bergen"}}}"#).unwrap();
        assert_eq!(ids(&run(&q, docs()).unwrap()), vec!["b2"]);
    }
}
