//! Document queries.
//!
//! [`QueryBuilder`] assembles a [`DocumentQuery`], which serializes to the
//! request JSON the native core expects:
//!
//! ```json
//! {"where":{"age":{"$gt":18}},"orderBy":[{"field":"age","direction":"desc"}],"limit":10}
//! ```

use crate::error::{SdkError, SdkResult};
use platsdk_value::{to_json, Value, ValueMap};
use serde::Serialize;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// One sort clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderClause {
    /// Field to sort by.
    pub field: String,
    /// Direction.
    pub direction: Direction,
}

/// Pagination cursor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Cursor {
    /// Start at this position, inclusive.
    StartAt(Value),
    /// Start after this position, exclusive.
    StartAfter(Value),
}

/// A built query. Immutable; create one with [`QueryBuilder`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentQuery {
    #[serde(rename = "where", skip_serializing_if = "ValueMap::is_empty")]
    filters: ValueMap,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    order_by: Vec<OrderClause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(flatten)]
    cursor: Option<Cursor>,
}

impl DocumentQuery {
    /// Filters keyed by field. Values are literals or `{"$op": v}`
    /// expressions.
    pub fn filters(&self) -> &ValueMap {
        &self.filters
    }

    /// Sort clauses in priority order.
    pub fn order_by(&self) -> &[OrderClause] {
        &self.order_by
    }

    /// Result cap.
    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    /// Pagination cursor.
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Serializes the query to request JSON.
    pub fn to_json(&self) -> SdkResult<String> {
        let context = "failed to serialize query";
        // Rejects non-finite numbers, which serde_json would write as null.
        for value in self.filters.values() {
            to_json(value).map_err(|e| SdkError::value(context, e))?;
        }
        if let Some(Cursor::StartAt(v) | Cursor::StartAfter(v)) = &self.cursor {
            to_json(v).map_err(|e| SdkError::value(context, e))?;
        }
        serde_json::to_string(self).map_err(|e| SdkError::serialization(context, e.to_string()))
    }
}

/// Fluent builder for [`DocumentQuery`].
///
/// A field holds one filter at a time; setting another filter on the same
/// field replaces it. Of `start_at` and `start_after`, the later call wins.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: DocumentQuery,
}

impl QueryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    fn filter(mut self, field: impl Into<String>, value: Value) -> Self {
        self.query.filters.insert(field.into(), value);
        self
    }

    fn operator(self, field: impl Into<String>, op: &str, value: Value) -> Self {
        let expr: Value = [(op, value)].into_iter().collect();
        self.filter(field, expr)
    }

    /// Equality filter.
    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, value.into())
    }

    /// Membership filter (`$in`).
    pub fn where_in<V: Into<Value>>(self, field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        let values = Value::Array(values.into_iter().map(Into::into).collect());
        self.operator(field, "$in", values)
    }

    /// Greater-than filter (`$gt`).
    pub fn where_gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operator(field, "$gt", value.into())
    }

    /// Greater-or-equal filter (`$gte`).
    pub fn where_gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operator(field, "$gte", value.into())
    }

    /// Less-than filter (`$lt`).
    pub fn where_lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operator(field, "$lt", value.into())
    }

    /// Less-or-equal filter (`$lte`).
    pub fn where_lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operator(field, "$lte", value.into())
    }

    /// Prefix filter (`$startsWith`).
    pub fn where_starts_with(self, field: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.operator(field, "$startsWith", Value::Text(prefix.into()))
    }

    /// Appends a sort clause.
    pub fn order_by(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.query.order_by.push(OrderClause {
            field: field.into(),
            direction: if ascending { Direction::Asc } else { Direction::Desc },
        });
        self
    }

    /// Caps the number of results.
    pub fn limit(mut self, limit: u32) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Starts at a document ID or offset, inclusive.
    pub fn start_at(mut self, position: impl Into<Value>) -> Self {
        self.query.cursor = Some(Cursor::StartAt(position.into()));
        self
    }

    /// Starts after a document ID or offset, exclusive.
    pub fn start_after(mut self, position: impl Into<Value>) -> Self {
        self.query.cursor = Some(Cursor::StartAfter(position.into()));
        self
    }

    /// Finishes the query.
    pub fn build(self) -> DocumentQuery {
        self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platsdk_value::from_json;

    #[test]
    fn filters_limit_and_empty_order() {
        let query = QueryBuilder::new()
            .where_eq("x", 1)
            .where_gt("y", 2)
            .limit(5)
            .build();

        assert_eq!(query.filters().len(), 2);
        assert_eq!(query.filters()["x"], Value::Integer(1));
        assert_eq!(
            query.filters()["y"],
            from_json(r#"{"$gt":2}"#).unwrap()
        );
        assert_eq!(query.limit(), Some(5));
        assert!(query.order_by().is_empty());
        assert_eq!(
            query.to_json().unwrap(),
            r#"{"where":{"x":1,"y":{"$gt":2}},"limit":5}"#
        );
    }

    #[test]
    fn last_filter_on_a_field_wins() {
        let query = QueryBuilder::new()
            .where_gt("age", 18)
            .where_lt("age", 65)
            .build();
        assert_eq!(query.filters().len(), 1);
        assert_eq!(query.filters()["age"], from_json(r#"{"$lt":65}"#).unwrap());
    }

    #[test]
    fn order_by_appends_in_call_order() {
        let query = QueryBuilder::new()
            .order_by("age", false)
            .order_by("name", true)
            .build();
        assert_eq!(
            query.order_by(),
            &[
                OrderClause {
                    field: "age".into(),
                    direction: Direction::Desc,
                },
                OrderClause {
                    field: "name".into(),
                    direction: Direction::Asc,
                },
            ]
        );
        assert_eq!(
            query.to_json().unwrap(),
            r#"{"orderBy":[{"field":"age","direction":"desc"},{"field":"name","direction":"asc"}]}"#
        );
    }

    #[test]
    fn in_and_starts_with_expressions() {
        let query = QueryBuilder::new()
            .where_in("status", ["open", "closed"])
            .where_starts_with("name", "Al")
            .build();
        assert_eq!(
            query.to_json().unwrap(),
            r#"{"where":{"name":{"$startsWith":"Al"},"status":{"$in":["open","closed"]}}}"#
        );
    }

    #[test]
    fn later_cursor_wins() {
        let query = QueryBuilder::new().start_at(10).start_after("abc").build();
        assert_eq!(query.cursor(), Some(&Cursor::StartAfter(Value::from("abc"))));
        assert_eq!(query.to_json().unwrap(), r#"{"startAfter":"abc"}"#);

        let query = QueryBuilder::new().start_after(1).start_at(2).build();
        assert_eq!(query.to_json().unwrap(), r#"{"startAt":2}"#);
    }

    #[test]
    fn empty_query_is_empty_object() {
        assert_eq!(QueryBuilder::new().build().to_json().unwrap(), "{}");
    }

    #[test]
    fn non_finite_filter_is_rejected() {
        let query = QueryBuilder::new().where_gt("score", f64::NAN).build();
        assert!(query.to_json().is_err());
    }
}
