//! Record store query model
//!
//! Rows are JSON objects. A `Filter` is a conjunction of conditions plus an
//! optional ordering and limit; stores either translate it (SQL) or evaluate
//! it directly with [`Filter::apply`].

use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// A single record: column name to JSON value
pub type Row = serde_json::Map<String, Value>;

/// Tables known to the record store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Songs,
    LikedSongs,
    Users,
    Subscriptions,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Table::Songs,
        Table::LikedSongs,
        Table::Users,
        Table::Subscriptions,
    ];

    /// Table name
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Songs => "songs",
            Table::LikedSongs => "liked_songs",
            Table::Users => "users",
            Table::Subscriptions => "subscriptions",
        }
    }

    /// Columns forming the primary key
    pub fn key_columns(self) -> &'static [&'static str] {
        match self {
            Table::LikedSongs => &["user_id", "song_id"],
            Table::Songs | Table::Users | Table::Subscriptions => &["id"],
        }
    }

    /// Primary key of `row`, or `None` if a key column is missing
    pub fn key_of(self, row: &Row) -> Option<Vec<Value>> {
        self.key_columns()
            .iter()
            .map(|column| row.get(*column).cloned())
            .collect()
    }
}

/// A single filter condition
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = value`
    Eq { column: String, value: Value },
    /// `column IN (values)`
    In { column: String, values: Vec<Value> },
    /// Case-insensitive substring match (`column ILIKE '%needle%'`)
    ILike { column: String, needle: String },
}

impl Condition {
    fn matches(&self, row: &Row) -> bool {
        match self {
            Condition::Eq { column, value } => row.get(column) == Some(value),
            Condition::In { column, values } => {
                row.get(column).is_some_and(|v| values.contains(v))
            }
            Condition::ILike { column, needle } => match row.get(column) {
                Some(Value::String(s)) => s.to_lowercase().contains(&needle.to_lowercase()),
                _ => false,
            },
        }
    }
}

/// Sort order for query results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Conjunctive filter with optional ordering and limit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
    order: Option<Order>,
    limit: Option<usize>,
}

impl Filter {
    /// Filter matching every row
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `column == value`
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Require `column` to be one of `values`
    #[must_use]
    pub fn in_list<V: Into<Value>>(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.conditions.push(Condition::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Require `column` to contain `needle`, ignoring case
    #[must_use]
    pub fn ilike(mut self, column: impl Into<String>, needle: impl Into<String>) -> Self {
        self.conditions.push(Condition::ILike {
            column: column.into(),
            needle: needle.into(),
        });
        self
    }

    /// Order results by `column`
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    /// Return at most `limit` rows
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    pub fn max_rows(&self) -> Option<usize> {
        self.limit
    }

    /// Whether `row` satisfies every condition
    pub fn matches(&self, row: &Row) -> bool {
        self.conditions.iter().all(|c| c.matches(row))
    }

    /// Evaluate the filter over an in-memory row set
    pub fn apply<'a>(&self, rows: impl IntoIterator<Item = &'a Row>) -> Vec<Row> {
        let mut selected: Vec<Row> = rows
            .into_iter()
            .filter(|row| self.matches(row))
            .cloned()
            .collect();

        if let Some(order) = &self.order {
            selected.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }

        selected
    }
}

/// Total order over optional JSON scalars: missing/null first, then numbers,
/// then strings. Mixed kinds compare equal.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Serialize a typed record into a row
pub fn encode<T: Serialize>(record: &T) -> Result<Row> {
    match serde_json::to_value(record)? {
        Value::Object(row) => Ok(row),
        other => Err(crate::CadenceError::invalid_input(format!(
            "record must serialize to an object, got {other}"
        ))),
    }
}

/// Deserialize a row into a typed record
pub fn decode<T: DeserializeOwned>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn songs() -> Vec<Row> {
        vec![
            row(json!({"id": "1", "title": "Blue Monday", "created_at": "2024-01-01T00:00:00Z"})),
            row(json!({"id": "2", "title": "Kind of Blue", "created_at": "2024-03-01T00:00:00Z"})),
            row(json!({"id": "3", "title": "Yellow", "created_at": "2024-02-01T00:00:00Z"})),
        ]
    }

    #[test]
    fn ilike_is_case_insensitive_substring() {
        let rows = songs();
        let result = Filter::new().ilike("title", "BLUE").apply(&rows);
        let ids: Vec<_> = result.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("1"), json!("2")]);
    }

    #[test]
    fn order_descending_and_limit() {
        let rows = songs();
        let result = Filter::new()
            .order_by("created_at", false)
            .limit(2)
            .apply(&rows);
        let ids: Vec<_> = result.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("2"), json!("3")]);
    }

    #[test]
    fn eq_and_in_list_combine_as_conjunction() {
        let rows = songs();
        let result = Filter::new()
            .in_list("id", ["1", "3"])
            .eq("title", "Yellow")
            .apply(&rows);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0]["id"], json!("3"));
    }

    #[test]
    fn missing_column_never_matches() {
        let rows = songs();
        assert!(Filter::new().eq("author", "x").apply(&rows).is_empty());
        assert!(Filter::new().ilike("author", "").apply(&rows).is_empty());
    }

    #[test]
    fn liked_songs_key_spans_two_columns() {
        let r = row(json!({"user_id": "u", "song_id": "s", "created_at": "t"}));
        assert_eq!(
            Table::LikedSongs.key_of(&r),
            Some(vec![json!("u"), json!("s")])
        );
        assert_eq!(Table::Songs.key_of(&r), None);
    }
}
