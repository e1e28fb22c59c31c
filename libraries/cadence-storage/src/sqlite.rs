//! `SQLite`-backed record store
//!
//! Each record is a JSON document in the `records` table, keyed by table
//! name and the serialized primary key. Filters are translated to
//! `json_extract` expressions so matching, ordering, and limits run in the
//! database.

use crate::error::StorageError;
use async_trait::async_trait;
use cadence_core::{
    error::{CadenceError, Result},
    query::{Condition, Filter, Row, Table},
    RecordStore,
};
use sqlx::SqlitePool;
use tracing::{debug, warn};

/// Persistent record store over a `SQLite` pool
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

/// Positional parameter for a generated statement
enum Bind {
    Text(String),
    Int(i64),
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_key(table: Table, row: &Row) -> std::result::Result<String, StorageError> {
        let key = table.key_of(row).ok_or(StorageError::MissingKey {
            table: table.as_str(),
        })?;
        Ok(serde_json::to_string(&key)?)
    }
}

fn json_path(column: &str) -> String {
    format!("$.{column}")
}

/// Escape `LIKE` wildcards so the needle matches literally
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Append the `WHERE` clause for `table` and `filter`
fn push_where(sql: &mut String, binds: &mut Vec<Bind>, table: Table, filter: &Filter) {
    sql.push_str(" WHERE tbl = ?");
    binds.push(Bind::Text(table.as_str().to_string()));

    for condition in filter.conditions() {
        match condition {
            Condition::Eq { column, value } => {
                sql.push_str(" AND json_extract(body, ?) = json_extract(?, '$')");
                binds.push(Bind::Text(json_path(column)));
                binds.push(Bind::Text(value.to_string()));
            }
            Condition::In { column, values } => {
                if values.is_empty() {
                    sql.push_str(" AND 0");
                    continue;
                }
                sql.push_str(" AND json_extract(body, ?) IN (");
                binds.push(Bind::Text(json_path(column)));
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    sql.push_str("json_extract(?, '$')");
                    binds.push(Bind::Text(value.to_string()));
                }
                sql.push(')');
            }
            Condition::ILike { column, needle } => {
                sql.push_str(" AND lower(json_extract(body, ?)) LIKE ? ESCAPE '\\'");
                binds.push(Bind::Text(json_path(column)));
                binds.push(Bind::Text(like_pattern(needle)));
            }
        }
    }
}

fn map_write_error(table: Table, err: sqlx::Error) -> CadenceError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => CadenceError::Duplicate(format!(
            "duplicate key value violates unique constraint on {}",
            table.as_str()
        )),
        _ => StorageError::from(err).into(),
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn find(&self, table: Table, filter: &Filter) -> Result<Vec<Row>> {
        let mut sql = String::from("SELECT body FROM records");
        let mut binds = Vec::new();
        push_where(&mut sql, &mut binds, table, filter);

        if let Some(order) = filter.order() {
            sql.push_str(" ORDER BY json_extract(body, ?)");
            sql.push_str(if order.ascending { " ASC" } else { " DESC" });
            binds.push(Bind::Text(json_path(&order.column)));
        }
        if let Some(limit) = filter.max_rows() {
            sql.push_str(" LIMIT ?");
            binds.push(Bind::Int(i64::try_from(limit).unwrap_or(i64::MAX)));
        }

        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for bind in binds {
            query = match bind {
                Bind::Text(text) => query.bind(text),
                Bind::Int(n) => query.bind(n),
            };
        }

        let bodies = query
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        let mut rows = Vec::with_capacity(bodies.len());
        for body in bodies {
            match serde_json::from_str::<Row>(&body) {
                Ok(row) => rows.push(row),
                Err(e) => warn!(table = table.as_str(), error = %e, "Skipping corrupt row"),
            }
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Row) -> Result<()> {
        let key = Self::row_key(table, &row)?;
        let body = serde_json::to_string(&row)?;

        sqlx::query("INSERT INTO records (tbl, row_key, body) VALUES (?, ?, ?)")
            .bind(table.as_str())
            .bind(key)
            .bind(body)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(table, e))?;

        debug!(table = table.as_str(), "Inserted row");
        Ok(())
    }

    async fn upsert(&self, table: Table, row: Row) -> Result<()> {
        let key = Self::row_key(table, &row)?;
        let body = serde_json::to_string(&row)?;

        sqlx::query(
            "INSERT INTO records (tbl, row_key, body) VALUES (?, ?, ?)
             ON CONFLICT(tbl, row_key) DO UPDATE SET body = excluded.body",
        )
        .bind(table.as_str())
        .bind(key)
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(table, e))?;

        Ok(())
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<usize> {
        let mut sql = String::from("DELETE FROM records");
        let mut binds = Vec::new();
        push_where(&mut sql, &mut binds, table, filter);

        let mut query = sqlx::query(&sql);
        for bind in binds {
            query = match bind {
                Bind::Text(text) => query.bind(text),
                Bind::Int(n) => query.bind(n),
            };
        }

        let result = query
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        let removed = usize::try_from(result.rows_affected()).unwrap_or(usize::MAX);
        debug!(table = table.as_str(), removed, "Deleted rows");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("A_b"), "%a\\_b%");
        assert_eq!(like_pattern(""), "%%");
    }

    #[test]
    fn where_clause_binds_in_order() {
        let filter = Filter::new().eq("user_id", "u1").in_list("id", ["a", "b"]);
        let mut sql = String::new();
        let mut binds = Vec::new();
        push_where(&mut sql, &mut binds, Table::Songs, &filter);

        assert_eq!(
            sql,
            " WHERE tbl = ? AND json_extract(body, ?) = json_extract(?, '$') \
             AND json_extract(body, ?) IN (json_extract(?, '$'), json_extract(?, '$'))"
        );
        assert_eq!(binds.len(), 6);
        assert!(matches!(&binds[2], Bind::Text(v) if v == "\"u1\""));
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let filter = Filter::new().in_list::<&str>("id", []);
        let mut sql = String::new();
        let mut binds = Vec::new();
        push_where(&mut sql, &mut binds, Table::Songs, &filter);
        assert!(sql.ends_with(" AND 0"));
        assert_eq!(binds.len(), 1);
    }
}
