//! Raw query result model.
//!
//! `QueryResult` is the untyped form of a result set: ordered column
//! metadata plus one name-to-value mapping per row. The diagnostic catalog
//! shapes these into fixed record types before anything reaches the
//! protocol boundary.

use crate::database::types::SqlValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single row of query results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultRow {
    /// Column values indexed by column name.
    #[serde(flatten)]
    columns: HashMap<String, SqlValue>,
}

impl ResultRow {
    /// Create an empty result row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by column name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }

    /// Insert a value.
    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.insert(column.into(), value);
    }
}

/// Information about a result column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,

    /// SQL type name.
    pub sql_type: String,
}

/// Result of a query execution.
///
/// Invariant: every row carries exactly the columns listed in `columns`,
/// in the order the server declared them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column metadata in declaration order.
    pub columns: Vec<ColumnInfo>,

    /// Result rows.
    pub rows: Vec<ResultRow>,

    /// Execution time in milliseconds.
    pub execution_time_ms: u64,

    /// Whether results were truncated by the row limit.
    pub truncated: bool,
}

impl QueryResult {
    /// Create an empty query result.
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            execution_time_ms: 0,
            truncated: false,
        }
    }

    /// Names of the declared columns, in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_lookup() {
        let mut row = ResultRow::new();
        row.insert("id", SqlValue::I32(1));
        row.insert("name", SqlValue::String("master".to_string()));

        assert_eq!(row.get("id"), Some(&SqlValue::I32(1)));
        assert_eq!(
            row.get("name"),
            Some(&SqlValue::String("master".to_string()))
        );
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn empty_result() {
        let result = QueryResult::empty();
        assert!(result.columns.is_empty());
        assert!(result.rows.is_empty());
        assert!(!result.truncated);
    }

    #[test]
    fn column_names_preserve_order() {
        let mut result = QueryResult::empty();
        result.columns = vec![
            ColumnInfo {
                name: "b".to_string(),
                sql_type: "INT".to_string(),
            },
            ColumnInfo {
                name: "a".to_string(),
                sql_type: "NVARCHAR".to_string(),
            },
        ];
        let names: Vec<&str> = result.column_names().collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
