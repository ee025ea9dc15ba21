//! Query result models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result of executing a synthesized SQL statement.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryResult {
    /// Column information.
    pub columns: Vec<ColumnInfo>,

    /// Row data (each row is a vector of JSON values).
    pub rows: Vec<Vec<serde_json::Value>>,

    /// Number of rows returned.
    #[serde(default)]
    pub row_count: usize,

    /// Number of rows affected (for INSERT/UPDATE/DELETE).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<u64>,

    /// Query execution time in milliseconds.
    #[serde(default)]
    pub execution_time_ms: u64,
}

/// Column information in a query result.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,

    /// Column data type.
    pub data_type: String,
}

impl QueryResult {
    /// Creates a query result with affected rows count (for non-SELECT statements).
    pub fn affected(affected: u64, execution_time_ms: u64) -> Self {
        Self {
            columns: vec![],
            rows: vec![],
            row_count: 0,
            affected_rows: Some(affected),
            execution_time_ms,
        }
    }

    /// Renders the result as plain text for the narrator prompt.
    ///
    /// Format: a header line of column names, then one tuple per row.
    /// Non-SELECT statements render as an affected-rows note.
    pub fn render_text(&self) -> String {
        if let Some(affected) = self.affected_rows {
            return format!("{} row(s) affected", affected);
        }
        let header = self
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let mut out = format!("({})\n", header);
        for row in &self.rows {
            let cells = row
                .iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            out.push('(');
            out.push_str(&cells);
            out.push_str(")\n");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_text_lists_rows_as_tuples() {
        let result = QueryResult {
            columns: vec![
                ColumnInfo { name: "Name".into(), data_type: "TEXT".into() },
                ColumnInfo { name: "Tracks".into(), data_type: "INTEGER".into() },
            ],
            rows: vec![
                vec![json!("AC/DC"), json!(18)],
                vec![json!("Aerosmith"), json!(15)],
            ],
            row_count: 2,
            affected_rows: None,
            execution_time_ms: 3,
        };
        let text = result.render_text();
        assert!(text.starts_with("(Name, Tracks)"));
        assert!(text.contains("(AC/DC, 18)"));
        assert!(text.contains("(Aerosmith, 15)"));
    }

    #[test]
    fn render_text_for_modification_reports_affected_rows() {
        let result = QueryResult::affected(4, 1);
        assert_eq!(result.render_text(), "4 row(s) affected");
    }
}
