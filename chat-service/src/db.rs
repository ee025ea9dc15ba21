//! Database connection manager.
//!
//! Builds a connection pool from user-supplied credentials and exposes the
//! two operations the chat pipeline needs: schema introspection and query
//! execution. Pools are owned by sessions; reconnecting replaces the pool
//! rather than mutating it.

use std::time::{Duration, Instant};

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::connection::{ConnectRequest, DbType};
use common::models::query::{ColumnInfo, QueryResult};
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo};
use sqlx::{MySqlPool, PgPool, SqlitePool};

/// Connection pool wrapper for the supported engines.
#[derive(Clone, Debug)]
pub enum DatabasePool {
    /// MySQL connection pool.
    MySQL(MySqlPool),
    /// PostgreSQL connection pool.
    Postgres(PgPool),
    /// SQLite connection pool.
    SQLite(SqlitePool),
}

impl DatabasePool {
    /// Opens a connection pool from the given credentials.
    ///
    /// No retry is performed: an unreachable host, failed authentication or
    /// a missing database is surfaced to the caller as `DatabaseConnection`.
    pub async fn connect(req: &ConnectRequest, config: &AppConfig) -> AppResult<Self> {
        let timeout = Duration::from_secs(config.connect_timeout_secs);

        match req.db_type {
            DbType::MySQL => {
                let url = build_mysql_url(req)?;
                let pool = MySqlPoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(timeout)
                    .connect(&url)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                Ok(DatabasePool::MySQL(pool))
            }
            DbType::Postgres => {
                let url = build_postgres_url(req)?;
                let pool = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(timeout)
                    .connect(&url)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                Ok(DatabasePool::Postgres(pool))
            }
            DbType::SQLite => {
                let url = build_sqlite_url(req);
                let pool = sqlite_pool_options()
                    .connect(&url)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                Ok(DatabasePool::SQLite(pool))
            }
        }
    }

    /// Returns a textual enumeration of tables and columns.
    ///
    /// Side-effect-free; queries live metadata each call so the description
    /// always reflects the current schema.
    pub async fn describe_schema(&self) -> AppResult<String> {
        match self {
            DatabasePool::MySQL(pool) => {
                let rows = sqlx::query(
                    "SELECT TABLE_NAME AS table_name, COLUMN_NAME AS column_name, COLUMN_TYPE AS column_type
                     FROM information_schema.COLUMNS
                     WHERE TABLE_SCHEMA = DATABASE()
                     ORDER BY TABLE_NAME, ORDINAL_POSITION",
                )
                .fetch_all(pool)
                .await
                .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;

                let triples = rows.iter().map(|row| {
                    (
                        row.try_get::<String, _>("table_name").unwrap_or_default(),
                        row.try_get::<String, _>("column_name").unwrap_or_default(),
                        row.try_get::<String, _>("column_type").unwrap_or_default(),
                    )
                });
                Ok(format_table_columns(triples))
            }
            DatabasePool::Postgres(pool) => {
                let rows = sqlx::query(
                    "SELECT table_name, column_name, data_type
                     FROM information_schema.columns
                     WHERE table_schema = 'public'
                     ORDER BY table_name, ordinal_position",
                )
                .fetch_all(pool)
                .await
                .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;

                let triples = rows.iter().map(|row| {
                    (
                        row.try_get::<String, _>("table_name").unwrap_or_default(),
                        row.try_get::<String, _>("column_name").unwrap_or_default(),
                        row.try_get::<String, _>("data_type").unwrap_or_default(),
                    )
                });
                Ok(format_table_columns(triples))
            }
            DatabasePool::SQLite(pool) => {
                // sqlite_master already stores the CREATE TABLE text.
                let rows = sqlx::query(
                    "SELECT sql FROM sqlite_master
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                     ORDER BY name",
                )
                .fetch_all(pool)
                .await
                .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;

                let ddl: Vec<String> = rows
                    .iter()
                    .filter_map(|row| row.try_get::<Option<String>, _>("sql").ok().flatten())
                    .collect();
                Ok(ddl.join("\n"))
            }
        }
    }

    /// Runs the given SQL verbatim and returns its result.
    ///
    /// The statement comes straight from the model; no sanitization or
    /// dry-run validation happens here, so malformed SQL surfaces as
    /// `DatabaseQuery` at execution time.
    pub async fn execute(&self, sql: &str) -> AppResult<QueryResult> {
        let start = Instant::now();

        if !returns_rows(sql) {
            let affected = match self {
                DatabasePool::MySQL(pool) => sqlx::query(sql)
                    .execute(pool)
                    .await
                    .map_err(|e| AppError::DatabaseQuery(e.to_string()))?
                    .rows_affected(),
                DatabasePool::Postgres(pool) => sqlx::query(sql)
                    .execute(pool)
                    .await
                    .map_err(|e| AppError::DatabaseQuery(e.to_string()))?
                    .rows_affected(),
                DatabasePool::SQLite(pool) => sqlx::query(sql)
                    .execute(pool)
                    .await
                    .map_err(|e| AppError::DatabaseQuery(e.to_string()))?
                    .rows_affected(),
            };
            return Ok(QueryResult::affected(affected, start.elapsed().as_millis() as u64));
        }

        let (columns, rows) = match self {
            DatabasePool::MySQL(pool) => {
                let rows = sqlx::query(sql)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
                collect_rows(&rows, mysql_value)
            }
            DatabasePool::Postgres(pool) => {
                let rows = sqlx::query(sql)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
                collect_rows(&rows, postgres_value)
            }
            DatabasePool::SQLite(pool) => {
                let rows = sqlx::query(sql)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
                collect_rows(&rows, sqlite_value)
            }
        };

        let row_count = rows.len();
        Ok(QueryResult {
            columns,
            rows,
            row_count,
            affected_rows: None,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Whether the statement produces a row set (rather than an affected count).
fn returns_rows(sql: &str) -> bool {
    let head = sql.trim_start().to_uppercase();
    ["SELECT", "WITH", "SHOW", "PRAGMA", "EXPLAIN", "DESCRIBE"]
        .iter()
        .any(|kw| head.starts_with(kw))
}

/// Formats (table, column, type) triples as one line per table:
/// `Artist(ArtistId int, Name varchar(120))`.
fn format_table_columns(triples: impl Iterator<Item = (String, String, String)>) -> String {
    let mut out = String::new();
    let mut current: Option<String> = None;
    let mut first_col = true;

    for (table, column, data_type) in triples {
        if current.as_deref() != Some(table.as_str()) {
            if current.is_some() {
                out.push_str(")\n");
            }
            out.push_str(&table);
            out.push('(');
            current = Some(table);
            first_col = true;
        }
        if !first_col {
            out.push_str(", ");
        }
        out.push_str(&column);
        out.push(' ');
        out.push_str(&data_type);
        first_col = false;
    }
    if current.is_some() {
        out.push_str(")\n");
    }
    out
}

// ============== URL Builders ==============

fn build_mysql_url(req: &ConnectRequest) -> AppResult<String> {
    let host = req
        .host
        .as_deref()
        .ok_or_else(|| AppError::Validation("MySQL requires host".into()))?;
    let port = req.port.unwrap_or(3306);
    let username = req.username.as_deref().unwrap_or("root");
    let password = req.password.as_deref().unwrap_or("");

    Ok(format!(
        "mysql://{}:{}@{}:{}/{}",
        username, password, host, port, req.database
    ))
}

fn build_postgres_url(req: &ConnectRequest) -> AppResult<String> {
    let host = req
        .host
        .as_deref()
        .ok_or_else(|| AppError::Validation("PostgreSQL requires host".into()))?;
    let port = req.port.unwrap_or(5432);
    let username = req.username.as_deref().unwrap_or("postgres");
    let password = req.password.as_deref().unwrap_or("");

    Ok(format!(
        "postgres://{}:{}@{}:{}/{}",
        username, password, host, port, req.database
    ))
}

/// Pool options for SQLite connections.
///
/// An in-memory database lives and dies with its connection, so the pool is
/// pinned to a single connection that the reaper must never recycle: idle
/// timeout and max lifetime are disabled and the connection is kept warm.
fn sqlite_pool_options() -> SqlitePoolOptions {
    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
}

fn build_sqlite_url(req: &ConnectRequest) -> String {
    if req.database == ":memory:" {
        "sqlite::memory:".to_string()
    } else {
        // mode=rw so connecting to a missing file fails like a missing database.
        format!("sqlite:{}?mode=rw", req.database)
    }
}

// ============== Row Decoding ==============

fn collect_rows<R: Row>(
    rows: &[R],
    decode: fn(&R, usize) -> serde_json::Value,
) -> (Vec<ColumnInfo>, Vec<Vec<serde_json::Value>>) {
    let columns = rows
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|c| ColumnInfo {
                    name: c.name().to_string(),
                    data_type: c.type_info().name().to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let data = rows
        .iter()
        .map(|row| (0..row.columns().len()).map(|i| decode(row, i)).collect())
        .collect();

    (columns, data)
}

fn mysql_value(row: &MySqlRow, i: usize) -> serde_json::Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(i) {
        return v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
        return v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
        return v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(i) {
        return v
            .map(|d| serde_json::Value::String(d.to_string()))
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(i) {
        return v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    serde_json::Value::Null
}

fn postgres_value(row: &PgRow, i: usize) -> serde_json::Value {
    if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
        return v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(i) {
        return v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(i) {
        return v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(i) {
        return v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
        return v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(i) {
        return v
            .map(|d| serde_json::Value::String(d.to_string()))
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(i) {
        return v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    serde_json::Value::Null
}

fn sqlite_value(row: &SqliteRow, i: usize) -> serde_json::Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
        return v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(i) {
        return v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null);
    }
    serde_json::Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::connection::DbType;

    fn memory_request() -> ConnectRequest {
        ConnectRequest {
            db_type: DbType::SQLite,
            host: None,
            port: None,
            username: None,
            password: None,
            database: ":memory:".into(),
        }
    }

    fn test_config() -> AppConfig {
        AppConfig {
            service_name: "chat-service".into(),
            host: "127.0.0.1".into(),
            port: 0,
            connect_timeout_secs: 5,
            max_connections: 1,
        }
    }

    async fn seeded_pool() -> DatabasePool {
        let pool = DatabasePool::connect(&memory_request(), &test_config())
            .await
            .unwrap();
        pool.execute("CREATE TABLE artist (ArtistId INTEGER PRIMARY KEY, Name TEXT)")
            .await
            .unwrap();
        pool.execute("INSERT INTO artist (ArtistId, Name) VALUES (1, 'AC/DC'), (2, 'Aerosmith')")
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn connect_to_missing_sqlite_file_fails() {
        let mut req = memory_request();
        req.database = "/nonexistent/path/chat.db".into();
        let err = DatabasePool::connect(&req, &test_config()).await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseConnection(_)));
    }

    #[tokio::test]
    async fn mysql_without_host_is_a_validation_error() {
        let req = ConnectRequest {
            db_type: DbType::MySQL,
            host: None,
            port: None,
            username: None,
            password: None,
            database: "chinook".into(),
        };
        let err = DatabasePool::connect(&req, &test_config()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn sqlite_pool_never_recycles_its_connection() {
        // With the default reaper settings the sole :memory: connection would
        // be closed after the idle timeout and every table lost with it.
        let options = sqlite_pool_options();
        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_min_connections(), 1);
        assert!(options.get_idle_timeout().is_none());
        assert!(options.get_max_lifetime().is_none());
    }

    #[tokio::test]
    async fn sqlite_data_survives_an_idle_pause() {
        let pool = seeded_pool().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let schema = pool.describe_schema().await.unwrap();
        assert!(schema.contains("artist"));
        let result = pool.execute("SELECT COUNT(*) FROM artist").await.unwrap();
        assert_eq!(result.rows[0][0], serde_json::json!(2));
    }

    #[tokio::test]
    async fn describe_schema_is_idempotent() {
        let pool = seeded_pool().await;
        let first = pool.describe_schema().await.unwrap();
        let second = pool.describe_schema().await.unwrap();
        assert_eq!(first, second);
        assert!(first.contains("artist"));
        assert!(first.contains("Name"));
    }

    #[tokio::test]
    async fn execute_select_returns_rows_in_order() {
        let pool = seeded_pool().await;
        let result = pool
            .execute("SELECT Name FROM artist ORDER BY ArtistId")
            .await
            .unwrap();
        assert_eq!(result.row_count, 2);
        assert_eq!(result.columns[0].name, "Name");
        assert_eq!(result.rows[0][0], serde_json::json!("AC/DC"));
        assert_eq!(result.rows[1][0], serde_json::json!("Aerosmith"));
    }

    #[tokio::test]
    async fn execute_against_unknown_table_is_a_query_error() {
        let pool = seeded_pool().await;
        let err = pool.execute("SELECT * FROM no_such_table").await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseQuery(_)));
    }

    #[tokio::test]
    async fn execute_modification_reports_affected_rows() {
        let pool = seeded_pool().await;
        let result = pool
            .execute("UPDATE artist SET Name = 'AC-DC' WHERE ArtistId = 1")
            .await
            .unwrap();
        assert_eq!(result.affected_rows, Some(1));
    }
}
