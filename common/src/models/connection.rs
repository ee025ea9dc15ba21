//! Connection credential models.
//!
//! Credentials are supplied per session through the connect endpoint and
//! kept only in session memory. The password is never serialized back out.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Database engine enumeration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// MySQL database.
    MySQL,
    /// PostgreSQL database.
    Postgres,
    /// SQLite database (the `database` field holds the file path).
    SQLite,
}

impl DbType {
    /// Returns the default port for this database type.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            DbType::MySQL => Some(3306),
            DbType::Postgres => Some(5432),
            DbType::SQLite => None,
        }
    }
}

impl Default for DbType {
    fn default() -> Self {
        DbType::MySQL
    }
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::MySQL => write!(f, "mysql"),
            DbType::Postgres => write!(f, "postgres"),
            DbType::SQLite => write!(f, "sqlite"),
        }
    }
}

/// Request body for connecting a session to a database.
///
/// Host, port and username are optional for SQLite, which is addressed by
/// file path through the `database` field.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ConnectRequest {
    /// Database engine (defaults to mysql).
    #[serde(default)]
    pub db_type: DbType,
    /// Database host.
    pub host: Option<String>,
    /// Database port (engine default if not specified).
    pub port: Option<u16>,
    /// Database username.
    pub username: Option<String>,
    /// Database password.
    pub password: Option<String>,
    /// Database name, or file path for SQLite.
    #[validate(length(min = 1, message = "Database name is required"))]
    pub database: String,
}

/// Connection details echoed back after a successful connect
/// (excludes the password).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConnectionInfo {
    /// Database engine.
    pub db_type: DbType,
    /// Database host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Database port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Database username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Database name, or file path for SQLite.
    pub database: String,
}

impl From<&ConnectRequest> for ConnectionInfo {
    fn from(req: &ConnectRequest) -> Self {
        Self {
            db_type: req.db_type.clone(),
            host: req.host.clone(),
            port: req.port.or_else(|| req.db_type.default_port()),
            username: req.username.clone(),
            database: req.database.clone(),
        }
    }
}
