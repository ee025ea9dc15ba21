//! Shared data models.

pub mod chat;
pub mod connection;
pub mod query;

// Re-export commonly used types
pub use chat::{ChatRequest, ChatTurn, ChatTurnResponse, Role, SessionInfo};
pub use connection::{ConnectRequest, ConnectionInfo, DbType};
pub use query::{ColumnInfo, QueryResult};
