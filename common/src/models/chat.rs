//! Chat conversation models.
//!
//! A conversation is an insertion-ordered, append-only sequence of turns.
//! Turn order is semantically meaningful: it is replayed verbatim into both
//! model prompts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::query::QueryResult;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The user asking questions.
    Human,
    /// The model's narrated answer.
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Human => write!(f, "Human"),
            Role::Assistant => write!(f, "Assistant"),
        }
    }
}

/// One turn of the conversation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatTurn {
    /// Turn author.
    pub role: Role,
    /// Free-form text content.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    /// Creates a human turn.
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Creates an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Request body for one chat turn.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChatRequest {
    /// The user's natural-language question.
    #[validate(length(min = 1, message = "Message must not be empty"))]
    pub message: String,
}

/// Result of one completed chat turn.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChatTurnResponse {
    /// The question as recorded in the transcript.
    pub question: String,
    /// SQL synthesized by the model, executed verbatim.
    pub sql: String,
    /// Execution result of the synthesized SQL.
    pub result: QueryResult,
    /// The model's natural-language answer.
    pub answer: String,
}

/// Session details returned by the session endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionInfo {
    /// Session identifier.
    pub id: String,
    /// Session creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Whether a database connection is established.
    pub connected: bool,
    /// Full transcript, oldest first.
    pub history: Vec<ChatTurn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_display_matches_prompt_labels() {
        assert_eq!(Role::Human.to_string(), "Human");
        assert_eq!(Role::Assistant.to_string(), "Assistant");
    }

    #[test]
    fn turn_constructors_tag_roles() {
        assert_eq!(ChatTurn::human("q").role, Role::Human);
        assert_eq!(ChatTurn::assistant("a").role, Role::Assistant);
    }
}
