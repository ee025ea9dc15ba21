//! Prompt templates for the two model calls of a chat turn.
//!
//! The first template asks the model for exactly one SQL query; the second
//! asks it to phrase the executed result in natural language. Both carry
//! the live schema description and the full conversation history, so each
//! request is stateless and self-contained.

use common::models::chat::ChatTurn;

/// Template for the SQL synthesis call. The two worked examples bias the
/// model toward emitting bare SQL with no surrounding markup.
const SQL_TEMPLATE: &str = "\
You are a data analyst at a company. You are interacting with a user who is asking you questions about the company's database.
Based on the table schema below, write a SQL query that would answer the user's question. Take the conversation history into account.

<SCHEMA>{schema}</SCHEMA>

Conversation History: {chat_history}

Write only the SQL query and nothing else. Do not wrap the SQL query in any other text, not even backticks.

For example:
Question: which 3 artists have the most tracks?
SQL Query: SELECT ArtistId, COUNT(*) as track_count FROM Track GROUP BY ArtistId ORDER BY track_count DESC LIMIT 3;
Question: Name 10 artists
SQL Query: SELECT Name FROM Artist LIMIT 10;

Your turn:

Question: {question}
SQL Query:
";

/// Template for the narration call.
const ANSWER_TEMPLATE: &str = "\
You are a data analyst at a company. You are interacting with a user who is asking you questions about the company's database.
Based on the table schema below, question, sql query, and sql response, write a natural language response.
<SCHEMA>{schema}</SCHEMA>

Conversation History: {chat_history}
SQL Query: <SQL>{query}</SQL>
User question: {question}
SQL Response: {response}";

/// Serializes the history as alternating `Human:` / `Assistant:` lines,
/// oldest first.
pub fn render_history(history: &[ChatTurn]) -> String {
    history
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders the SQL synthesis prompt.
pub fn render_sql_prompt(schema: &str, history: &[ChatTurn], question: &str) -> String {
    SQL_TEMPLATE
        .replace("{schema}", schema)
        .replace("{chat_history}", &render_history(history))
        .replace("{question}", question)
}

/// Renders the narration prompt.
pub fn render_answer_prompt(
    schema: &str,
    history: &[ChatTurn],
    question: &str,
    query: &str,
    response: &str,
) -> String {
    ANSWER_TEMPLATE
        .replace("{schema}", schema)
        .replace("{chat_history}", &render_history(history))
        .replace("{query}", query)
        .replace("{question}", question)
        .replace("{response}", response)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "Artist(ArtistId INTEGER, Name TEXT)";

    fn sample_history() -> Vec<ChatTurn> {
        vec![
            ChatTurn::assistant("Hello! Ask me anything about your database."),
            ChatTurn::human("How many artists are there?"),
            ChatTurn::assistant("There are 275 artists."),
        ]
    }

    #[test]
    fn sql_prompt_embeds_schema_history_and_question() {
        let prompt = render_sql_prompt(SCHEMA, &sample_history(), "Name 10 artists");
        assert!(prompt.contains(SCHEMA));
        assert!(prompt.contains("Name 10 artists"));
        assert!(prompt.contains("Human: How many artists are there?"));
        assert!(prompt.contains("Assistant: There are 275 artists."));
    }

    #[test]
    fn sql_prompt_keeps_the_worked_examples() {
        let prompt = render_sql_prompt(SCHEMA, &[], "Name 10 artists");
        assert!(prompt.contains("SELECT Name FROM Artist LIMIT 10;"));
        assert!(prompt.contains("not even backticks"));
    }

    #[test]
    fn history_lines_preserve_insertion_order() {
        let rendered = render_history(&sample_history());
        let human = rendered.find("Human:").unwrap();
        let second_assistant = rendered.rfind("Assistant:").unwrap();
        assert!(human < second_assistant);
    }

    #[test]
    fn answer_prompt_embeds_query_and_response() {
        let prompt = render_answer_prompt(
            SCHEMA,
            &sample_history(),
            "Name 10 artists",
            "SELECT Name FROM Artist LIMIT 10;",
            "(Name)\n(AC/DC)\n",
        );
        assert!(prompt.contains("<SQL>SELECT Name FROM Artist LIMIT 10;</SQL>"));
        assert!(prompt.contains("SQL Response: (Name)"));
        assert!(prompt.contains(SCHEMA));
    }
}
