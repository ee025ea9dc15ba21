//! 会话编排服务模块
//!
//! 每个用户回合按固定顺序执行：合成 SQL → 执行查询 → 生成自然语言回答。
//! 任一步骤失败即中止本回合：已记录的用户消息保留，不追加助手消息。

use std::sync::Arc;

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::chat::{ChatTurn, ChatTurnResponse};
use common::models::connection::{ConnectRequest, ConnectionInfo};
use tracing::info;
use validator::Validate;

use crate::db::DatabasePool;
use crate::llm::CompletionModel;
use crate::prompt;
use crate::session::Session;

/// 聊天编排服务
pub struct ChatService {
    llm: Arc<dyn CompletionModel>,
    config: AppConfig,
}

impl ChatService {
    /// 创建新的编排服务实例
    pub fn new(llm: Arc<dyn CompletionModel>, config: AppConfig) -> Self {
        Self { llm, config }
    }

    /// 将会话连接到数据库（重连时替换旧连接池）
    pub async fn connect(
        &self,
        session: &mut Session,
        req: ConnectRequest,
    ) -> AppResult<ConnectionInfo> {
        req.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let pool = DatabasePool::connect(&req, &self.config).await?;
        let conn_info = ConnectionInfo::from(&req);
        session.attach_pool(pool);

        info!(
            session = %session.id,
            db_type = %conn_info.db_type,
            database = %conn_info.database,
            "数据库连接成功"
        );
        Ok(conn_info)
    }

    /// 当前连接的模式描述（每次调用读取实时元数据）
    pub async fn describe_schema(&self, session: &Session) -> AppResult<String> {
        let pool = session.pool.as_ref().ok_or(AppError::NotConnected)?;
        pool.describe_schema().await
    }

    /// 执行一个完整的聊天回合
    ///
    /// 用户消息在任何模型调用之前追加到会话历史；后续步骤失败不会回滚。
    pub async fn chat_turn(
        &self,
        session: &mut Session,
        message: &str,
    ) -> AppResult<ChatTurnResponse> {
        let question = message.trim();
        if question.is_empty() {
            return Err(AppError::Validation("Message must not be empty".into()));
        }

        // 连接未建立时拒绝整个回合（用户消息不入历史）
        let pool = session
            .pool
            .as_ref()
            .ok_or(AppError::NotConnected)?
            .clone();

        session.push_turn(ChatTurn::human(question));

        // 合成阶段：实时模式快照 + 完整历史 + 当前问题
        let schema = pool.describe_schema().await?;
        let sql_prompt = prompt::render_sql_prompt(&schema, &session.history, question);
        let sql = self.llm.complete(&sql_prompt).await?;
        info!(session = %session.id, sql = %sql, "SQL 已合成");

        // 执行阶段：模型输出原样执行，不做任何校验或改写
        let result = pool.execute(&sql).await?;

        // 叙述阶段：重新读取模式，保证反映执行后的实时结构
        let schema = pool.describe_schema().await?;
        let answer_prompt = prompt::render_answer_prompt(
            &schema,
            &session.history,
            question,
            &sql,
            &result.render_text(),
        );
        let answer = self.llm.complete(&answer_prompt).await?;

        session.push_turn(ChatTurn::assistant(answer.clone()));
        info!(session = %session.id, rows = result.row_count, "回合完成");

        Ok(ChatTurnResponse {
            question: question.to_string(),
            sql,
            result,
            answer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::models::chat::Role;
    use common::models::connection::DbType;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    /// Scripted completion model: pops one canned response per call.
    struct ScriptedModel {
        responses: Mutex<VecDeque<Result<String, String>>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<Result<String, String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl CompletionModel for ScriptedModel {
        async fn complete(&self, _prompt: &str) -> AppResult<String> {
            self.responses
                .lock()
                .await
                .pop_front()
                .expect("scripted model ran out of responses")
                .map_err(AppError::ModelService)
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

    fn bare_session() -> Session {
        Session {
            id: "test-session".into(),
            created_at: chrono::Utc::now(),
            history: vec![ChatTurn::assistant("Hello! Ask me anything.")],
            pool: None,
        }
    }

    /// Session connected to a seeded in-memory database.
    async fn connected_session(service: &ChatService) -> Session {
        let mut session = bare_session();
        service
            .connect(&mut session, memory_request())
            .await
            .unwrap();
        let pool = session.pool.as_ref().unwrap();
        pool.execute("CREATE TABLE artist (ArtistId INTEGER PRIMARY KEY, Name TEXT)")
            .await
            .unwrap();
        pool.execute("INSERT INTO artist (ArtistId, Name) VALUES (1, 'AC/DC'), (2, 'Aerosmith')")
            .await
            .unwrap();
        session
    }

    #[tokio::test]
    async fn successful_turn_appends_human_then_assistant() {
        let llm = ScriptedModel::new(vec![
            Ok("SELECT Name FROM artist ORDER BY ArtistId".into()),
            Ok("The two artists are AC/DC and Aerosmith.".into()),
        ]);
        let service = ChatService::new(llm, test_config());
        let mut session = connected_session(&service).await;
        let before = session.history.len();

        let response = service
            .chat_turn(&mut session, "Name the artists")
            .await
            .unwrap();

        assert_eq!(session.history.len(), before + 2);
        assert_eq!(session.history[before].role, Role::Human);
        assert_eq!(session.history[before].content, "Name the artists");
        assert_eq!(session.history[before + 1].role, Role::Assistant);
        assert_eq!(response.result.row_count, 2);
        assert_eq!(response.answer, "The two artists are AC/DC and Aerosmith.");
    }

    #[tokio::test]
    async fn failed_synthesis_keeps_only_the_human_turn() {
        let llm = ScriptedModel::new(vec![Err("rate limited".into())]);
        let service = ChatService::new(llm, test_config());
        let mut session = connected_session(&service).await;
        let before = session.history.len();

        let err = service
            .chat_turn(&mut session, "Name the artists")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ModelService(_)));
        assert_eq!(session.history.len(), before + 1);
        assert_eq!(session.history.last().unwrap().role, Role::Human);
    }

    #[tokio::test]
    async fn failed_execution_keeps_only_the_human_turn() {
        let llm = ScriptedModel::new(vec![Ok("SELECT * FROM no_such_table".into())]);
        let service = ChatService::new(llm, test_config());
        let mut session = connected_session(&service).await;
        let before = session.history.len();

        let err = service
            .chat_turn(&mut session, "What is in the mystery table?")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DatabaseQuery(_)));
        assert_eq!(session.history.len(), before + 1);
        assert_eq!(session.history.last().unwrap().role, Role::Human);
    }

    #[tokio::test]
    async fn failed_narration_keeps_only_the_human_turn() {
        let llm = ScriptedModel::new(vec![
            Ok("SELECT COUNT(*) FROM artist".into()),
            Err("upstream unreachable".into()),
        ]);
        let service = ChatService::new(llm, test_config());
        let mut session = connected_session(&service).await;
        let before = session.history.len();

        let err = service
            .chat_turn(&mut session, "How many artists?")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ModelService(_)));
        assert_eq!(session.history.len(), before + 1);
        assert_eq!(session.history.last().unwrap().role, Role::Human);
    }

    #[tokio::test]
    async fn turn_before_connect_is_rejected_without_history_change() {
        let llm = ScriptedModel::new(vec![]);
        let service = ChatService::new(llm, test_config());
        let mut session = bare_session();
        let before = session.history.len();

        let err = service
            .chat_turn(&mut session, "Name the artists")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotConnected));
        assert_eq!(session.history.len(), before);
    }

    #[tokio::test]
    async fn empty_message_is_rejected_without_history_change() {
        let llm = ScriptedModel::new(vec![]);
        let service = ChatService::new(llm, test_config());
        let mut session = connected_session(&service).await;
        let before = session.history.len();

        let err = service.chat_turn(&mut session, "   ").await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(session.history.len(), before);
    }

    #[tokio::test]
    async fn reconnect_replaces_the_pool() {
        let llm = ScriptedModel::new(vec![]);
        let service = ChatService::new(llm, test_config());
        let mut session = connected_session(&service).await;

        // Second connect replaces the pool; the seeded table is gone.
        service
            .connect(&mut session, memory_request())
            .await
            .unwrap();
        let schema = service.describe_schema(&session).await.unwrap();
        assert!(!schema.contains("artist"));
    }
}
