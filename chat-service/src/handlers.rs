//! Handler模块

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use utoipa::ToSchema;

use common::errors::AppError;
use common::models::chat::{ChatRequest, ChatTurnResponse, SessionInfo};
use common::models::connection::{ConnectRequest, ConnectionInfo};
use common::response::ApiResponse;

use crate::service::ChatService;
use crate::session::Session;
use crate::state::AppState;

async fn lookup(state: &AppState, id: &str) -> Result<Arc<Mutex<Session>>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
}

/// 创建新会话
#[utoipa::path(
    post,
    path = "/api/sessions",
    tag = "sessions",
    responses(
        (status = 200, description = "会话已创建", body = ApiResponse<SessionInfo>)
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SessionInfo>>, AppError> {
    let info = state.sessions.create().await;
    tracing::info!(session = %info.id, "会话已创建");
    Ok(Json(ApiResponse::ok_with_service(
        info,
        state.config.service_name.as_str(),
    )))
}

/// 获取会话详情与完整对话记录
#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    tag = "sessions",
    params(
        ("id" = String, Path, description = "会话 ID")
    ),
    responses(
        (status = 200, description = "会话详情", body = ApiResponse<SessionInfo>),
        (status = 404, description = "会话未找到")
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SessionInfo>>, AppError> {
    let handle = lookup(&state, &id).await?;
    let session = handle.lock().await;
    Ok(Json(ApiResponse::ok_with_service(
        session.info(),
        state.config.service_name.as_str(),
    )))
}

/// 结束会话（连接与对话记录随之销毁）
#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    tag = "sessions",
    params(
        ("id" = String, Path, description = "会话 ID")
    ),
    responses(
        (status = 200, description = "会话已结束", body = ApiResponse<bool>),
        (status = 404, description = "会话未找到")
    )
)]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<bool>>, AppError> {
    if !state.sessions.remove(&id).await {
        return Err(AppError::SessionNotFound(id));
    }
    tracing::info!(session = %id, "会话已结束");
    Ok(Json(ApiResponse::ok_with_service(
        true,
        state.config.service_name.as_str(),
    )))
}

/// 连接会话到数据库（重复调用会替换现有连接）
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/connect",
    tag = "sessions",
    params(
        ("id" = String, Path, description = "会话 ID")
    ),
    request_body = ConnectRequest,
    responses(
        (status = 200, description = "连接成功", body = ApiResponse<ConnectionInfo>),
        (status = 404, description = "会话未找到"),
        (status = 502, description = "数据库不可达或凭据无效")
    )
)]
pub async fn connect_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ConnectRequest>,
) -> Result<Json<ApiResponse<ConnectionInfo>>, AppError> {
    let handle = lookup(&state, &id).await?;
    let mut session = handle.lock().await;

    let service = ChatService::new(state.llm.clone(), state.config.clone());
    let data = service.connect(&mut session, req).await?;
    Ok(Json(ApiResponse::ok_with_service(
        data,
        state.config.service_name.as_str(),
    )))
}

/// 获取当前连接的模式描述
#[utoipa::path(
    get,
    path = "/api/sessions/{id}/schema",
    tag = "sessions",
    params(
        ("id" = String, Path, description = "会话 ID")
    ),
    responses(
        (status = 200, description = "模式描述", body = ApiResponse<String>),
        (status = 404, description = "会话未找到"),
        (status = 409, description = "尚未建立数据库连接")
    )
)]
pub async fn get_schema(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let handle = lookup(&state, &id).await?;
    let session = handle.lock().await;

    let service = ChatService::new(state.llm.clone(), state.config.clone());
    let schema = service.describe_schema(&session).await?;
    Ok(Json(ApiResponse::ok_with_service(
        schema,
        state.config.service_name.as_str(),
    )))
}

/// 执行一个聊天回合
///
/// 会话级互斥锁在整个回合期间持有，同一会话内不存在并发回合。
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/chat",
    tag = "chat",
    params(
        ("id" = String, Path, description = "会话 ID")
    ),
    request_body = ChatRequest,
    responses(
        (status = 200, description = "回合完成", body = ApiResponse<ChatTurnResponse>),
        (status = 404, description = "会话未找到"),
        (status = 409, description = "尚未建立数据库连接"),
        (status = 422, description = "生成的 SQL 执行失败"),
        (status = 502, description = "模型服务不可用")
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatTurnResponse>>, AppError> {
    let handle = lookup(&state, &id).await?;
    let mut session = handle.lock().await;

    let service = ChatService::new(state.llm.clone(), state.config.clone());
    let data = service.chat_turn(&mut session, &req.message).await?;
    Ok(Json(ApiResponse::ok_with_service(
        data,
        state.config.service_name.as_str(),
    )))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        sessions: state.sessions.count().await,
    })
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 活跃会话数
    pub sessions: usize,
}
