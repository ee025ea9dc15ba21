//! 自然语言数据库聊天服务
//!
//! 提供基于大语言模型的数据库问答功能，包括：
//! - 会话管理（创建、查询、结束）
//! - 按会话连接数据库（凭据仅存于内存）
//! - Text2SQL 合成、查询执行与自然语言回答

mod db;
mod handlers;
mod llm;
mod prompt;
mod routes;
mod service;
mod session;
mod state;

use axum::{middleware, routing::get, Json, Router};
use common::config::{AppConfig, LlmConfig};
use common::middleware::request_id::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "chat-service";
const DEFAULT_PORT: u16 = 8080;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "数据库聊天服务 API",
        version = "0.1.0",
        description = "自然语言数据库问答微服务"
    ),
    paths(
        handlers::create_session,
        handlers::get_session,
        handlers::delete_session,
        handlers::connect_session,
        handlers::get_schema,
        handlers::chat,
        handlers::health_check,
    ),
    components(schemas(
        common::models::ConnectRequest,
        common::models::ConnectionInfo,
        common::models::DbType,
        common::models::ChatRequest,
        common::models::ChatTurn,
        common::models::ChatTurnResponse,
        common::models::Role,
        common::models::SessionInfo,
        common::models::QueryResult,
        common::models::ColumnInfo,
        handlers::HealthResponse,
    )),
    tags(
        (name = "sessions", description = "会话管理端点"),
        (name = "chat", description = "聊天回合端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Load .env file (if present) before anything else
    load_dotenv();

    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置
    let mut config = AppConfig::load_with_service(SERVICE_NAME);
    config.port = std::env::var("SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    // 模型提供方在启动时读取环境变量选择
    let llm_config = LlmConfig::from_env()
        .expect("Failed to load model configuration (check LLM_API_KEY)");
    let model = llm::build_model(&llm_config)
        .expect("Failed to construct model client (check LLM_PROVIDER)");

    // 创建应用状态
    let state = AppState::new(config.clone(), model);

    // 创建路由
    let app = create_router(state);

    // 启动服务
    let addr = format!("{}:{}", config.host, config.port);
    info!(service = %config.service_name, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr).await.expect("绑定地址失败");
    axum::serve(listener, app).await.expect("服务启动失败");
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Load .env file from the working directory (best-effort, no error if missing).
fn load_dotenv() {
    let env_path = std::path::Path::new(".env");
    if env_path.exists() {
        if let Ok(content) = std::fs::read_to_string(env_path) {
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim();
                    // Only set if not already set by the environment
                    if std::env::var(key).is_err() {
                        std::env::set_var(key, value);
                    }
                }
            }
        }
    }
}
