//! 路由模块

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", post(handlers::create_session))
        .route(
            "/api/sessions/{id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/api/sessions/{id}/connect", post(handlers::connect_session))
        .route("/api/sessions/{id}/schema", get(handlers::get_schema))
        .route("/api/sessions/{id}/chat", post(handlers::chat))
        .route("/api/health", get(handlers::health_check))
}
