use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::error::AppError;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub database: String,
}

/// Liveness plus a `SELECT 1` round trip to the database.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .map_err(|e| {
            tracing::warn!("Health check database ping failed: {:?}", e);
            AppError::ServiceUnavailable("Database unreachable".to_string())
        })?;

    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        database: "ok".to_string(),
    };

    Ok((StatusCode::OK, Json(response)))
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_support::{json_body, test_state};

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .with_state(state)
    }

    #[tokio::test]
    async fn reports_healthy_database() {
        let state = test_state(1).await;
        let res = app(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn closed_pool_is_unavailable() {
        let state = test_state(1).await;
        state.db.close().await;

        let res = app(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(res).await;
        assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
    }
}
