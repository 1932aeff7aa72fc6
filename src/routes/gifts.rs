use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use crate::db::TurnSlot;
use crate::error::AppResult;
use crate::services::turn_order::TurnOrderAssignor;
use crate::AppState;

/// Router for White Elephant gift endpoints.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/shuffle", post(shuffle_turn_order))
}

#[derive(Debug, Serialize)]
pub struct ShuffleResponse {
    pub success: bool,
    pub count: usize,
    pub assignments: Vec<TurnSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Draw a fresh turn order for every gift in the exchange.
async fn shuffle_turn_order(State(state): State<Arc<AppState>>) -> AppResult<Json<ShuffleResponse>> {
    let outcome = TurnOrderAssignor::assign(&state.db, &state.shuffler).await?;

    let message = outcome
        .is_empty()
        .then(|| "No gifts to shuffle".to_string());

    Ok(Json(ShuffleResponse {
        success: true,
        count: outcome.count,
        assignments: outcome.assignments,
        message,
    }))
}
