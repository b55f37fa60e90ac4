use axum::{extract::State, response::IntoResponse, Json};

use crate::AppState;

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.gateway().snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "configured": snapshot.is_configured(),
        "networks": snapshot.registry.network_ids(),
    }))
}
