use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{info, warn};

use crate::{
    gateway::decoder::CONFIG_PARAM,
    mcp::{
        handler::{handle_mcp_request, ToolError},
        protocol::Request,
    },
    AppState,
};

// POST /mcp. A `config` query parameter on the request URL reconfigures the
// gateway before the request is handled; if it does not decode, the request
// fails with the decode error instead of running.
pub async fn mcp_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Json(req): Json<Request>,
) -> impl IntoResponse {
    let carries_config = uri
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).any(|(k, _)| k == CONFIG_PARAM))
        .unwrap_or(false);

    if carries_config {
        let source = format!("http://localhost{}", uri);
        match state.gateway().reconfigure_if_changed(&source).await {
            Ok(true) => info!("gateway reconfigured from request URL"),
            Ok(false) => {}
            Err(e) => {
                // The call must not run under a configuration it did not ask for.
                warn!(kind = e.kind(), "rejecting request with bad configuration: {}", e);
                if req.is_notification() {
                    return StatusCode::ACCEPTED.into_response();
                }
                let resp = ToolError::from(e).into_response(req.id);
                return (StatusCode::OK, Json(resp)).into_response();
            }
        }
    }

    match handle_mcp_request(req, state).await {
        Some(resp) => (StatusCode::OK, Json(resp)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
