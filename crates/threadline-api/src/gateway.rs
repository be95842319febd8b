use axum::{
    Extension,
    extract::{Query, Request, State, WebSocketUpgrade},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use threadline_gateway::connection;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::{CurrentUser, authenticate, session_token};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayQuery {
    user_id: Option<String>,
}

/// Authenticate a gateway connect before the upgrade is negotiated. The
/// `userId` the client claims must match its session.
pub async fn require_gateway_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<GatewayQuery>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, session_token(&jar, req.headers())).await?;

    // Clients that have not loaded their profile yet send "undefined"
    let claimed = query
        .user_id
        .filter(|id| !id.is_empty() && id != "undefined");
    if let Some(claimed) = claimed {
        if claimed.parse::<Uuid>().ok() != Some(user.id) {
            warn!("{} tried to open a gateway as {}", user.id, claimed);
            return Err(ApiError::unauthorized("Gateway user does not match session"));
        }
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// GET /gateway?userId=<id>
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    let db = state.db.clone();
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, dispatcher, db, user.id, user.username)
    })
}
