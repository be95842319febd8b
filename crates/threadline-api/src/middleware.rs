use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use threadline_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::blocking;

/// Name of the session cookie carrying the JWT.
pub const SESSION_COOKIE: &str = "jwt";

/// The authenticated caller, attached to the request by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub profile_pic: String,
}

/// Session token from the cookie, falling back to an
/// `Authorization: Bearer` header.
pub fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

pub fn decode_session(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

/// Resolve a session token to a user that still exists.
pub async fn authenticate(state: &AppState, token: Option<String>) -> Result<CurrentUser, ApiError> {
    let token = token.ok_or_else(|| ApiError::unauthorized("Unauthorized - no session"))?;
    let claims = decode_session(&state.jwt_secret, &token)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized - invalid session"))?;

    let uid = claims.sub.to_string();
    let user = blocking(state, move |db| db.get_user_by_id(&uid))
        .await?
        .ok_or_else(|| ApiError::unauthorized("Unauthorized - user not found"))?;

    Ok(CurrentUser {
        id: claims.sub,
        username: user.username,
        profile_pic: user.profile_pic,
    })
}

/// Reject requests without a valid session; otherwise attach [`CurrentUser`].
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(&jar, req.headers());
    let user = authenticate(&state, token).await?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
