use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::{CookieJar, WithRejection, cookie::{Cookie, SameSite}};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use threadline_db::Database;
use threadline_db::models::NewUser;
use threadline_gateway::Dispatcher;
use threadline_types::api::{Claims, LoginRequest, SignupRequest, StatusMessage};

use crate::{blocking, on_conflict};
use crate::convert::load_user;
use crate::enrich::{ClientMeta, Enricher};
use crate::error::ApiError;
use crate::media::MediaHost;
use crate::middleware::SESSION_COOKIE;

/// Session lifetime, for both the JWT and the cookie.
const SESSION_DAYS: i64 = 15;

pub(crate) const MIN_PASSWORD_LEN: usize = 6;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
    pub media: MediaHost,
    pub enricher: Arc<Enricher>,
    /// Mark the session cookie `Secure` (HTTPS deployments).
    pub cookie_secure: bool,
}

pub async fn signup(
    State(state): State<AppState>,
    meta: ClientMeta,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<SignupRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_string();
    let username = req.username.trim().to_string();

    if name.is_empty() || email.is_empty() || username.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Please fill in all fields"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    // Check if username or email is taken
    let (u, e) = (username.clone(), email.clone());
    let existing = blocking(&state, move |db| {
        db.find_user_by_username_or_email(Some(u.as_str()), Some(e.as_str()))
    })
    .await?;
    if existing.is_some() {
        return Err(ApiError::bad_request("User already exists"));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();
    let signup_ip = meta.ip.clone();

    let user = blocking(&state, move |db| {
        let row = db.create_user(&NewUser {
            id: &user_id.to_string(),
            name: &name,
            username: &username,
            email: &email,
            password_hash: &password_hash,
            signup_ip: signup_ip.as_deref(),
        })?;
        load_user(db, row)
    })
    .await
    .map_err(on_conflict("User already exists"))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username)?;
    info!("{} ({}) signed up", user.username, user_id);

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(token, state.cookie_secure)),
        Json(user),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    meta: ClientMeta,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.filter(|s| !s.trim().is_empty());
    let email = req.email.filter(|s| !s.trim().is_empty());
    if username.is_none() && email.is_none() {
        return Err(ApiError::bad_request("Invalid username or password"));
    }

    let row = blocking(&state, move |db| {
        db.find_user_by_username_or_email(username.as_deref(), email.as_deref())
    })
    .await?
    .ok_or_else(|| ApiError::bad_request("Invalid username or password"))?;

    if !verify_password(&req.password, &row.password)? {
        return Err(ApiError::bad_request("Invalid username or password"));
    }

    let user = blocking(&state, move |db| load_user(db, row)).await?;
    let token = create_token(&state.jwt_secret, user.id, &user.username)?;

    // Enrichment is best effort and must not hold up the login
    let enricher = state.enricher.clone();
    let db = state.db.clone();
    let user_id = user.id;
    tokio::spawn(async move {
        if let Err(e) = enricher.record_login(db, user_id, meta).await {
            warn!("Failed to record login for {}: {}", user_id, e);
        }
    });

    info!("{} ({}) logged in", user.username, user.id);
    Ok((jar.add(session_cookie(token, state.cookie_secure)), Json(user)))
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(StatusMessage::new("User logged out successfully")),
    )
}

pub(crate) fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, stored: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Corrupt password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(SESSION_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .secure(secure)
        .max_age(time::Duration::days(SESSION_DAYS))
        .build()
}
