use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::{info, warn};
use uuid::Uuid;

use threadline_db::models::UserChanges;
use threadline_types::api::{FollowResponse, UpdateUserRequest};

use crate::auth::{AppState, MIN_PASSWORD_LEN, hash_password};
use crate::convert::load_user;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::{blocking, on_conflict, path_id};

/// GET /api/users/profile/{query}, where the query is a user id or a username.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = blocking(&state, move |db| {
        let row = match query.parse::<Uuid>() {
            Ok(id) => db.get_user_by_id(&id.to_string())?,
            Err(_) => db.get_user_by_username(&query)?,
        };
        row.map(|row| load_user(db, row)).transpose()
    })
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user))
}

/// PUT /api/users/update/{id}
pub async fn update_user(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateUserRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if id.parse::<Uuid>().ok() != Some(caller.id) {
        return Err(ApiError::unauthorized("You cannot update other user's profile"));
    }

    let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let username = non_empty(req.username);
    let email = non_empty(req.email);

    if username.is_some() || email.is_some() {
        let (u, e, uid) = (username.clone(), email.clone(), caller.id.to_string());
        let taken = blocking(&state, move |db| {
            db.find_conflicting_user(u.as_deref(), e.as_deref(), &uid)
        })
        .await?;
        if taken.is_some() {
            return Err(ApiError::bad_request("Username or email already in use"));
        }
    }

    let password_hash = match req.password.filter(|p| !p.is_empty()) {
        Some(p) if p.chars().count() < MIN_PASSWORD_LEN => {
            return Err(ApiError::bad_request(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Some(p) => Some(hash_password(&p)?),
        None => None,
    };

    let profile_pic = match req.profile_pic.filter(|p| !p.is_empty()) {
        Some(data_url) => Some(state.media.upload(&data_url).await?),
        None => None,
    };
    let replaced_pic = profile_pic
        .as_ref()
        .filter(|_| !caller.profile_pic.is_empty())
        .map(|_| caller.profile_pic.clone());

    let changes = UserChanges {
        name: non_empty(req.name),
        email,
        username,
        password_hash,
        bio: req.bio,
        profile_pic,
    };

    let uid = caller.id.to_string();
    let user = blocking(&state, move |db| {
        db.update_user(&uid, &changes)?
            .map(|row| load_user(db, row))
            .transpose()
    })
    .await
    .map_err(on_conflict("Username or email already in use"))?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    // The old avatar goes only once the row points at the new one
    if let Some(old) = replaced_pic {
        if let Err(e) = state.media.destroy(&old).await {
            warn!("Failed to destroy old avatar of {}: {}", caller.id, e);
        }
    }

    info!("{} ({}) updated their profile", user.username, user.id);
    Ok(Json(user))
}

/// POST /api/users/follow/{id}: follow if not following, unfollow otherwise.
pub async fn follow_unfollow(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = path_id(&id, "User not found")?;
    if target == caller.id {
        return Err(ApiError::bad_request("You cannot follow/unfollow yourself"));
    }

    let (me, them) = (caller.id.to_string(), target.to_string());
    let following = blocking(&state, move |db| {
        if db.get_user_by_id(&them)?.is_none() {
            return Ok(None);
        }
        db.toggle_follow(&me, &them).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    let message = if following {
        "User followed successfully"
    } else {
        "User unfollowed successfully"
    };
    Ok(Json(FollowResponse {
        message: message.to_string(),
        following,
    }))
}
