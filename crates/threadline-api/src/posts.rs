use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::{info, warn};
use uuid::Uuid;

use threadline_db::models::NewReply;
use threadline_types::api::{CreatePostRequest, LikeResponse, ReplyRequest, StatusMessage};

use crate::auth::AppState;
use crate::convert::{load_post, load_posts, reply as reply_model};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::{blocking, path_id};

pub const MAX_POST_LEN: usize = 500;

/// POST /api/posts
pub async fn create_post(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    WithRejection(Json(req), _): WithRejection<Json<CreatePostRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(posted_by) = req.posted_by else {
        return Err(ApiError::bad_request("postedBy and text fields are required"));
    };
    if req.text.trim().is_empty() {
        return Err(ApiError::bad_request("postedBy and text fields are required"));
    }

    let author = posted_by.to_string();
    let exists = blocking(&state, move |db| db.get_user_by_id(&author)).await?;
    if exists.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    if posted_by != caller.id {
        return Err(ApiError::unauthorized("Unauthorized to create post"));
    }

    let len = req.text.chars().count();
    if len > MAX_POST_LEN {
        return Err(ApiError::bad_request(format!(
            "Text must be less than {} characters",
            MAX_POST_LEN
        )));
    }

    let img = match req.img.filter(|i| !i.is_empty()) {
        Some(data_url) => Some(state.media.upload(&data_url).await?),
        None => None,
    };

    let post_id = Uuid::new_v4();
    let author = caller.id.to_string();
    let text = req.text;
    let post = blocking(&state, move |db| {
        let row = db.create_post(&post_id.to_string(), &author, &text, img.as_deref())?;
        load_post(db, row)
    })
    .await?;

    info!("{} created post {}", caller.username, post.id);
    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /api/posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = path_id(&id, "Post not found")?.to_string();
    let post = blocking(&state, move |db| {
        db.get_post(&post_id)?
            .map(|row| load_post(db, row))
            .transpose()
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Post not found"))?;

    Ok(Json(post))
}

/// DELETE /api/posts/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = path_id(&id, "Post not found")?.to_string();

    let pid = post_id.clone();
    let post = blocking(&state, move |db| db.get_post(&pid))
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    if post.author_id != caller.id.to_string() {
        return Err(ApiError::unauthorized("Unauthorized to delete post"));
    }

    if let Some(img) = &post.img {
        if let Err(e) = state.media.destroy(img).await {
            warn!("Failed to destroy image of post {}: {}", post.id, e);
        }
    }

    let pid = post_id.clone();
    blocking(&state, move |db| db.delete_post(&pid)).await?;

    info!("{} deleted post {}", caller.username, post_id);
    Ok(Json(StatusMessage::new("Post deleted successfully")))
}

/// POST /api/posts/{id}/like: like if not liked, unlike otherwise.
pub async fn like_unlike(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = path_id(&id, "Post not found")?.to_string();
    let uid = caller.id.to_string();

    let liked = blocking(&state, move |db| {
        if db.get_post(&post_id)?.is_none() {
            return Ok(None);
        }
        db.toggle_like(&post_id, &uid).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Post not found"))?;

    let message = if liked {
        "Post liked successfully"
    } else {
        "Post unliked successfully"
    };
    Ok(Json(LikeResponse {
        message: message.to_string(),
        liked,
    }))
}

/// POST /api/posts/{id}/reply
pub async fn reply(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<ReplyRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::bad_request("Text field is required"));
    }
    let post_id = path_id(&id, "Post not found")?.to_string();

    let reply_id = Uuid::new_v4().to_string();
    let uid = caller.id.to_string();
    let (username, profile_pic) = (caller.username.clone(), caller.profile_pic.clone());
    let text = req.text;

    let row = blocking(&state, move |db| {
        if db.get_post(&post_id)?.is_none() {
            return Ok(None);
        }
        db.add_reply(&NewReply {
            id: &reply_id,
            post_id: &post_id,
            user_id: &uid,
            text: &text,
            username: &username,
            user_profile_pic: &profile_pic,
        })
        .map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Post not found"))?;

    Ok(Json(reply_model(row)))
}

/// GET /api/posts/feed
pub async fn get_feed(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = caller.id.to_string();
    let feed = blocking(&state, move |db| {
        let rows = db.get_feed(&uid)?;
        load_posts(db, rows)
    })
    .await?;

    Ok(Json(feed))
}

/// GET /api/posts/user/{username}
pub async fn get_user_posts(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = blocking(&state, move |db| {
        let Some(user) = db.get_user_by_username(&username)? else {
            return Ok(None);
        };
        let rows = db.get_posts_by_author(&user.id)?;
        load_posts(db, rows).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(posts))
}
