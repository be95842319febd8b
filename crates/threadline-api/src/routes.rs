use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
};

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{gateway, messages, posts, users};

/// Base64 images ride inside JSON bodies, a third larger than the 10 MB
/// decoded limit.
const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// The REST API and the `/gateway` WebSocket upgrade.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/users/signup", post(auth::signup))
        .route("/api/users/login", post(auth::login))
        .route("/api/users/logout", post(auth::logout))
        .route("/api/users/profile/{query}", get(users::get_profile))
        .route("/api/posts/{id}", get(posts::get_post))
        .route("/api/posts/user/{username}", get(posts::get_user_posts));

    let protected_routes = Router::new()
        .route("/api/users/update/{id}", put(users::update_user))
        .route("/api/users/follow/{id}", post(users::follow_unfollow))
        .route("/api/posts", post(posts::create_post))
        .route("/api/posts/feed", get(posts::get_feed))
        .route("/api/posts/{id}", delete(posts::delete_post))
        .route("/api/posts/{id}/like", post(posts::like_unlike))
        .route("/api/posts/{id}/reply", post(posts::reply))
        .route("/api/messages", post(messages::send_message))
        .route("/api/messages/conversations", get(messages::get_conversations))
        .route("/api/messages/{other_user_id}", get(messages::get_messages))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let gateway_routes = Router::new()
        .route("/gateway", get(gateway::ws_upgrade))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            gateway::require_gateway_user,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(gateway_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}
