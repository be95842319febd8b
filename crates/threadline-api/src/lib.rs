pub mod auth;
pub mod convert;
pub mod enrich;
pub mod error;
pub mod gateway;
pub mod media;
pub mod messages;
pub mod middleware;
pub mod posts;
pub mod routes;
pub mod users;

use threadline_db::Database;
use tracing::error;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
pub use routes::router;

/// Run a store call off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("Background task failed: {}", e))
        })?
        .map_err(ApiError::from)
}

/// Map a store constraint failure to a 400 carrying `message`; other errors
/// pass through.
pub(crate) fn on_conflict(message: &'static str) -> impl FnOnce(ApiError) -> ApiError {
    move |err| match err {
        ApiError::Internal(e) if threadline_db::is_constraint_violation(&e) => {
            ApiError::bad_request(message)
        }
        other => other,
    }
}

/// Parse a path id. Anything that is not a UUID cannot name a stored row.
pub(crate) fn path_id(raw: &str, not_found: &str) -> Result<uuid::Uuid, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found(not_found))
}
