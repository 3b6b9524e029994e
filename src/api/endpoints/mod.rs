//! API endpoints.

mod admin;
mod files;
mod homes;
mod meta;
mod needs;
mod profile;
mod rooms;

use crate::api::AppState;
use axum::Router;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/meta", meta::router())
        .nest("/profile", profile::router())
        .nest("/homes", homes::router())
        .nest("/needs", needs::router())
        .nest("/rooms", rooms::router())
        .nest("/admin", admin::router())
        .nest("/files", files::router())
}
