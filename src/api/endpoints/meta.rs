//! Meta endpoint: client-facing settings.

use crate::api::{AppState, response::ApiResponse};
use axum::{Router, extract::State, routing::get};
use serde::Serialize;

/// Settings a client needs before it can talk to the rest of the API.
#[derive(Debug, Serialize)]
pub struct MetaResponse {
    /// Service name
    pub name: &'static str,
    /// Service version
    pub version: &'static str,
    /// How often to poll `GET /rooms/unread-count`
    pub unread_poll_interval_secs: u64,
    /// Longest accepted chat message
    pub max_message_length: usize,
}

async fn meta(State(state): State<AppState>) -> ApiResponse<MetaResponse> {
    ApiResponse::ok(MetaResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        unread_poll_interval_secs: state.config.chat.unread_poll_interval_secs,
        max_message_length: state.config.chat.max_message_length,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(meta))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_meta_exposes_poll_interval() {
        let app = test_app().await;
        let (status, body) = app.json("GET", "/meta", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "carebridge");
        assert_eq!(body["data"]["unread_poll_interval_secs"], 30);
        assert_eq!(body["data"]["max_message_length"], 2000);
    }
}
