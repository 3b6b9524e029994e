//! HTTP surface.
//!
//! Thin axum handlers over [`crate::core`]. Handlers extract the caller, call one core
//! function and wrap the result; all rules live in the core layer.

mod endpoints;
pub mod extractors;
pub mod form;
pub mod response;

use crate::{config::AppConfig, realtime::RoomFeed, storage::ObjectStore};
use axum::{Router, extract::DefaultBodyLimit};
use extractors::TokenVerifier;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Largest accepted request body; registrations carry several documents.
pub const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Relational store
    pub db: Arc<DatabaseConnection>,
    /// Realtime hub for chat rooms
    pub feed: RoomFeed,
    /// Object storage for images and documents
    pub store: Arc<dyn ObjectStore>,
    /// Loaded configuration
    pub config: Arc<AppConfig>,
    /// Session token verifier
    pub tokens: Arc<TokenVerifier>,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    endpoints::router()
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{setup_test_db, test_store};
    use axum::{
        body::Body,
        http::{Request, Response, header},
    };
    use extractors::{Claims, UserMetadata};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    pub const SECRET: &[u8] = b"test-jwt-secret";

    pub struct TestApp {
        pub state: AppState,
        pub _dir: TempDir,
    }

    pub async fn test_app() -> TestApp {
        let db = setup_test_db().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let state = AppState {
            db: Arc::new(db),
            feed: RoomFeed::new(),
            store: Arc::new(test_store(&dir)),
            config: Arc::new(AppConfig::default()),
            tokens: Arc::new(TokenVerifier::new(SECRET).unwrap()),
        };
        TestApp { state, _dir: dir }
    }

    pub fn token(sub: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            email: Some(format!("{sub}@example.org")),
            exp: usize::try_from(chrono::Utc::now().timestamp() + 3600).unwrap(),
            user_metadata: UserMetadata::default(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    impl TestApp {
        pub async fn send(&self, request: Request<Body>) -> Response<Body> {
            router(self.state.clone()).oneshot(request).await.unwrap()
        }

        pub async fn json(
            &self,
            method: &str,
            uri: &str,
            user: Option<&str>,
            body: Option<serde_json::Value>,
        ) -> (axum::http::StatusCode, serde_json::Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(user) = user {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(user)));
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            let response = self.send(request).await;
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = if bytes.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::from_slice(&bytes)
                    .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            };
            (status, value)
        }
    }
}
