//! Serves stored objects. Public objects are open; documents need a valid signed URL.

use crate::{
    api::AppState,
    errors::{Error, Result},
    storage::Bucket,
};
use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderValue, header},
    response::Response,
    routing::get,
};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
pub struct SignatureQuery {
    expires: Option<u64>,
    signature: Option<String>,
}

fn content_type(path: &str) -> &'static str {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

async fn serve(
    State(state): State<AppState>,
    Path((bucket_name, path)): Path<(String, String)>,
    Query(query): Query<SignatureQuery>,
) -> Result<Response> {
    let bucket = Bucket::parse(&bucket_name).ok_or_else(|| Error::not_found("file", &path))?;

    if bucket == Bucket::Documents {
        let now = chrono::Utc::now().timestamp().unsigned_abs();
        let valid = match (query.expires, query.signature.as_deref()) {
            (Some(expires), Some(signature)) => {
                state
                    .store
                    .verify_signature(bucket, &path, expires, signature, now)
            }
            _ => false,
        };
        if !valid {
            debug!(path, "Rejected unsigned or expired document link");
            return Err(Error::forbidden("This link is invalid or has expired"));
        }
    }

    let bytes = state.store.read(bucket, &path).await?;
    let mut resp = Response::new(bytes.into());
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type(&path)),
    );
    Ok(resp)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{bucket}/{*path}", get(serve))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::api::test_support::*;
    use crate::storage::ObjectStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::time::Duration;

    async fn get(app: &TestApp, uri: &str) -> Response {
        app.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type("homes/1/logo.PNG"), "image/png");
        assert_eq!(content_type("homes/1/license.pdf"), "application/pdf");
        assert_eq!(content_type("noextension"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_public_file_served() {
        let app = test_app().await;
        app.state
            .store
            .upload(Bucket::Public, "homes/1/logo.png", b"png")
            .await
            .unwrap();

        let response = get(&app, "/files/public/homes/1/logo.png").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

        let response = get(&app, "/files/public/homes/1/missing.png").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_documents_need_signature() {
        let app = test_app().await;
        app.state
            .store
            .upload(Bucket::Documents, "homes/1/license.pdf", b"%PDF")
            .await
            .unwrap();

        let response = get(&app, "/files/documents/homes/1/license.pdf").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let signed = app
            .state
            .store
            .signed_url(Bucket::Documents, "homes/1/license.pdf", Duration::from_secs(60))
            .unwrap();
        let (_, path_and_query) = signed.split_once("/files").unwrap();
        let response = get(&app, &format!("/files{path_and_query}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    }

    #[tokio::test]
    async fn test_unknown_bucket_is_not_found() {
        let app = test_app().await;
        let response = get(&app, "/files/secret/anything.txt").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
