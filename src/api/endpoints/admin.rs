//! Admin console endpoints. Every route requires the admin role.

use crate::{
    api::{AppState, extractors::AdminProfile, response::{ApiResponse, no_content}},
    core::{
        admin::{self, ActivityFilter, DocumentLink},
        home,
        report::{self, PlatformStats},
        verification::{self, VerificationAction},
    },
    entities::{AccountStatus, VerificationStatus, activity_log, home as home_entity},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
pub struct HomesQuery {
    status: Option<VerificationStatus>,
}

/// Account standing change.
#[derive(Debug, Deserialize)]
pub struct AccountStatusRequest {
    status: AccountStatus,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveNeedQuery {
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    entity_type: Option<String>,
    entity_id: Option<i64>,
    limit: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// RFC 3339 lower bound on `completed_at`
    since: Option<DateTime<Utc>>,
}

async fn list_homes(
    AdminProfile(_): AdminProfile,
    State(state): State<AppState>,
    Query(query): Query<HomesQuery>,
) -> Result<ApiResponse<Vec<home_entity::Model>>> {
    Ok(ApiResponse::ok(home::list_homes(&*state.db, query.status).await?))
}

async fn documents(
    AdminProfile(_): AdminProfile,
    State(state): State<AppState>,
    Path(home_id): Path<i64>,
) -> Result<ApiResponse<Vec<DocumentLink>>> {
    let ttl = Duration::from_secs(state.config.storage.signed_url_ttl_secs);
    let links = admin::home_document_urls(&*state.db, state.store.as_ref(), home_id, ttl).await?;
    Ok(ApiResponse::ok(links))
}

async fn update_verification(
    AdminProfile(admin): AdminProfile,
    State(state): State<AppState>,
    Path(home_id): Path<i64>,
    Json(action): Json<VerificationAction>,
) -> Result<ApiResponse<home_entity::Model>> {
    let home = verification::update_verification(&*state.db, home_id, &admin.id, action).await?;
    Ok(ApiResponse::ok(home))
}

async fn set_account_status(
    AdminProfile(admin): AdminProfile,
    State(state): State<AppState>,
    Path(home_id): Path<i64>,
    Json(req): Json<AccountStatusRequest>,
) -> Result<ApiResponse<home_entity::Model>> {
    let home =
        admin::set_account_status(&*state.db, home_id, &admin.id, req.status, req.reason).await?;
    Ok(ApiResponse::ok(home))
}

async fn remove_need(
    AdminProfile(admin): AdminProfile,
    State(state): State<AppState>,
    Path(need_id): Path<i64>,
    Query(query): Query<RemoveNeedQuery>,
) -> Result<impl IntoResponse> {
    admin::remove_need(&*state.db, need_id, &admin.id, &query.reason).await?;
    Ok(no_content())
}

async fn activity(
    AdminProfile(_): AdminProfile,
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<ApiResponse<Vec<activity_log::Model>>> {
    let filter = ActivityFilter {
        entity_type: query.entity_type,
        entity_id: query.entity_id,
    };
    let limit = query.limit.unwrap_or(100);
    Ok(ApiResponse::ok(admin::list_activity(&*state.db, &filter, limit).await?))
}

async fn stats(
    AdminProfile(_): AdminProfile,
    State(state): State<AppState>,
) -> Result<ApiResponse<PlatformStats>> {
    Ok(ApiResponse::ok(report::platform_stats(&*state.db).await?))
}

async fn completed_needs_csv(
    AdminProfile(_): AdminProfile,
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Response> {
    let csv = report::completed_needs_csv(&*state.db, query.since).await?;

    let mut resp = Response::new(csv.into());
    let headers = resp.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=completed-needs.csv"),
    );
    Ok(resp)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/homes", get(list_homes))
        .route("/homes/{id}/documents", get(documents))
        .route("/homes/{id}/verification", post(update_verification))
        .route("/homes/{id}/account-status", post(set_account_status))
        .route("/needs/{id}", delete(remove_need))
        .route("/activity", get(activity))
        .route("/stats", get(stats))
        .route("/reports/completed-needs.csv", get(completed_needs_csv))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use crate::api::test_support::*;
    use crate::entities::{Role, VerificationStatus};
    use crate::test_utils::{
        create_approved_home, create_home_with_status, create_test_admin, create_test_need,
        create_test_profile,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use serde_json::json;

    #[tokio::test]
    async fn test_non_admin_is_forbidden() {
        let app = test_app().await;
        create_test_profile(&*app.state.db, "donor", Role::Donor)
            .await
            .unwrap();

        let (status, body) = app.json("GET", "/admin/homes", Some("donor"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_verification_walk_is_logged() {
        let app = test_app().await;
        create_test_admin(&*app.state.db).await.unwrap();
        let home = create_home_with_status(&*app.state.db, "home-owner", VerificationStatus::Received)
            .await
            .unwrap();
        let uri = format!("/admin/homes/{}/verification", home.id);

        let (status, _) = app
            .json("POST", &uri, Some("admin"), Some(json!({"action": "approve"})))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = app
            .json("POST", &uri, Some("admin"), Some(json!({"action": "begin_review"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["verification_status"], "reviewing");

        let (status, body) = app
            .json("POST", &uri, Some("admin"), Some(json!({"action": "approve"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["verified"], true);

        let (_, body) = app
            .json(
                "GET",
                &format!("/admin/activity?entity_type=home&entity_id={}", home.id),
                Some("admin"),
                None,
            )
            .await;
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["action"], "approve");

        let (_, body) = app
            .json("GET", "/admin/homes?status=approved", Some("admin"), None)
            .await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_suspension_hides_needs() {
        let app = test_app().await;
        create_test_admin(&*app.state.db).await.unwrap();
        let home = create_approved_home(&*app.state.db, "home-owner").await.unwrap();
        create_test_need(&*app.state.db, home.id, 2).await.unwrap();

        let (status, body) = app
            .json(
                "POST",
                &format!("/admin/homes/{}/account-status", home.id),
                Some("admin"),
                Some(json!({"status": "suspended", "reason": "Complaint"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["account_status"], "suspended");

        let (_, body) = app.json("GET", "/needs", None, None).await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_need_requires_reason() {
        let app = test_app().await;
        create_test_admin(&*app.state.db).await.unwrap();
        let home = create_approved_home(&*app.state.db, "home-owner").await.unwrap();
        let need = create_test_need(&*app.state.db, home.id, 2).await.unwrap();

        let (status, _) = app
            .json("DELETE", &format!("/admin/needs/{}", need.id), Some("admin"), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .json(
                "DELETE",
                &format!("/admin/needs/{}?reason=spam", need.id),
                Some("admin"),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_document_links_are_signed() {
        let app = test_app().await;
        create_test_admin(&*app.state.db).await.unwrap();
        let home = create_home_with_status(&*app.state.db, "home-owner", VerificationStatus::Reviewing)
            .await
            .unwrap();

        let (status, body) = app
            .json(
                "GET",
                &format!("/admin/homes/{}/documents", home.id),
                Some("admin"),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let url = body["data"][0]["url"].as_str().unwrap();
        assert!(url.contains("/documents/registrations/test-registration.pdf?expires="));
        assert!(url.contains("&signature="));
    }

    #[tokio::test]
    async fn test_completed_needs_csv_headers() {
        let app = test_app().await;
        create_test_admin(&*app.state.db).await.unwrap();

        let request = Request::builder()
            .uri("/admin/reports/completed-needs.csv")
            .header(header::AUTHORIZATION, format!("Bearer {}", token("admin")))
            .body(Body::empty())
            .unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=completed-needs.csv"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(
            String::from_utf8_lossy(&bytes)
                .starts_with(crate::core::report::COMPLETED_NEEDS_HEADER)
        );
    }
}
