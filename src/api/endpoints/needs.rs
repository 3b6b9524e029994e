//! Need endpoints: explore, posting, editing, pledging and confirming receipt.

use crate::{
    api::{
        AppState,
        extractors::AuthProfile,
        form::MultipartForm,
        response::{ApiResponse, no_content},
    },
    core::{
        home,
        need::{self, NeedFilter, NeedUpdate, NeedWithHome, NewNeed},
        pledge,
    },
    entities::{NeedCategory, Urgency, chat_room, home as home_entity, need as need_entity},
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

/// Explore page filters.
#[derive(Debug, Default, Deserialize)]
pub struct ListNeedsQuery {
    category: Option<NeedCategory>,
    urgency: Option<Urgency>,
    home_id: Option<i64>,
}

/// Need edit request.
#[derive(Debug, Deserialize)]
pub struct UpdateNeedRequest {
    category: Option<NeedCategory>,
    title: Option<String>,
    description: Option<String>,
    urgency: Option<Urgency>,
    quantity: Option<i32>,
}

/// Pledge request.
#[derive(Debug, Deserialize)]
pub struct PledgeRequest {
    quantity: i32,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListNeedsQuery>,
) -> Result<ApiResponse<Vec<NeedWithHome>>> {
    let filter = NeedFilter {
        category: query.category,
        urgency: query.urgency,
        home_id: query.home_id,
    };
    Ok(ApiResponse::ok(need::list_needs(&*state.db, &filter).await?))
}

/// Posts a need from a multipart form.
///
/// Text fields: `category`, `title`, `description`, `urgency`, `quantity`. File: `image`.
async fn create(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<ApiResponse<need_entity::Model>> {
    let mut form = MultipartForm::read(multipart).await?;
    let new_need = NewNeed {
        category: form.parse("category")?,
        title: form.text("title"),
        description: form.text("description"),
        urgency: form.parse("urgency")?,
        quantity: form.parse("quantity")?,
        image: form.take_file("image"),
    };
    let created = need::create_need(&*state.db, state.store.as_ref(), &profile.id, new_need).await?;
    Ok(ApiResponse::created(created))
}

/// Need detail, visible while the posting home is approved and in good standing.
async fn detail(
    State(state): State<AppState>,
    Path(need_id): Path<i64>,
) -> Result<ApiResponse<NeedWithHome>> {
    let found = need::get_need(&*state.db, need_id)
        .await?
        .ok_or_else(|| Error::not_found("need", need_id))?;
    let home = home::get_home(&*state.db, found.home_id)
        .await?
        .filter(home_entity::Model::can_operate)
        .ok_or_else(|| Error::not_found("need", need_id))?;
    Ok(ApiResponse::ok(NeedWithHome { need: found, home }))
}

async fn update(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
    Path(need_id): Path<i64>,
    Json(req): Json<UpdateNeedRequest>,
) -> Result<ApiResponse<need_entity::Model>> {
    let update = NeedUpdate {
        category: req.category,
        title: req.title,
        description: req.description,
        urgency: req.urgency,
        quantity: req.quantity,
    };
    let updated = need::update_need(&*state.db, &profile.id, need_id, update).await?;
    Ok(ApiResponse::ok(updated))
}

async fn delete(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
    Path(need_id): Path<i64>,
) -> Result<impl IntoResponse> {
    need::delete_need(&*state.db, &profile.id, need_id).await?;
    Ok(no_content())
}

async fn confirm_receipt(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
    Path(need_id): Path<i64>,
) -> Result<ApiResponse<need_entity::Model>> {
    let completed = need::confirm_receipt(&*state.db, &state.feed, &profile.id, need_id).await?;
    Ok(ApiResponse::ok(completed))
}

async fn create_pledge(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
    Path(need_id): Path<i64>,
    Json(req): Json<PledgeRequest>,
) -> Result<ApiResponse<chat_room::Model>> {
    let room = pledge::create_pledge(&*state.db, need_id, &profile, req.quantity).await?;
    Ok(ApiResponse::created(room))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(detail).patch(update).delete(delete))
        .route("/{id}/confirm-receipt", post(confirm_receipt))
        .route("/{id}/pledges", post(create_pledge))
}
