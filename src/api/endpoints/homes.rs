//! Home endpoints: registration, the caller's home and public home pages.

use crate::{
    api::{AppState, extractors::AuthProfile, form::MultipartForm, response::ApiResponse},
    core::{
        home::{self, HomeRegistration, HomeUpdate},
        need,
    },
    entities::{home as home_entity, need as need_entity},
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    routing::{get, post},
};
use serde::Deserialize;

/// Home profile edit request.
#[derive(Debug, Deserialize)]
pub struct UpdateHomeRequest {
    name: Option<String>,
    description: Option<String>,
    address: Option<String>,
    city: Option<String>,
    contact_phone: Option<String>,
}

/// Registers the caller's home from a multipart form.
///
/// Text fields: `name`, `description`, `address`, `city`, `contact_phone`.
/// Files: `logo`, `cover` (optional) and one or more `documents`.
async fn register(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<ApiResponse<home_entity::Model>> {
    let mut form = MultipartForm::read(multipart).await?;
    let registration = HomeRegistration {
        name: form.text("name"),
        description: form.text("description"),
        address: form.text("address"),
        city: form.text("city"),
        contact_phone: form.text("contact_phone"),
        logo: form.take_file("logo"),
        cover: form.take_file("cover"),
        documents: form.take_files("documents"),
    };
    let home = home::register_home(&*state.db, state.store.as_ref(), &profile, registration).await?;
    Ok(ApiResponse::created(home))
}

async fn my_home(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
) -> Result<ApiResponse<home_entity::Model>> {
    let home = home::require_my_home(&*state.db, &profile.id).await?;
    Ok(ApiResponse::ok(home))
}

async fn update_my_home(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
    Json(req): Json<UpdateHomeRequest>,
) -> Result<ApiResponse<home_entity::Model>> {
    let update = HomeUpdate {
        name: req.name,
        description: req.description,
        address: req.address,
        city: req.city,
        contact_phone: req.contact_phone,
    };
    let home = home::update_home_profile(&*state.db, &profile.id, update).await?;
    Ok(ApiResponse::ok(home))
}

async fn my_needs(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<need_entity::Model>>> {
    let needs = need::list_home_needs(&*state.db, &profile.id).await?;
    Ok(ApiResponse::ok(needs))
}

/// Public home page. Only approved homes in good standing are visible.
async fn public_home(
    State(state): State<AppState>,
    Path(home_id): Path<i64>,
) -> Result<ApiResponse<home_entity::Model>> {
    let home = home::get_home(&*state.db, home_id)
        .await?
        .filter(home_entity::Model::can_operate)
        .ok_or_else(|| Error::not_found("home", home_id))?;
    Ok(ApiResponse::ok(home))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(register))
        .route("/me", get(my_home).patch(update_my_home))
        .route("/me/needs", get(my_needs))
        .route("/{id}", get(public_home))
}
