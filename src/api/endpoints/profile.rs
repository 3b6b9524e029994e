//! Profile endpoints.

use crate::{
    api::{
        AppState,
        extractors::{AuthProfile, AuthSession},
        response::ApiResponse,
    },
    core::profile::{self, NewProfile},
    entities::{Role, profile as profile_entity},
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Deserializer};

/// First sign-in request.
#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    /// `donor` or `home`
    pub role: Role,
    /// Overrides the provider's name
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Profile edit request.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    /// New display name
    #[serde(default)]
    pub display_name: Option<String>,
    /// New avatar URL; `null` clears it, absent keeps it
    #[serde(default, deserialize_with = "present")]
    pub avatar_url: Option<Option<String>>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

async fn create(
    AuthSession(claims): AuthSession,
    State(state): State<AppState>,
    Json(req): Json<CreateProfileRequest>,
) -> Result<ApiResponse<profile_entity::Model>> {
    let email = claims
        .email
        .ok_or_else(|| Error::validation("Session has no email address"))?;
    let identity = NewProfile {
        user_id: claims.sub,
        email,
        display_name: req.display_name.or(claims.user_metadata.full_name),
        avatar_url: claims.user_metadata.avatar_url,
    };
    let profile = profile::ensure_profile(&*state.db, identity, req.role).await?;
    Ok(ApiResponse::ok(profile))
}

async fn me(AuthProfile(profile): AuthProfile) -> ApiResponse<profile_entity::Model> {
    ApiResponse::ok(profile)
}

async fn update(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<ApiResponse<profile_entity::Model>> {
    let updated =
        profile::update_profile(&*state.db, &profile.id, req.display_name, req.avatar_url).await?;
    Ok(ApiResponse::ok(updated))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/me", get(me).patch(update))
}
