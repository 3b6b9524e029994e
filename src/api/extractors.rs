//! Request extractors.
//!
//! Sessions are bearer JWTs issued by the external auth provider and signed with a shared
//! HS256 secret. The token is read from the `Authorization` header, or from the
//! `access_token` query parameter for `EventSource` clients that cannot set headers.

use crate::{
    api::AppState,
    core::profile::get_profile,
    entities::{Role, profile},
    errors::{Error, Result},
};
use axum::{
    extract::{FromRequestParts, Query},
    http::{header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Provider-supplied profile hints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Full name from the identity provider
    #[serde(default)]
    pub full_name: Option<String>,
    /// Avatar picture from the identity provider
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Claims we read from a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Expiry, seconds since the epoch
    pub exp: usize,
    /// Provider metadata
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Verifies session tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Creates a verifier for HS256 tokens signed with `secret`.
    pub fn new(secret: &[u8]) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::Config {
                message: "AUTH_JWT_SECRET cannot be empty".to_string(),
            });
        }
        let mut validation = Validation::new(Algorithm::HS256);
        // Provider tokens carry an audience we do not pin
        validation.validate_aud = false;
        Ok(Self {
            key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// Decodes and validates a token.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        Ok(decode::<Claims>(token, &self.key, &self.validation)?.claims)
    }
}

#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    if let Some(token) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        return Some(token.trim().to_string());
    }

    Query::<TokenQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(query)| query.access_token)
}

/// A verified session, whether or not a profile exists yet.
#[derive(Debug, Clone)]
pub struct AuthSession(pub Claims);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(parts).ok_or(Error::Unauthorized)?;
        state.tokens.verify(&token).map(Self)
    }
}

/// A verified session with a profile.
#[derive(Debug, Clone)]
pub struct AuthProfile(pub profile::Model);

impl FromRequestParts<AppState> for AuthProfile {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let AuthSession(claims) = AuthSession::from_request_parts(parts, state).await?;
        get_profile(&*state.db, &claims.sub)
            .await?
            .map(Self)
            .ok_or_else(|| Error::forbidden("Choose a role to finish signing up"))
    }
}

/// A verified session whose profile has the admin role.
#[derive(Debug, Clone)]
pub struct AdminProfile(pub profile::Model);

impl FromRequestParts<AppState> for AdminProfile {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let AuthProfile(profile) = AuthProfile::from_request_parts(parts, state).await?;
        if profile.role != Role::Admin {
            return Err(Error::forbidden("Admin access required"));
        }
        Ok(Self(profile))
    }
}
