//! Home business logic - registration and profile editing.
//!
//! Registration uploads the verification documents to the private bucket before the row
//! is written. Document uploads are required and any failure aborts the registration;
//! logo and cover images are optional and a failed upload only drops that image.

use crate::{
    entities::{AccountStatus, Home, Role, VerificationStatus, home, profile},
    errors::{Error, Result},
    storage::{Bucket, ObjectStore, Upload, object_path},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, instrument, warn};

/// Everything a home submits when registering.
#[derive(Debug, Clone, Default)]
pub struct HomeRegistration {
    /// Organization name
    pub name: String,
    /// Description shown to donors
    pub description: String,
    /// Street address
    pub address: String,
    /// City
    pub city: String,
    /// Contact phone number
    pub contact_phone: String,
    /// Optional logo image
    pub logo: Option<Upload>,
    /// Optional cover image
    pub cover: Option<Upload>,
    /// Registration documents, at least one required
    pub documents: Vec<Upload>,
}

/// Editable home fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct HomeUpdate {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New street address
    pub address: Option<String>,
    /// New city
    pub city: Option<String>,
    /// New phone number
    pub contact_phone: Option<String>,
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Finds a home by id.
pub async fn get_home<C>(db: &C, home_id: i64) -> Result<Option<home::Model>>
where
    C: ConnectionTrait,
{
    Home::find_by_id(home_id).one(db).await.map_err(Into::into)
}

/// Finds the home operated by a profile.
pub async fn get_my_home<C>(db: &C, owner_id: &str) -> Result<Option<home::Model>>
where
    C: ConnectionTrait,
{
    Home::find()
        .filter(home::Column::OwnerId.eq(owner_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_my_home`], but a missing home is an error.
pub async fn require_my_home<C>(db: &C, owner_id: &str) -> Result<home::Model>
where
    C: ConnectionTrait,
{
    get_my_home(db, owner_id)
        .await?
        .ok_or_else(|| Error::not_found("home", owner_id))
}

/// Lists homes for the admin console, newest first, optionally by verification status.
pub async fn list_homes(
    db: &DatabaseConnection,
    status: Option<VerificationStatus>,
) -> Result<Vec<home::Model>> {
    let mut query = Home::find().order_by_desc(home::Column::CreatedAt);
    if let Some(status) = status {
        query = query.filter(home::Column::VerificationStatus.eq(status));
    }
    query.all(db).await.map_err(Into::into)
}

/// Registers a new home for `owner`.
///
/// The owner must have the home role and must not already operate a home. The new home
/// starts as `received`, unverified and active.
#[instrument(skip(db, store, registration), fields(owner = %owner.id))]
pub async fn register_home(
    db: &DatabaseConnection,
    store: &dyn ObjectStore,
    owner: &profile::Model,
    registration: HomeRegistration,
) -> Result<home::Model> {
    if owner.role != Role::Home {
        return Err(Error::forbidden("Only home accounts can register a home"));
    }

    let name = required("Name", &registration.name)?;
    let address = required("Address", &registration.address)?;
    let city = required("City", &registration.city)?;
    let contact_phone = required("Contact phone", &registration.contact_phone)?;

    if registration.documents.is_empty() {
        return Err(Error::validation(
            "At least one verification document is required",
        ));
    }

    if get_my_home(db, &owner.id).await?.is_some() {
        return Err(Error::validation("This account already has a registered home"));
    }

    let mut document_paths = Vec::with_capacity(registration.documents.len());
    for document in &registration.documents {
        let path = object_path("registrations", &document.file_name);
        let stored = store
            .upload(Bucket::Documents, &path, &document.bytes)
            .await
            .map_err(|e| Error::Storage {
                message: format!("Failed to upload {}: {e}", document.file_name),
            })?;
        document_paths.push(serde_json::Value::String(stored.path));
    }

    let logo_url = upload_optional(store, "logos", registration.logo.as_ref()).await;
    let cover_url = upload_optional(store, "covers", registration.cover.as_ref()).await;

    let now = chrono::Utc::now();
    let model = home::ActiveModel {
        owner_id: Set(owner.id.clone()),
        name: Set(name),
        description: Set(registration.description.trim().to_string()),
        address: Set(address),
        city: Set(city),
        contact_phone: Set(contact_phone),
        logo_url: Set(logo_url),
        cover_url: Set(cover_url),
        document_paths: Set(serde_json::Value::Array(document_paths)),
        verification_status: Set(VerificationStatus::Received),
        verified: Set(VerificationStatus::Received.is_verified()),
        rejection_reason: Set(None),
        account_status: Set(AccountStatus::Active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    info!(home_id = created.id, "Home registered");
    Ok(created)
}

/// Uploads an optional public image. Failures are logged and yield `None`.
pub(crate) async fn upload_optional(
    store: &dyn ObjectStore,
    prefix: &str,
    upload: Option<&Upload>,
) -> Option<String> {
    let upload = upload?;
    let path = object_path(prefix, &upload.file_name);
    match store.upload(Bucket::Public, &path, &upload.bytes).await {
        Ok(stored) => stored.public_url,
        Err(e) => {
            warn!(file = %upload.file_name, error = %e, "Optional image upload failed, continuing without it");
            None
        }
    }
}

/// Updates the caller's home profile fields.
pub async fn update_home_profile(
    db: &DatabaseConnection,
    owner_id: &str,
    update: HomeUpdate,
) -> Result<home::Model> {
    let existing = require_my_home(db, owner_id).await?;
    let mut model: home::ActiveModel = existing.into();

    if let Some(name) = update.name {
        model.name = Set(required("Name", &name)?);
    }
    if let Some(description) = update.description {
        model.description = Set(description.trim().to_string());
    }
    if let Some(address) = update.address {
        model.address = Set(required("Address", &address)?);
    }
    if let Some(city) = update.city {
        model.city = Set(required("City", &city)?);
    }
    if let Some(phone) = update.contact_phone {
        model.contact_phone = Set(required("Contact phone", &phone)?);
    }
    model.updated_at = Set(chrono::Utc::now());

    model.update(db).await.map_err(Into::into)
}
