//! Shared test utilities for `CareBridge`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.
#![allow(clippy::unwrap_used)]

use crate::{
    core::home::HomeRegistration,
    entities::{
        AccountStatus, NeedCategory, NeedStatus, Role, Urgency, VerificationStatus, home, need,
        profile,
    },
    errors::Result,
    storage::{LocalObjectStore, Upload},
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tempfile::TempDir;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database in `dir`.
///
/// Unlike the in-memory database this one has a real connection pool, so concurrent
/// operations actually interleave.
pub async fn setup_file_db(dir: &TempDir) -> Result<DatabaseConnection> {
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.sqlite").display());
    let db = sea_orm::Database::connect(&url).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a local object store rooted in `dir`.
pub fn test_store(dir: &TempDir) -> LocalObjectStore {
    LocalObjectStore::new(dir.path(), "http://localhost:8080/files", b"test-signing-key".to_vec())
        .unwrap()
}

/// Creates a test database plus an object store in a temporary directory.
///
/// Keep the returned `TempDir` alive for as long as the store is used.
pub async fn setup_with_store() -> Result<(DatabaseConnection, LocalObjectStore, TempDir)> {
    let db = setup_test_db().await?;
    let dir = tempfile::tempdir()?;
    let store = test_store(&dir);
    Ok((db, store, dir))
}

/// Builds a profile model without touching the database.
pub fn test_profile(id: &str, role: Role) -> profile::Model {
    profile::Model {
        id: id.to_string(),
        email: format!("{id}@example.org"),
        display_name: id.to_string(),
        avatar_url: None,
        role,
        created_at: chrono::Utc::now(),
    }
}

/// Inserts a profile with the given id and role.
pub async fn create_test_profile(
    db: &DatabaseConnection,
    id: &str,
    role: Role,
) -> Result<profile::Model> {
    let template = test_profile(id, role);
    let model = profile::ActiveModel {
        id: Set(template.id),
        email: Set(template.email),
        display_name: Set(template.display_name),
        avatar_url: Set(None),
        role: Set(role),
        created_at: Set(template.created_at),
    };
    Ok(model.insert(db).await?)
}

/// Inserts the admin profile `admin`.
pub async fn create_test_admin(db: &DatabaseConnection) -> Result<profile::Model> {
    create_test_profile(db, "admin", Role::Admin).await
}

/// Inserts the donor profile `donor`.
pub async fn create_test_donor(db: &DatabaseConnection) -> Result<profile::Model> {
    create_test_profile(db, "donor", Role::Donor).await
}

/// A complete registration with one verification document.
pub fn test_registration(name: &str) -> HomeRegistration {
    HomeRegistration {
        name: name.to_string(),
        description: "A home for thirty children".to_string(),
        address: "12 Acacia Road".to_string(),
        city: "Nairobi".to_string(),
        contact_phone: "+254700000000".to_string(),
        logo: None,
        cover: None,
        documents: vec![Upload {
            file_name: "registration.pdf".to_string(),
            bytes: b"%PDF-1.4".to_vec(),
        }],
    }
}

/// Inserts a home in the given verification state, creating its owner profile.
///
/// # Defaults
/// * owner role: home
/// * `account_status`: active
/// * one document path
pub async fn create_home_with_status(
    db: &DatabaseConnection,
    owner_id: &str,
    status: VerificationStatus,
) -> Result<home::Model> {
    create_test_profile(db, owner_id, Role::Home).await?;

    let now = chrono::Utc::now();
    let model = home::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        name: Set(format!("{owner_id}'s home")),
        description: Set("Test home".to_string()),
        address: Set("1 Test Street".to_string()),
        city: Set("Nairobi".to_string()),
        contact_phone: Set("+254700000000".to_string()),
        logo_url: Set(None),
        cover_url: Set(None),
        document_paths: Set(serde_json::json!(["registrations/test-registration.pdf"])),
        verification_status: Set(status),
        verified: Set(status.is_verified()),
        rejection_reason: Set(None),
        account_status: Set(AccountStatus::Active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Inserts an approved, active home owned by `owner_id`.
pub async fn create_approved_home(db: &DatabaseConnection, owner_id: &str) -> Result<home::Model> {
    create_home_with_status(db, owner_id, VerificationStatus::Approved).await
}

/// Creates a test database with one approved home owned by `home-owner`.
pub async fn setup_with_approved_home() -> Result<(DatabaseConnection, home::Model)> {
    let db = setup_test_db().await?;
    let home = create_approved_home(&db, "home-owner").await?;
    Ok((db, home))
}

/// Inserts an active need with custom parameters.
pub async fn create_custom_need(
    db: &DatabaseConnection,
    home_id: i64,
    category: NeedCategory,
    urgency: Urgency,
    quantity: i32,
) -> Result<need::Model> {
    let now = chrono::Utc::now();
    let model = need::ActiveModel {
        home_id: Set(home_id),
        category: Set(category),
        title: Set("Test need".to_string()),
        description: Set("Needed for the children".to_string()),
        urgency: Set(urgency),
        quantity: Set(quantity),
        fulfilled_quantity: Set(0),
        status: Set(NeedStatus::Active),
        image_url: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        completed_at: Set(None),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Inserts an active need titled "Test need".
///
/// # Defaults
/// * `category`: clothing
/// * `urgency`: medium
pub async fn create_test_need(
    db: &DatabaseConnection,
    home_id: i64,
    quantity: i32,
) -> Result<need::Model> {
    create_custom_need(db, home_id, NeedCategory::Clothing, Urgency::Medium, quantity).await
}
