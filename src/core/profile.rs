//! Profile business logic.
//!
//! A profile is created the first time an authenticated user picks a role. Admins cannot
//! pick themselves; they are seeded from configuration.

use crate::{
    config::settings::AdminSeed,
    entities::{Profile, Role, profile},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use tracing::info;

/// Identity data taken from a verified session token.
#[derive(Debug, Clone)]
pub struct NewProfile {
    /// User id from the auth provider
    pub user_id: String,
    /// Email address
    pub email: String,
    /// Display name, falls back to the email's local part
    pub display_name: Option<String>,
    /// Avatar URL from the provider
    pub avatar_url: Option<String>,
}

/// Finds a profile by user id.
pub async fn get_profile<C>(db: &C, user_id: &str) -> Result<Option<profile::Model>>
where
    C: ConnectionTrait,
{
    Profile::find_by_id(user_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the caller's profile, creating it with `role` on first sign-in.
///
/// An existing profile is returned unchanged, whatever role was requested.
pub async fn ensure_profile(
    db: &DatabaseConnection,
    identity: NewProfile,
    role: Role,
) -> Result<profile::Model> {
    if let Some(existing) = get_profile(db, &identity.user_id).await? {
        return Ok(existing);
    }

    if role == Role::Admin {
        return Err(Error::forbidden("The admin role cannot be self-assigned"));
    }

    if identity.user_id.trim().is_empty() {
        return Err(Error::validation("User id cannot be empty"));
    }

    let display_name = identity
        .display_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| {
            identity
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        });

    let model = profile::ActiveModel {
        id: Set(identity.user_id),
        email: Set(identity.email),
        display_name: Set(display_name.trim().to_string()),
        avatar_url: Set(identity.avatar_url),
        role: Set(role),
        created_at: Set(chrono::Utc::now()),
    };

    let created = model.insert(db).await?;
    info!(user_id = %created.id, role = ?created.role, "Profile created");
    Ok(created)
}

/// Updates the editable profile fields. `None` leaves a field unchanged.
pub async fn update_profile(
    db: &DatabaseConnection,
    user_id: &str,
    display_name: Option<String>,
    avatar_url: Option<Option<String>>,
) -> Result<profile::Model> {
    let existing = get_profile(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("profile", user_id))?;

    let mut model: profile::ActiveModel = existing.into();
    if let Some(name) = display_name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(Error::validation("Display name cannot be empty"));
        }
        model.display_name = Set(name);
    }
    if let Some(avatar) = avatar_url {
        model.avatar_url = Set(avatar);
    }

    model.update(db).await.map_err(Into::into)
}

/// Creates or promotes the admin profiles listed in configuration.
///
/// Returns how many profiles were created or changed. Running it twice is a no-op.
pub async fn seed_admins(db: &DatabaseConnection, admins: &[AdminSeed]) -> Result<usize> {
    let mut changed = 0;

    for seed in admins {
        match get_profile(db, &seed.user_id).await? {
            Some(existing) if existing.role == seed.role() => {}
            Some(existing) => {
                let mut model: profile::ActiveModel = existing.into();
                model.role = Set(seed.role());
                model.update(db).await?;
                info!(user_id = %seed.user_id, "Promoted profile to admin");
                changed += 1;
            }
            None => {
                profile::ActiveModel {
                    id: Set(seed.user_id.clone()),
                    email: Set(seed.email.clone()),
                    display_name: Set(seed.display_name.clone()),
                    avatar_url: Set(None),
                    role: Set(seed.role()),
                    created_at: Set(chrono::Utc::now()),
                }
                .insert(db)
                .await?;
                info!(user_id = %seed.user_id, "Seeded admin profile");
                changed += 1;
            }
        }
    }

    Ok(changed)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn identity(user_id: &str) -> NewProfile {
        NewProfile {
            user_id: user_id.to_string(),
            email: format!("{user_id}@example.org"),
            display_name: None,
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn test_admin_role_cannot_be_requested() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<profile::Model>::new()])
            .into_connection();

        let result = ensure_profile(&db, identity("mallory"), Role::Admin).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_profile_creates_once() -> Result<()> {
        let db = setup_test_db().await?;

        let created = ensure_profile(&db, identity("alice"), Role::Donor).await?;
        assert_eq!(created.role, Role::Donor);
        assert_eq!(created.display_name, "alice");

        // A second call with another role returns the original profile
        let again = ensure_profile(&db, identity("alice"), Role::Home).await?;
        assert_eq!(again, created);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_profile() -> Result<()> {
        let db = setup_test_db().await?;
        ensure_profile(&db, identity("bob"), Role::Donor).await?;

        let updated = update_profile(
            &db,
            "bob",
            Some("  Bob B.  ".to_string()),
            Some(Some("https://img/bob.png".to_string())),
        )
        .await?;
        assert_eq!(updated.display_name, "Bob B.");
        assert_eq!(updated.avatar_url.as_deref(), Some("https://img/bob.png"));

        let result = update_profile(&db, "bob", Some("   ".to_string()), None).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = update_profile(&db, "nobody", None, None).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_admins_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        ensure_profile(&db, identity("carol"), Role::Donor).await?;

        let seeds = vec![
            AdminSeed {
                user_id: "root".to_string(),
                email: "root@example.org".to_string(),
                display_name: "Root".to_string(),
            },
            AdminSeed {
                user_id: "carol".to_string(),
                email: "carol@example.org".to_string(),
                display_name: "Carol".to_string(),
            },
        ];

        assert_eq!(seed_admins(&db, &seeds).await?, 2);
        assert_eq!(seed_admins(&db, &seeds).await?, 0);

        let carol = get_profile(&db, "carol").await?.unwrap();
        assert_eq!(carol.role, Role::Admin);
        Ok(())
    }
}
