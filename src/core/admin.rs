//! Admin moderation: account standing, need removal, document access and the activity log.
//!
//! Every write here appends an activity log row in the same transaction.

use crate::{
    core::{
        home::get_home,
        need::{delete_open_need, get_need},
        verification::append_activity,
    },
    entities::{AccountStatus, ActivityAction, ActivityLog, Home, activity_log, home},
    errors::{Error, Result},
    storage::{Bucket, ObjectStore},
};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, instrument};

/// Upper bound for one page of the activity log.
pub const MAX_ACTIVITY_PAGE: u64 = 500;

/// A temporary link to a private registration document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentLink {
    /// Object path in the documents bucket
    pub path: String,
    /// Signed URL, valid for the configured time
    pub url: String,
}

/// Filter for [`list_activity`].
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    /// Only rows about this kind of entity, e.g. `home`
    pub entity_type: Option<String>,
    /// Only rows about this entity id
    pub entity_id: Option<i64>,
}

impl AccountStatus {
    /// Activity recorded when moving into this status.
    #[must_use]
    pub const fn activity(self) -> ActivityAction {
        match self {
            Self::Active => ActivityAction::Reactivate,
            Self::Suspended => ActivityAction::Suspend,
            Self::Banned => ActivityAction::Ban,
        }
    }
}

/// Suspends, bans or reactivates a home.
///
/// Suspended and banned homes disappear from the explore page and cannot post needs or
/// receive pledges. Setting the status a home already has is rejected.
#[instrument(skip(db, reason))]
pub async fn set_account_status(
    db: &DatabaseConnection,
    home_id: i64,
    admin_id: &str,
    status: AccountStatus,
    reason: Option<String>,
) -> Result<home::Model> {
    let txn = db.begin().await?;
    let existing = get_home(&txn, home_id)
        .await?
        .ok_or_else(|| Error::not_found("home", home_id))?;

    let from = existing.account_status;
    if from == status {
        return Err(Error::TransitionRejected {
            state: from.as_str().to_string(),
            action: format!("set account status to {}", status.as_str()),
        });
    }

    let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

    let mut model: home::ActiveModel = existing.into();
    model.account_status = Set(status);
    model.updated_at = Set(chrono::Utc::now());
    let updated = model.update(&txn).await?;

    append_activity(
        &txn,
        status.activity(),
        "home",
        home_id,
        admin_id,
        json!({ "from": from, "to": status, "reason": reason }),
    )
    .await?;
    txn.commit().await?;

    info!(home_id, from = from.as_str(), to = status.as_str(), "Account status changed");
    Ok(updated)
}

/// Removes an active, unpledged need as a moderation action.
#[instrument(skip(db, reason))]
pub async fn remove_need(
    db: &DatabaseConnection,
    need_id: i64,
    admin_id: &str,
    reason: &str,
) -> Result<()> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(Error::validation("A removal reason is required"));
    }

    let txn = db.begin().await?;
    let need = get_need(&txn, need_id)
        .await?
        .ok_or_else(|| Error::not_found("need", need_id))?;
    delete_open_need(&txn, &need).await?;

    append_activity(
        &txn,
        ActivityAction::RemoveNeed,
        "need",
        need_id,
        admin_id,
        json!({ "home_id": need.home_id, "title": need.title, "reason": reason }),
    )
    .await?;
    txn.commit().await?;

    info!(need_id, "Need removed by admin");
    Ok(())
}

/// Signs a temporary URL for each registration document of a home.
pub async fn home_document_urls(
    db: &DatabaseConnection,
    store: &dyn ObjectStore,
    home_id: i64,
    ttl: Duration,
) -> Result<Vec<DocumentLink>> {
    let home = Home::find_by_id(home_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("home", home_id))?;

    home.documents()
        .into_iter()
        .map(|path| {
            let url = store.signed_url(Bucket::Documents, &path, ttl)?;
            Ok(DocumentLink { path, url })
        })
        .collect()
}

/// Lists activity log rows, newest first.
pub async fn list_activity(
    db: &DatabaseConnection,
    filter: &ActivityFilter,
    limit: u64,
) -> Result<Vec<activity_log::Model>> {
    let mut query = ActivityLog::find()
        .order_by_desc(activity_log::Column::CreatedAt)
        .order_by_desc(activity_log::Column::Id)
        .limit(limit.clamp(1, MAX_ACTIVITY_PAGE));

    if let Some(entity_type) = &filter.entity_type {
        query = query.filter(activity_log::Column::EntityType.eq(entity_type.as_str()));
    }
    if let Some(entity_id) = filter.entity_id {
        query = query.filter(activity_log::Column::EntityId.eq(entity_id));
    }

    query.all(db).await.map_err(Into::into)
}
