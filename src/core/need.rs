//! Need business logic - posting, editing, browsing, deleting and confirming receipt.
//!
//! Status moves `active -> pending_pickup -> completed` and never back. The flip to
//! `pending_pickup` happens in [`crate::core::pledge`]; this module owns the flip to
//! `completed`, which also archives every chat room of the need.

use crate::{
    core::home::{require_my_home, upload_optional},
    entities::{
        AccountStatus, ChatRoom, Home, Need, NeedCategory, NeedStatus, Urgency,
        VerificationStatus, chat_room, home, need,
    },
    errors::{Error, Result},
    realtime::{RoomEvent, RoomFeed},
    storage::{ObjectStore, Upload},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::{info, instrument};

/// Input for posting a need.
#[derive(Debug, Clone)]
pub struct NewNeed {
    /// Item category
    pub category: NeedCategory,
    /// Short title
    pub title: String,
    /// Details
    pub description: String,
    /// Urgency
    pub urgency: Urgency,
    /// Units requested, at least one
    pub quantity: i32,
    /// Optional picture
    pub image: Option<Upload>,
}

/// Editable need fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct NeedUpdate {
    /// New category
    pub category: Option<NeedCategory>,
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New urgency
    pub urgency: Option<Urgency>,
    /// New requested quantity; must stay above what is already pledged
    pub quantity: Option<i32>,
}

/// Filters for the explore page.
#[derive(Debug, Clone, Default)]
pub struct NeedFilter {
    /// Only this category
    pub category: Option<NeedCategory>,
    /// Only this urgency
    pub urgency: Option<Urgency>,
    /// Only needs of this home
    pub home_id: Option<i64>,
}

/// A need together with the home that posted it.
#[derive(Debug, Clone, Serialize)]
pub struct NeedWithHome {
    /// The need
    pub need: need::Model,
    /// Posting home
    pub home: home::Model,
}

impl Urgency {
    /// Sort weight, higher is more urgent.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::Critical => 2,
        }
    }
}

/// Finds a need by id.
pub async fn get_need<C>(db: &C, need_id: i64) -> Result<Option<need::Model>>
where
    C: ConnectionTrait,
{
    Need::find_by_id(need_id).one(db).await.map_err(Into::into)
}

/// Loads a need that belongs to the home operated by `owner_id`.
///
/// Needs of other homes are reported as not found.
pub async fn get_owned_need<C>(db: &C, owner_id: &str, need_id: i64) -> Result<need::Model>
where
    C: ConnectionTrait,
{
    let home = require_my_home(db, owner_id).await?;
    get_need(db, need_id)
        .await?
        .filter(|n| n.home_id == home.id)
        .ok_or_else(|| Error::not_found("need", need_id))
}

/// Posts a new need for the caller's home.
///
/// The home must be approved and its account active. A failed image upload is logged
/// and the need is posted without the image.
#[instrument(skip(db, store, new_need), fields(title = %new_need.title))]
pub async fn create_need(
    db: &DatabaseConnection,
    store: &dyn ObjectStore,
    owner_id: &str,
    new_need: NewNeed,
) -> Result<need::Model> {
    let home = require_my_home(db, owner_id).await?;
    if !home.can_operate() {
        return Err(Error::forbidden(
            "Only verified homes in good standing can post needs",
        ));
    }

    let title = new_need.title.trim().to_string();
    if title.is_empty() {
        return Err(Error::validation("Title cannot be empty"));
    }
    if new_need.quantity < 1 {
        return Err(Error::validation("Quantity must be at least 1"));
    }

    let image_url = upload_optional(store, "needs", new_need.image.as_ref()).await;

    let now = chrono::Utc::now();
    let model = need::ActiveModel {
        home_id: Set(home.id),
        category: Set(new_need.category),
        title: Set(title),
        description: Set(new_need.description.trim().to_string()),
        urgency: Set(new_need.urgency),
        quantity: Set(new_need.quantity),
        fulfilled_quantity: Set(0),
        status: Set(NeedStatus::Active),
        image_url: Set(image_url),
        created_at: Set(now),
        updated_at: Set(now),
        completed_at: Set(None),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    info!(need_id = created.id, home_id = home.id, "Need posted");
    Ok(created)
}

/// Edits an active need of the caller's home.
///
/// The write is one conditional `UPDATE`: it only applies while the need is still active
/// and, when the quantity changes, while fewer units than the new quantity are pledged.
/// A pledge landing between the ownership check and the write is therefore either seen
/// by the condition or sees the new quantity itself.
pub async fn update_need(
    db: &DatabaseConnection,
    owner_id: &str,
    need_id: i64,
    update: NeedUpdate,
) -> Result<need::Model> {
    let title = update.title.map(|t| t.trim().to_string());
    if title.as_deref().is_some_and(str::is_empty) {
        return Err(Error::validation("Title cannot be empty"));
    }
    if update.quantity.is_some_and(|q| q < 1) {
        return Err(Error::validation("Quantity must be at least 1"));
    }

    let existing = get_owned_need(db, owner_id, need_id).await?;
    if existing.status != NeedStatus::Active {
        return Err(Error::TransitionRejected {
            state: existing.status.as_str().to_string(),
            action: "edit need".to_string(),
        });
    }

    let mut query = Need::update_many()
        .col_expr(need::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(need::Column::Id.eq(need_id))
        .filter(need::Column::Status.eq(NeedStatus::Active));
    if let Some(title) = title {
        query = query.col_expr(need::Column::Title, Expr::value(title));
    }
    if let Some(description) = update.description {
        query = query.col_expr(
            need::Column::Description,
            Expr::value(description.trim().to_string()),
        );
    }
    if let Some(category) = update.category {
        query = query.col_expr(need::Column::Category, Expr::value(category));
    }
    if let Some(urgency) = update.urgency {
        query = query.col_expr(need::Column::Urgency, Expr::value(urgency));
    }
    if let Some(quantity) = update.quantity {
        query = query
            .col_expr(need::Column::Quantity, Expr::value(quantity))
            .filter(need::Column::FulfilledQuantity.lt(quantity));
    }

    let result = query.exec(db).await?;
    let current = get_need(db, need_id)
        .await?
        .ok_or_else(|| Error::not_found("need", need_id))?;

    if result.rows_affected == 0 {
        return Err(if current.status == NeedStatus::Active {
            Error::validation(format!(
                "Quantity must be greater than the {} units already pledged",
                current.fulfilled_quantity
            ))
        } else {
            Error::TransitionRejected {
                state: current.status.as_str().to_string(),
                action: "edit need".to_string(),
            }
        });
    }
    Ok(current)
}

/// Lists open needs of approved, active homes for the explore page.
///
/// Results are ordered most urgent first, then newest first.
pub async fn list_needs(db: &DatabaseConnection, filter: &NeedFilter) -> Result<Vec<NeedWithHome>> {
    let mut query = Need::find()
        .find_also_related(Home)
        .filter(need::Column::Status.eq(NeedStatus::Active))
        .filter(home::Column::VerificationStatus.eq(VerificationStatus::Approved))
        .filter(home::Column::AccountStatus.eq(AccountStatus::Active));

    if let Some(category) = filter.category {
        query = query.filter(need::Column::Category.eq(category));
    }
    if let Some(urgency) = filter.urgency {
        query = query.filter(need::Column::Urgency.eq(urgency));
    }
    if let Some(home_id) = filter.home_id {
        query = query.filter(need::Column::HomeId.eq(home_id));
    }

    let mut listings: Vec<NeedWithHome> = query
        .all(db)
        .await?
        .into_iter()
        .filter_map(|(need, home)| home.map(|home| NeedWithHome { need, home }))
        .collect();

    listings.sort_by(|a, b| {
        b.need
            .urgency
            .rank()
            .cmp(&a.need.urgency.rank())
            .then_with(|| b.need.created_at.cmp(&a.need.created_at))
            .then_with(|| b.need.id.cmp(&a.need.id))
    });
    Ok(listings)
}

/// Lists every need of the caller's home, newest first.
pub async fn list_home_needs(db: &DatabaseConnection, owner_id: &str) -> Result<Vec<need::Model>> {
    let home = require_my_home(db, owner_id).await?;
    Need::find()
        .filter(need::Column::HomeId.eq(home.id))
        .order_by_desc(need::Column::CreatedAt)
        .order_by_desc(need::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a need that is still active and has no pledges against it.
///
/// The conditions are part of the `DELETE` itself, so a pledge that lands between the
/// check and the delete makes the delete fail instead of orphaning its chat room.
pub(crate) async fn delete_open_need<C>(db: &C, need: &need::Model) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = Need::delete_many()
        .filter(need::Column::Id.eq(need.id))
        .filter(need::Column::Status.eq(NeedStatus::Active))
        .filter(need::Column::FulfilledQuantity.eq(0))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::TransitionRejected {
            state: if need.status == NeedStatus::Active {
                "pledged".to_string()
            } else {
                need.status.as_str().to_string()
            },
            action: "delete need".to_string(),
        });
    }
    Ok(())
}

/// Deletes one of the caller's needs. Only active, unpledged needs can be deleted.
pub async fn delete_need(db: &DatabaseConnection, owner_id: &str, need_id: i64) -> Result<()> {
    let existing = get_owned_need(db, owner_id, need_id).await?;
    delete_open_need(db, &existing).await?;
    info!(need_id, "Need deleted");
    Ok(())
}

/// Confirms that a fully pledged need was delivered.
///
/// In one transaction: `pending_pickup -> completed`, `completed_at` stamped, and every
/// chat room of the need archived. Subscribers of those rooms are told afterwards.
#[instrument(skip(db, feed))]
pub async fn confirm_receipt(
    db: &DatabaseConnection,
    feed: &RoomFeed,
    owner_id: &str,
    need_id: i64,
) -> Result<need::Model> {
    let txn = db.begin().await?;

    let existing = get_owned_need(&txn, owner_id, need_id).await?;
    if !existing.status.can_transition_to(NeedStatus::Completed) {
        return Err(Error::TransitionRejected {
            state: existing.status.as_str().to_string(),
            action: "confirm receipt".to_string(),
        });
    }

    let now = chrono::Utc::now();
    let result = Need::update_many()
        .col_expr(need::Column::Status, Expr::value(NeedStatus::Completed))
        .col_expr(need::Column::CompletedAt, Expr::value(now))
        .col_expr(need::Column::UpdatedAt, Expr::value(now))
        .filter(need::Column::Id.eq(need_id))
        .filter(need::Column::Status.eq(NeedStatus::PendingPickup))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::TransitionRejected {
            state: existing.status.as_str().to_string(),
            action: "confirm receipt".to_string(),
        });
    }

    let room_ids: Vec<i64> = ChatRoom::find()
        .filter(chat_room::Column::NeedId.eq(need_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|room| room.id)
        .collect();

    ChatRoom::update_many()
        .col_expr(chat_room::Column::IsActive, Expr::value(false))
        .filter(chat_room::Column::NeedId.eq(need_id))
        .exec(&txn)
        .await?;

    let completed = get_need(&txn, need_id)
        .await?
        .ok_or_else(|| Error::not_found("need", need_id))?;
    txn.commit().await?;

    for room_id in &room_ids {
        feed.publish(*room_id, RoomEvent::RoomArchived { room_id: *room_id })
            .await;
    }

    info!(need_id, rooms = room_ids.len(), "Receipt confirmed, rooms archived");
    Ok(completed)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::pledge::create_pledge;
    use crate::entities::Role;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn new_need(title: &str, quantity: i32) -> NewNeed {
        NewNeed {
            category: NeedCategory::Clothing,
            title: title.to_string(),
            description: "For the winter".to_string(),
            urgency: Urgency::Medium,
            quantity,
            image: None,
        }
    }

    #[tokio::test]
    async fn test_create_need_requires_home() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<home::Model>::new()])
            .into_connection();
        let dir = tempfile::tempdir()?;
        let store = test_store(&dir);

        let result = create_need(&db, &store, "nobody", new_need("Jackets", 5)).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_need_validation() -> Result<()> {
        let (db, store, _dir) = setup_with_store().await?;
        let home = create_approved_home(&db, "home-owner").await?;

        let result = create_need(&db, &store, &home.owner_id, new_need("   ", 5)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_need(&db, &store, &home.owner_id, new_need("Jackets", 0)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_unverified_home_cannot_post() -> Result<()> {
        let (db, store, _dir) = setup_with_store().await?;
        let home =
            create_home_with_status(&db, "home-owner", VerificationStatus::Reviewing).await?;

        let result = create_need(&db, &store, &home.owner_id, new_need("Jackets", 5)).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_need_integration() -> Result<()> {
        let (db, store, _dir) = setup_with_store().await?;
        let home = create_approved_home(&db, "home-owner").await?;

        let need = create_need(&db, &store, &home.owner_id, new_need("  Jackets ", 12)).await?;
        assert_eq!(need.title, "Jackets");
        assert_eq!(need.quantity, 12);
        assert_eq!(need.fulfilled_quantity, 0);
        assert_eq!(need.status, NeedStatus::Active);
        assert_eq!(need.home_id, home.id);
        assert!(need.completed_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_needs_orders_and_filters() -> Result<()> {
        let db = setup_test_db().await?;
        let home = create_approved_home(&db, "home-owner").await?;
        let hidden = create_home_with_status(&db, "pending-owner", VerificationStatus::Reviewing)
            .await?;

        let low = create_custom_need(&db, home.id, NeedCategory::Food, Urgency::Low, 3).await?;
        let critical =
            create_custom_need(&db, home.id, NeedCategory::Health, Urgency::Critical, 3).await?;
        create_custom_need(&db, hidden.id, NeedCategory::Food, Urgency::Critical, 3).await?;

        let all = list_needs(&db, &NeedFilter::default()).await?;
        let ids: Vec<i64> = all.iter().map(|n| n.need.id).collect();
        assert_eq!(ids, vec![critical.id, low.id]);
        assert_eq!(all[0].home.id, home.id);

        let food = list_needs(
            &db,
            &NeedFilter {
                category: Some(NeedCategory::Food),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(food.len(), 1);
        assert_eq!(food[0].need.id, low.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_need_quantity_floor() -> Result<()> {
        let db = setup_test_db().await?;
        let home = create_approved_home(&db, "home-owner").await?;
        let donor = create_test_profile(&db, "donor", Role::Donor).await?;
        let need = create_test_need(&db, home.id, 5).await?;
        create_pledge(&db, need.id, &donor, 2).await?;

        let result = update_need(
            &db,
            &home.owner_id,
            need.id,
            NeedUpdate {
                quantity: Some(2),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let updated = update_need(
            &db,
            &home.owner_id,
            need.id,
            NeedUpdate {
                quantity: Some(8),
                urgency: Some(Urgency::Critical),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.quantity, 8);
        assert_eq!(updated.fulfilled_quantity, 2);
        assert_eq!(updated.urgency, Urgency::Critical);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shrinking_quantity_never_undercuts_concurrent_pledge() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let db = Arc::new(setup_file_db(&dir).await?);
        let home = create_approved_home(&db, "home-owner").await?;
        let early = create_test_profile(&db, "early-donor", Role::Donor).await?;
        let late = create_test_profile(&db, "late-donor", Role::Donor).await?;

        for _ in 0..40 {
            let need = create_test_need(&db, home.id, 5).await?;
            create_pledge(&db, need.id, &early, 2).await?;
            let need_id = need.id;

            let shrink = {
                let db = Arc::clone(&db);
                let owner_id = home.owner_id.clone();
                tokio::spawn(async move {
                    let update = NeedUpdate {
                        quantity: Some(3),
                        ..Default::default()
                    };
                    update_need(&db, &owner_id, need_id, update).await
                })
            };
            let pledge = {
                let db = Arc::clone(&db);
                let late = late.clone();
                tokio::spawn(async move { create_pledge(&db, need_id, &late, 3).await })
            };
            let shrunk = shrink.await.unwrap();
            let pledged = pledge.await.unwrap();

            let after = get_need(&*db, need_id).await?.unwrap();
            assert!(after.fulfilled_quantity <= after.quantity, "{after:?}");
            assert!(!(shrunk.is_ok() && pledged.is_ok()));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_need_only_while_open() -> Result<()> {
        let db = setup_test_db().await?;
        let home = create_approved_home(&db, "home-owner").await?;
        let donor = create_test_profile(&db, "donor", Role::Donor).await?;

        let open = create_test_need(&db, home.id, 3).await?;
        delete_need(&db, &home.owner_id, open.id).await?;
        assert!(get_need(&db, open.id).await?.is_none());

        let pledged = create_test_need(&db, home.id, 3).await?;
        create_pledge(&db, pledged.id, &donor, 1).await?;
        let result = delete_need(&db, &home.owner_id, pledged.id).await;
        assert!(matches!(result, Err(Error::TransitionRejected { .. })));
        assert!(get_need(&db, pledged.id).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_other_homes_needs_are_invisible() -> Result<()> {
        let db = setup_test_db().await?;
        let home = create_approved_home(&db, "home-owner").await?;
        create_approved_home(&db, "other-owner").await?;
        let need = create_test_need(&db, home.id, 3).await?;

        let result = delete_need(&db, "other-owner", need.id).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_confirm_receipt_completes_and_archives() -> Result<()> {
        let db = setup_test_db().await?;
        let feed = RoomFeed::new();
        let home = create_approved_home(&db, "home-owner").await?;
        let donor = create_test_profile(&db, "donor", Role::Donor).await?;
        let need = create_test_need(&db, home.id, 2).await?;
        let room = create_pledge(&db, need.id, &donor, 2).await?;
        let mut subscription = feed.subscribe(room.id).await;

        let completed = confirm_receipt(&db, &feed, &home.owner_id, need.id).await?;
        assert_eq!(completed.status, NeedStatus::Completed);
        assert!(completed.completed_at.is_some());

        let archived = ChatRoom::find_by_id(room.id).one(&db).await?.unwrap();
        assert!(!archived.is_active);
        assert_eq!(
            subscription.recv().await.unwrap(),
            RoomEvent::RoomArchived { room_id: room.id }
        );

        // Completed is terminal
        let result = confirm_receipt(&db, &feed, &home.owner_id, need.id).await;
        assert!(matches!(result, Err(Error::TransitionRejected { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_confirm_receipt_requires_pending_pickup() -> Result<()> {
        let db = setup_test_db().await?;
        let feed = RoomFeed::new();
        let home = create_approved_home(&db, "home-owner").await?;
        let need = create_test_need(&db, home.id, 2).await?;

        let result = confirm_receipt(&db, &feed, &home.owner_id, need.id).await;
        assert!(matches!(result, Err(Error::TransitionRejected { .. })));

        let unchanged = get_need(&db, need.id).await?.unwrap();
        assert_eq!(unchanged.status, NeedStatus::Active);
        Ok(())
    }
}
