//! Pledging against a need.
//!
//! A pledge is recorded as a chat room between the donor and the home. Claiming units,
//! flipping the need to `pending_pickup` and creating the room happen in one transaction,
//! and the claim itself is a single conditional `UPDATE` so two donors racing for the last
//! units cannot both win.

use crate::{
    core::home::get_home,
    entities::{ChatRoom, Need, NeedStatus, Role, chat_room, need, profile},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, instrument, warn};

/// Pledges `quantity` units of a need on behalf of `donor`.
///
/// Every refusal (wrong role, non-positive quantity, unknown need, home unable to
/// operate, need closed or short of units) is reported as [`Error::ClaimFailed`]; the
/// concrete cause only goes to the log.
#[instrument(skip(db, donor), fields(donor = %donor.id))]
pub async fn create_pledge(
    db: &DatabaseConnection,
    need_id: i64,
    donor: &profile::Model,
    quantity: i32,
) -> Result<chat_room::Model> {
    let claim_failed = |cause: &str| {
        warn!(need_id, quantity, cause, "Pledge refused");
        Error::ClaimFailed { need_id }
    };

    if donor.role != Role::Donor {
        return Err(claim_failed("pledger is not a donor"));
    }
    if quantity < 1 {
        return Err(claim_failed("quantity must be positive"));
    }

    let txn = db.begin().await?;

    let Some(need) = Need::find_by_id(need_id).one(&txn).await? else {
        return Err(claim_failed("need does not exist"));
    };
    let operating = get_home(&txn, need.home_id)
        .await?
        .is_some_and(|home| home.can_operate());
    if !operating {
        return Err(claim_failed("home is not verified or not active"));
    }

    // Claim: succeeds only while the need is active and has `quantity` units left.
    let claimed = Need::update_many()
        .col_expr(
            need::Column::FulfilledQuantity,
            Expr::col(need::Column::FulfilledQuantity).add(quantity),
        )
        .col_expr(need::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(need::Column::Id.eq(need_id))
        .filter(need::Column::Status.eq(NeedStatus::Active))
        .filter(
            Expr::col(need::Column::FulfilledQuantity)
                .lte(Expr::col(need::Column::Quantity).sub(quantity)),
        )
        .exec(&txn)
        .await?;
    if claimed.rows_affected == 0 {
        return Err(claim_failed(&format!(
            "need is {} with {} units left",
            need.status.as_str(),
            need.remaining()
        )));
    }

    // Fully pledged needs leave the explore page.
    let closed = Need::update_many()
        .col_expr(need::Column::Status, Expr::value(NeedStatus::PendingPickup))
        .filter(need::Column::Id.eq(need_id))
        .filter(need::Column::Status.eq(NeedStatus::Active))
        .filter(
            Expr::col(need::Column::FulfilledQuantity).gte(Expr::col(need::Column::Quantity)),
        )
        .exec(&txn)
        .await?;

    let room = chat_room::ActiveModel {
        need_id: Set(need_id),
        donor_id: Set(donor.id.clone()),
        home_id: Set(need.home_id),
        quantity: Set(quantity),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(
        need_id,
        room_id = room.id,
        fully_pledged = closed.rows_affected > 0,
        "Pledge recorded"
    );
    Ok(room)
}

/// Lists the pledges made against a need, oldest first.
pub async fn pledges_for_need<C>(db: &C, need_id: i64) -> Result<Vec<chat_room::Model>>
where
    C: ConnectionTrait,
{
    ChatRoom::find()
        .filter(chat_room::Column::NeedId.eq(need_id))
        .order_by_asc(chat_room::Column::CreatedAt)
        .order_by_asc(chat_room::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
