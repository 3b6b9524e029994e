//! Home verification workflow.
//!
//! [`VerificationStatus::apply`] is the one place that decides which admin action is
//! legal in which state. [`update_verification`] persists the result together with the
//! derived `verified` flag and an activity log entry, in one transaction.
//!
//! ```text
//! received ──BeginReview──▶ reviewing ──RequestDocuments──▶ needs_documents
//!                              │  ▲                               │
//!                              │  └──────────BeginReview──────────┤
//!                              └────Approve──▶ approved ◀─Approve─┘
//! any non-terminal ──Reject{reason}──▶ rejected
//! ```

use crate::{
    entities::{ActivityAction, Home, VerificationStatus, activity_log, home},
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

/// Admin actions on a home's verification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum VerificationAction {
    /// Start (or resume) reviewing the application
    BeginReview,
    /// Ask the home for more documents
    RequestDocuments,
    /// Approve the home
    Approve,
    /// Reject the home; the reason is shown to the home
    Reject {
        /// Free-text reason, required
        reason: String,
    },
}

impl VerificationAction {
    /// Short label used in errors.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::BeginReview => "begin review",
            Self::RequestDocuments => "request documents",
            Self::Approve => "approve",
            Self::Reject { .. } => "reject",
        }
    }

    /// Activity log action recorded for this transition.
    #[must_use]
    pub const fn activity(&self) -> ActivityAction {
        match self {
            Self::BeginReview | Self::RequestDocuments => ActivityAction::StatusChange,
            Self::Approve => ActivityAction::Approve,
            Self::Reject { .. } => ActivityAction::Reject,
        }
    }
}

impl VerificationStatus {
    /// Computes the state reached by applying `action`, or rejects the transition.
    pub fn apply(self, action: &VerificationAction) -> Result<Self> {
        use VerificationAction as A;
        use VerificationStatus as S;

        let next = match (self, action) {
            (S::Received | S::NeedsDocuments, A::BeginReview) => Some(S::Reviewing),
            (S::Reviewing, A::RequestDocuments) => Some(S::NeedsDocuments),
            (S::Reviewing | S::NeedsDocuments, A::Approve) => Some(S::Approved),
            (S::Received | S::Reviewing | S::NeedsDocuments, A::Reject { reason }) => {
                if reason.trim().is_empty() {
                    return Err(Error::validation("A rejection reason is required"));
                }
                Some(S::Rejected)
            }
            _ => None,
        };

        next.ok_or_else(|| Error::TransitionRejected {
            state: self.as_str().to_string(),
            action: action.label().to_string(),
        })
    }
}

/// Applies an admin action to a home's verification status.
///
/// Writes the new status, the derived `verified` flag and (for rejections) the reason,
/// then appends one activity log row with `from`, `to`, `status_label` and, for
/// rejections, `rejection_reason` in its metadata. Concurrent admins are not
/// coordinated: each call re-reads the row inside its transaction and the last write wins.
#[instrument(skip(db))]
pub async fn update_verification(
    db: &DatabaseConnection,
    home_id: i64,
    admin_id: &str,
    action: VerificationAction,
) -> Result<home::Model> {
    let txn = db.begin().await?;

    let existing = Home::find_by_id(home_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("home", home_id))?;

    let from = existing.verification_status;
    let to = from.apply(&action)?;

    let mut metadata = json!({
        "from": from,
        "to": to,
        "status_label": to.label(),
    });

    let mut model: home::ActiveModel = existing.into();
    model.verification_status = Set(to);
    model.verified = Set(to.is_verified());
    model.updated_at = Set(chrono::Utc::now());
    if let VerificationAction::Reject { reason } = &action {
        let reason = reason.trim().to_string();
        metadata["rejection_reason"] = json!(reason);
        model.rejection_reason = Set(Some(reason));
    }
    let updated = model.update(&txn).await?;

    append_activity(&txn, action.activity(), "home", home_id, admin_id, metadata).await?;

    txn.commit().await?;
    info!(home_id, from = ?from, to = ?to, "Verification status updated");
    Ok(updated)
}

/// Appends an activity log row. The table has no update or delete path.
pub(crate) async fn append_activity<C>(
    db: &C,
    action: ActivityAction,
    entity_type: &str,
    entity_id: i64,
    user_id: &str,
    metadata: serde_json::Value,
) -> Result<activity_log::Model>
where
    C: ConnectionTrait,
{
    activity_log::ActiveModel {
        action: Set(action),
        entity_type: Set(entity_type.to_string()),
        entity_id: Set(entity_id),
        user_id: Set(user_id.to_string()),
        metadata: Set(metadata),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}
