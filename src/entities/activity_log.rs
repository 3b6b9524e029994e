//! Activity log entity - Append-only audit trail of admin actions.
//! There is deliberately no update or delete function anywhere for this table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What an admin did
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    /// Intermediate verification step (review started, documents requested)
    #[sea_orm(string_value = "status_change")]
    StatusChange,
    /// Home approved
    #[sea_orm(string_value = "approve")]
    Approve,
    /// Home rejected
    #[sea_orm(string_value = "reject")]
    Reject,
    /// Home account suspended
    #[sea_orm(string_value = "suspend")]
    Suspend,
    /// Home account banned
    #[sea_orm(string_value = "ban")]
    Ban,
    /// Home account restored to active
    #[sea_orm(string_value = "reactivate")]
    Reactivate,
    /// Need removed by moderation
    #[sea_orm(string_value = "remove_need")]
    RemoveNeed,
}

/// Activity log database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_logs")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Action performed
    pub action: ActivityAction,
    /// Kind of entity acted upon (`"home"`, `"need"`)
    pub entity_type: String,
    /// Id of the entity acted upon
    pub entity_id: i64,
    /// Admin profile that acted
    pub user_id: String,
    /// Before/after labels, reasons and other details
    pub metadata: Json,
    /// When the action happened
    pub created_at: DateTimeUtc,
}

/// `ActivityLog` has no navigable relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
