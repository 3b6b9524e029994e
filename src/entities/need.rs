//! Need entity - An itemized request posted by a verified home.
//!
//! `fulfilled_quantity` is the only counter written by several donors at once; see
//! `core::pledge` for the conditional update that keeps it within `quantity`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of item requested
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum NeedCategory {
    /// Food and groceries
    #[sea_orm(string_value = "food")]
    Food,
    /// Clothing and shoes
    #[sea_orm(string_value = "clothing")]
    Clothing,
    /// Books, stationery, school fees
    #[sea_orm(string_value = "education")]
    Education,
    /// Medicine and hygiene
    #[sea_orm(string_value = "health")]
    Health,
    /// Repairs, furniture, equipment
    #[sea_orm(string_value = "infrastructure")]
    Infrastructure,
}

/// How pressing a need is
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    /// Can wait
    #[sea_orm(string_value = "low")]
    Low,
    /// Needed soon
    #[sea_orm(string_value = "medium")]
    Medium,
    /// Needed now
    #[sea_orm(string_value = "critical")]
    Critical,
}

/// Fulfillment state: `active -> pending_pickup -> completed`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum NeedStatus {
    /// Open for pledges
    #[sea_orm(string_value = "active")]
    Active,
    /// Fully pledged, waiting for delivery
    #[sea_orm(string_value = "pending_pickup")]
    PendingPickup,
    /// Receipt confirmed by the home
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl NeedStatus {
    /// The single authority on need status transitions. Status never moves backwards.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::PendingPickup) | (Self::PendingPickup, Self::Completed)
        )
    }

    /// Snake-case label, as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::PendingPickup => "pending_pickup",
            Self::Completed => "completed",
        }
    }
}

impl NeedCategory {
    /// Snake-case label, as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Clothing => "clothing",
            Self::Education => "education",
            Self::Health => "health",
            Self::Infrastructure => "infrastructure",
        }
    }
}

/// Need database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "needs")]
pub struct Model {
    /// Unique identifier for the need
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Home that posted the need
    pub home_id: i64,
    /// Item category
    pub category: NeedCategory,
    /// Short title, e.g. "Winter jackets"
    pub title: String,
    /// Details for donors
    pub description: String,
    /// Urgency level
    pub urgency: Urgency,
    /// Units requested
    pub quantity: i32,
    /// Units pledged so far, never above `quantity`
    pub fulfilled_quantity: i32,
    /// Fulfillment state
    pub status: NeedStatus,
    /// Optional public image URL
    pub image_url: Option<String>,
    /// When the need was posted
    pub created_at: DateTimeUtc,
    /// When the row was last modified
    pub updated_at: DateTimeUtc,
    /// When the home confirmed receipt
    pub completed_at: Option<DateTimeUtc>,
}

impl Model {
    /// Units still open for pledges.
    #[must_use]
    pub const fn remaining(&self) -> i32 {
        self.quantity - self.fulfilled_quantity
    }
}

/// Defines relationships between Need and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each need belongs to one home
    #[sea_orm(
        belongs_to = "super::home::Entity",
        from = "Column::HomeId",
        to = "super::home::Column::Id"
    )]
    Home,
    /// One need has a chat room per pledge
    #[sea_orm(has_many = "super::chat_room::Entity")]
    ChatRooms,
}

impl Related<super::home::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Home.def()
    }
}

impl Related<super::chat_room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChatRooms.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
