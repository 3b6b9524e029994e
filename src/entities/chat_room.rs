//! Chat room entity - One room per pledge, doubling as the pledge record.
//!
//! Rooms are never deleted. When the underlying need completes, `is_active` flips to
//! false and the room becomes read-only.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Chat room / pledge database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chat_rooms")]
pub struct Model {
    /// Unique identifier for the room
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Need the pledge was made against
    pub need_id: i64,
    /// Donor profile that pledged
    pub donor_id: String,
    /// Home that owns the need
    pub home_id: i64,
    /// Units pledged
    pub quantity: i32,
    /// False once archived
    pub is_active: bool,
    /// When the pledge was made
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `ChatRoom` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each room belongs to one need
    #[sea_orm(
        belongs_to = "super::need::Entity",
        from = "Column::NeedId",
        to = "super::need::Column::Id"
    )]
    Need,
    /// Each room belongs to the pledging donor
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::DonorId",
        to = "super::profile::Column::Id"
    )]
    Donor,
    /// Each room belongs to the home that owns the need
    #[sea_orm(
        belongs_to = "super::home::Entity",
        from = "Column::HomeId",
        to = "super::home::Column::Id"
    )]
    Home,
    /// One room has many messages
    #[sea_orm(has_many = "super::message::Entity")]
    Messages,
}

impl Related<super::need::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Need.def()
    }
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donor.def()
    }
}

impl Related<super::message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
