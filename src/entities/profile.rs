//! Profile entity - One row per authenticated user.
//!
//! The primary key is the user id issued by the external auth provider, so a session
//! resolves to its role with a single primary-key lookup.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Platform role of a profile
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Browses needs and pledges against them
    #[sea_orm(string_value = "donor")]
    Donor,
    /// Operates a children's home and posts needs
    #[sea_orm(string_value = "home")]
    Home,
    /// Platform administrator
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// Profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// User id from the auth provider (`sub` claim)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Email address reported by the auth provider
    pub email: String,
    /// Name shown to other users
    pub display_name: String,
    /// Optional avatar image URL
    pub avatar_url: Option<String>,
    /// Role; decides which surfaces the user can reach
    pub role: Role,
    /// When the profile was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Profile and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A home-role profile owns at most one home
    #[sea_orm(has_many = "super::home::Entity")]
    Homes,
    /// Rooms opened by this profile as a donor
    #[sea_orm(has_many = "super::chat_room::Entity")]
    ChatRooms,
}

impl Related<super::home::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Homes.def()
    }
}

impl Related<super::chat_room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChatRooms.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
