//! Message entity - Append-only chat messages within a room.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Message database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    /// Unique identifier for the message
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Room the message was posted in
    pub room_id: i64,
    /// Profile that sent it
    pub sender_id: String,
    /// Message text
    pub content: String,
    /// Correlation id generated by the sending client, echoed back on the feed
    pub client_id: Option<String>,
    /// Whether the other participant has opened the room since
    pub is_read: bool,
    /// Server-assigned creation time; defines ordering within the room
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Message and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each message belongs to one room
    #[sea_orm(
        belongs_to = "super::chat_room::Entity",
        from = "Column::RoomId",
        to = "super::chat_room::Column::Id"
    )]
    ChatRoom,
}

impl Related<super::chat_room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChatRoom.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
