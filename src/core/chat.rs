//! Chat room messaging and read state.
//!
//! A room has exactly two participants: the donor who pledged and the profile that owns
//! the home. Everyone else, admins included, is refused.

use crate::{
    core::home::{get_home, get_my_home},
    entities::{ChatRoom, Message, Need, NeedStatus, Role, chat_room, message, profile},
    errors::{Error, Result},
    realtime::{RoomEvent, RoomFeed},
};
use sea_orm::{QueryOrder, Select, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::{debug, instrument};

/// One row of the chat index page.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    /// The room
    pub room: chat_room::Model,
    /// Title of the pledged need
    pub need_title: String,
    /// Need status, so closed rooms can be shown as read-only
    pub need_status: Option<NeedStatus>,
    /// Latest message, if any
    pub last_message: Option<message::Model>,
    /// Messages from the other participant not yet read
    pub unread_count: u64,
}

/// Whether `user_id` is one of the room's two participants.
pub async fn is_participant<C>(db: &C, room: &chat_room::Model, user_id: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    if room.donor_id == user_id {
        return Ok(true);
    }
    Ok(get_home(db, room.home_id)
        .await?
        .is_some_and(|home| home.owner_id == user_id))
}

/// Loads a room the caller participates in.
pub async fn get_room<C>(db: &C, room_id: i64, user_id: &str) -> Result<chat_room::Model>
where
    C: ConnectionTrait,
{
    let room = ChatRoom::find_by_id(room_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("room", room_id))?;

    if !is_participant(db, &room, user_id).await? {
        return Err(Error::forbidden("You are not a participant of this room"));
    }
    Ok(room)
}

/// Sends a message to a room.
///
/// Content is trimmed and must be non-empty and at most `max_length` characters. Rooms
/// that are archived, or whose need is completed, reject the message with
/// [`Error::RoomClosed`] and nothing is written. After commit the row is pushed to the
/// room's subscribers.
#[instrument(skip(db, feed, content), fields(len = content.len()))]
pub async fn send_message(
    db: &DatabaseConnection,
    feed: &RoomFeed,
    room_id: i64,
    sender_id: &str,
    content: &str,
    client_id: Option<String>,
    max_length: usize,
) -> Result<message::Model> {
    let content = content.trim();
    if content.is_empty() {
        return Err(Error::validation("Message cannot be empty"));
    }
    if content.chars().count() > max_length {
        return Err(Error::validation(format!(
            "Message cannot be longer than {max_length} characters"
        )));
    }

    let txn = db.begin().await?;
    let room = get_room(&txn, room_id, sender_id).await?;

    let need_completed = Need::find_by_id(room.need_id)
        .one(&txn)
        .await?
        .is_none_or(|need| need.status == NeedStatus::Completed);
    if !room.is_active || need_completed {
        return Err(Error::RoomClosed { room_id });
    }

    let message = message::ActiveModel {
        room_id: Set(room_id),
        sender_id: Set(sender_id.to_string()),
        content: Set(content.to_string()),
        client_id: Set(client_id),
        is_read: Set(false),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    let delivered = feed
        .publish(
            room_id,
            RoomEvent::MessageInserted {
                message: message.clone(),
            },
        )
        .await;
    debug!(message_id = message.id, delivered, "Message sent");
    Ok(message)
}

/// Lists a room's messages in creation order.
pub async fn list_messages(
    db: &DatabaseConnection,
    room_id: i64,
    viewer_id: &str,
) -> Result<Vec<message::Model>> {
    get_room(db, room_id, viewer_id).await?;
    Message::find()
        .filter(message::Column::RoomId.eq(room_id))
        .order_by_asc(message::Column::CreatedAt)
        .order_by_asc(message::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Marks every unread message from the other participant as read.
///
/// Returns how many messages changed.
pub async fn mark_room_read(db: &DatabaseConnection, room_id: i64, reader_id: &str) -> Result<u64> {
    get_room(db, room_id, reader_id).await?;
    let result = Message::update_many()
        .col_expr(message::Column::IsRead, Expr::value(true))
        .filter(message::Column::RoomId.eq(room_id))
        .filter(message::Column::SenderId.ne(reader_id))
        .filter(message::Column::IsRead.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Rooms the profile participates in, resolved by role.
async fn participant_rooms(
    db: &DatabaseConnection,
    profile: &profile::Model,
) -> Result<Vec<chat_room::Model>> {
    let query = match profile.role {
        Role::Donor => ChatRoom::find().filter(chat_room::Column::DonorId.eq(profile.id.as_str())),
        Role::Home => match get_my_home(db, &profile.id).await? {
            Some(home) => ChatRoom::find().filter(chat_room::Column::HomeId.eq(home.id)),
            None => return Ok(Vec::new()),
        },
        Role::Admin => return Ok(Vec::new()),
    };
    query
        .order_by_desc(chat_room::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

fn unread_in_rooms(room_ids: Vec<i64>, reader_id: &str) -> Select<Message> {
    Message::find()
        .filter(message::Column::RoomId.is_in(room_ids))
        .filter(message::Column::SenderId.ne(reader_id))
        .filter(message::Column::IsRead.eq(false))
}

/// Counts unread messages from other participants across all of the profile's rooms.
pub async fn unread_count(db: &DatabaseConnection, profile: &profile::Model) -> Result<u64> {
    let room_ids: Vec<i64> = participant_rooms(db, profile)
        .await?
        .into_iter()
        .map(|room| room.id)
        .collect();
    if room_ids.is_empty() {
        return Ok(0);
    }
    unread_in_rooms(room_ids, &profile.id)
        .count(db)
        .await
        .map_err(Into::into)
}

/// Builds the chat index for a profile, most recently active room first.
pub async fn rooms_for_participant(
    db: &DatabaseConnection,
    profile: &profile::Model,
) -> Result<Vec<RoomSummary>> {
    let rooms = participant_rooms(db, profile).await?;
    let mut summaries = Vec::with_capacity(rooms.len());

    for room in rooms {
        let need = Need::find_by_id(room.need_id).one(db).await?;
        let last_message = Message::find()
            .filter(message::Column::RoomId.eq(room.id))
            .order_by_desc(message::Column::CreatedAt)
            .order_by_desc(message::Column::Id)
            .one(db)
            .await?;
        let unread_count = unread_in_rooms(vec![room.id], &profile.id).count(db).await?;

        summaries.push(RoomSummary {
            need_title: need.as_ref().map(|n| n.title.clone()).unwrap_or_default(),
            need_status: need.map(|n| n.status),
            last_message,
            unread_count,
            room,
        });
    }

    summaries.sort_by(|a, b| {
        let last_activity =
            |s: &RoomSummary| s.last_message.as_ref().map_or(s.room.created_at, |m| m.created_at);
        last_activity(b).cmp(&last_activity(a))
    });
    Ok(summaries)
}
