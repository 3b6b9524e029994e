//! Per-room push feed for chat messages.
//!
//! Each room gets its own broadcast channel, created on first subscribe. Dropping a
//! [`RoomSubscription`] is the only teardown needed; channels without receivers are pruned
//! the next time anyone subscribes.

use crate::entities::message;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::trace;

const ROOM_CHANNEL_CAPACITY: usize = 100;

/// Events delivered to room subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    /// A message row was inserted
    MessageInserted {
        /// The persisted row
        message: message::Model,
    },
    /// The room was archived; sending is now disabled
    RoomArchived {
        /// Archived room
        room_id: i64,
    },
}

impl RoomEvent {
    /// SSE event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MessageInserted { .. } => "message_inserted",
            Self::RoomArchived { .. } => "room_archived",
        }
    }
}

/// Broadcast hub keyed by room id.
#[derive(Clone, Default)]
pub struct RoomFeed {
    channels: Arc<RwLock<HashMap<i64, broadcast::Sender<RoomEvent>>>>,
}

/// A live subscription to one room. Unsubscribes on drop.
#[derive(Debug)]
pub struct RoomSubscription {
    /// Room being watched
    pub room_id: i64,
    receiver: broadcast::Receiver<RoomEvent>,
}

impl RoomSubscription {
    /// Waits for the next event. Returns `None` once the feed is gone.
    ///
    /// Lagging subscribers skip the dropped events; the client refetches history on
    /// reconnect, and the outbox tolerates duplicates.
    pub async fn recv(&mut self) -> Option<RoomEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    trace!(room_id = self.room_id, skipped, "Room subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Hands out the raw receiver, e.g. to wrap it in a stream.
    #[must_use]
    pub fn into_receiver(self) -> broadcast::Receiver<RoomEvent> {
        self.receiver
    }
}

impl RoomFeed {
    /// Creates an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to a room, creating its channel if needed.
    pub async fn subscribe(&self, room_id: i64) -> RoomSubscription {
        let mut channels = self.channels.write().await;
        channels.retain(|id, sender| *id == room_id || sender.receiver_count() > 0);

        let sender = channels
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0);
        RoomSubscription {
            room_id,
            receiver: sender.subscribe(),
        }
    }

    /// Publishes an event to every current subscriber of a room.
    ///
    /// Returns how many subscribers received it. Rooms nobody watches are skipped.
    pub async fn publish(&self, room_id: i64, event: RoomEvent) -> usize {
        let channels = self.channels.read().await;
        channels
            .get(&room_id)
            .and_then(|sender| sender.send(event).ok())
            .unwrap_or(0)
    }

    /// Number of rooms with a live channel.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn message(id: i64, room_id: i64) -> message::Model {
        message::Model {
            id,
            room_id,
            sender_id: "donor-1".to_string(),
            content: "hello".to_string(),
            client_id: None,
            is_read: false,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_events_are_scoped_to_room() {
        let feed = RoomFeed::new();
        let mut room_one = feed.subscribe(1).await;
        let mut room_two = feed.subscribe(2).await;

        let delivered = feed
            .publish(1, RoomEvent::MessageInserted { message: message(10, 1) })
            .await;
        assert_eq!(delivered, 1);

        let event = room_one.recv().await.unwrap();
        assert_eq!(event.name(), "message_inserted");

        feed.publish(2, RoomEvent::RoomArchived { room_id: 2 }).await;
        assert_eq!(
            room_two.recv().await.unwrap(),
            RoomEvent::RoomArchived { room_id: 2 }
        );
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let feed = RoomFeed::new();
        let delivered = feed.publish(5, RoomEvent::RoomArchived { room_id: 5 }).await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_dropped_subscriptions_are_pruned() {
        let feed = RoomFeed::new();
        let first = feed.subscribe(1).await;
        drop(first);
        assert_eq!(feed.channel_count().await, 1);

        let _second = feed.subscribe(2).await;
        assert_eq!(feed.channel_count().await, 1);
    }
}
