//! Optimistic message timeline for a chat client.
//!
//! A sent message shows up immediately as pending, keyed by a client-generated UUID that
//! travels with the request and comes back on the persisted row. The push feed delivers at
//! least once and may race the HTTP response, so both paths reconcile through the same
//! correlation id, and rows already on the timeline are dropped by message id.

use crate::entities::message;
use uuid::Uuid;

/// Delivery state of one timeline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Sent, not yet acknowledged
    Pending,
    /// Persisted by the server
    Confirmed(message::Model),
}

/// A send that failed; its text goes back into the input box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedSend {
    /// Correlation id of the discarded entry
    pub client_id: String,
    /// Text to restore
    pub content: String,
}

/// One rendered line of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Correlation id, present for messages sent from this client
    pub client_id: Option<String>,
    /// Author
    pub sender_id: String,
    /// Text
    pub content: String,
    /// Delivery state
    pub delivery: Delivery,
}

impl Entry {
    fn message_id(&self) -> Option<i64> {
        match &self.delivery {
            Delivery::Confirmed(message) => Some(message.id),
            Delivery::Pending => None,
        }
    }

    /// Whether the entry is still waiting for the server.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.delivery, Delivery::Pending)
    }
}

/// Client-side view of one room.
#[derive(Debug, Clone)]
pub struct Timeline {
    viewer_id: String,
    entries: Vec<Entry>,
}

impl Timeline {
    /// Starts a timeline from the room's history.
    #[must_use]
    pub fn new(viewer_id: impl Into<String>, history: Vec<message::Model>) -> Self {
        let mut timeline = Self {
            viewer_id: viewer_id.into(),
            entries: Vec::with_capacity(history.len()),
        };
        for message in history {
            timeline.apply_incoming(message);
        }
        timeline
    }

    /// Appends a pending entry and returns its correlation id.
    pub fn begin_send(&mut self, content: impl Into<String>) -> String {
        let client_id = Uuid::new_v4().to_string();
        self.entries.push(Entry {
            client_id: Some(client_id.clone()),
            sender_id: self.viewer_id.clone(),
            content: content.into(),
            delivery: Delivery::Pending,
        });
        client_id
    }

    fn pending_index(&self, client_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.is_pending() && e.client_id.as_deref() == Some(client_id))
    }

    fn contains_message(&self, message_id: i64) -> bool {
        self.entries.iter().any(|e| e.message_id() == Some(message_id))
    }

    /// Attaches the persisted row to a pending entry.
    ///
    /// Returns `false` when there is nothing to confirm: the id is unknown (the entry was
    /// discarded) or the push feed already reconciled it.
    pub fn confirm(&mut self, client_id: &str, message: message::Model) -> bool {
        if self.contains_message(message.id) {
            return false;
        }
        let Some(index) = self.pending_index(client_id) else {
            return false;
        };
        let entry = &mut self.entries[index];
        entry.content.clone_from(&message.content);
        entry.delivery = Delivery::Confirmed(message);
        true
    }

    /// Discards a pending entry after a failed send.
    ///
    /// Entries that were confirmed in the meantime stay, and `None` is returned.
    pub fn fail(&mut self, client_id: &str) -> Option<FailedSend> {
        let index = self.pending_index(client_id)?;
        let entry = self.entries.remove(index);
        Some(FailedSend {
            client_id: client_id.to_string(),
            content: entry.content,
        })
    }

    /// Applies a row delivered by the push feed.
    ///
    /// A row echoing one of our pending sends confirms that entry; rows already on the
    /// timeline are ignored. Returns whether the timeline changed.
    pub fn apply_incoming(&mut self, message: message::Model) -> bool {
        if self.contains_message(message.id) {
            return false;
        }
        if let Some(index) = message
            .client_id
            .as_deref()
            .and_then(|client_id| self.pending_index(client_id))
        {
            let entry = &mut self.entries[index];
            entry.content.clone_from(&message.content);
            entry.delivery = Delivery::Confirmed(message);
            return true;
        }

        self.entries.push(Entry {
            client_id: message.client_id.clone(),
            sender_id: message.sender_id.clone(),
            content: message.content.clone(),
            delivery: Delivery::Confirmed(message),
        });
        true
    }

    /// Entries in display order: persisted rows by creation time, then pending sends in
    /// the order they were made.
    #[must_use]
    pub fn entries(&self) -> Vec<&Entry> {
        let mut confirmed: Vec<&Entry> = self.entries.iter().filter(|e| !e.is_pending()).collect();
        confirmed.sort_by_key(|e| match &e.delivery {
            Delivery::Confirmed(m) => (m.created_at, m.id),
            Delivery::Pending => (chrono::DateTime::<chrono::Utc>::MAX_UTC, i64::MAX),
        });
        confirmed.extend(self.entries.iter().filter(|e| e.is_pending()));
        confirmed
    }

    /// Number of sends still waiting for the server.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_pending()).count()
    }
}
