//! Core business logic - framework-agnostic operations over the database.
//!
//! Every function takes its collaborators (database connection, room feed, object store)
//! as arguments; nothing in here knows about HTTP.

/// Admin moderation: account status, need removal, activity log
pub mod admin;
/// Chat room messaging, read state and unread counts
pub mod chat;
/// Home registration and profile management
pub mod home;
/// Need lifecycle: create, edit, browse, delete, confirm receipt
pub mod need;
/// Client-side optimistic message timeline
pub mod outbox;
/// Pledge creation and capacity bookkeeping
pub mod pledge;
/// Profile bootstrap and admin seeding
pub mod profile;
/// Platform statistics and CSV export
pub mod report;
/// Home verification state machine
pub mod verification;
