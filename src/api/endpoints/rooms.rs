//! Chat room endpoints, including the server-sent event feed.

use crate::{
    api::{AppState, extractors::AuthProfile, response::ApiResponse},
    core::chat::{self, RoomSummary},
    entities::{chat_room, message},
    errors::Result,
    realtime::RoomEvent,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, time::Duration};
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

/// Send message request.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    content: String,
    /// Client correlation id, echoed back on the stored row
    #[serde(default)]
    client_id: Option<String>,
}

/// Unread counter.
#[derive(Debug, Serialize)]
pub struct UnreadCount {
    count: u64,
}

/// Result of marking a room read.
#[derive(Debug, Serialize)]
pub struct MarkedRead {
    updated: u64,
}

async fn list(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<RoomSummary>>> {
    Ok(ApiResponse::ok(
        chat::rooms_for_participant(&*state.db, &profile).await?,
    ))
}

async fn unread_count(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
) -> Result<ApiResponse<UnreadCount>> {
    let count = chat::unread_count(&*state.db, &profile).await?;
    Ok(ApiResponse::ok(UnreadCount { count }))
}

async fn detail(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
) -> Result<ApiResponse<chat_room::Model>> {
    Ok(ApiResponse::ok(
        chat::get_room(&*state.db, room_id, &profile.id).await?,
    ))
}

async fn messages(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
) -> Result<ApiResponse<Vec<message::Model>>> {
    Ok(ApiResponse::ok(
        chat::list_messages(&*state.db, room_id, &profile.id).await?,
    ))
}

async fn send(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
    Json(req): Json<SendMessageRequest>,
) -> Result<ApiResponse<message::Model>> {
    let message = chat::send_message(
        &*state.db,
        &state.feed,
        room_id,
        &profile.id,
        &req.content,
        req.client_id,
        state.config.chat.max_message_length,
    )
    .await?;
    Ok(ApiResponse::created(message))
}

async fn mark_read(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
) -> Result<ApiResponse<MarkedRead>> {
    let updated = chat::mark_room_read(&*state.db, room_id, &profile.id).await?;
    Ok(ApiResponse::ok(MarkedRead { updated }))
}

/// Room event stream. The subscription ends when the client disconnects.
async fn events(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    chat::get_room(&*state.db, room_id, &profile.id).await?;
    let subscription = state.feed.subscribe(room_id).await;

    let stream = BroadcastStream::new(subscription.into_receiver()).filter_map(
        |result: std::result::Result<RoomEvent, _>| {
            result.ok().map(|event| {
                Ok(Event::default()
                    .event(event.name())
                    .json_data(&event)
                    .unwrap_or_else(|_| Event::default().data("error")))
            })
        },
    );

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/unread-count", get(unread_count))
        .route("/{id}", get(detail))
        .route("/{id}/messages", get(messages).post(send))
        .route("/{id}/read", post(mark_read))
        .route("/{id}/events", get(events))
}
