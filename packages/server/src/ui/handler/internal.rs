//! Internal endpoints used by the CRUD layer.
//!
//! Requests are validated here and then queued on the session command worker,
//! so a successful call answers `202 Accepted` before the fan-out happens.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use serde_json::Value;

use crate::{
    domain::{DomainEvent, RoomId, UserId},
    infrastructure::dto::http::{EventRequestDto, EvictionRequestDto},
    ui::state::AppState,
    usecase::{CommandError, NOTIFICATION_EVENT},
};

/// Header carrying the shared secret of the internal endpoints
pub const INTERNAL_TOKEN_HEADER: &str = "x-internal-token";

/// Broadcast a domain change to everyone in a project room
pub async fn post_room_event(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<EventRequestDto>,
) -> Result<StatusCode, StatusCode> {
    authorize(&state, &headers)?;

    let room_id = parse_room_id(room_id)?;
    if room_id.is_private() {
        tracing::warn!(room_id = %room_id, "Refusing domain event for a private room");
        return Err(StatusCode::BAD_REQUEST);
    }
    parse_domain_event(&body.event)?;
    if !matches!(body.data, Value::Object(_) | Value::Null) {
        tracing::warn!(event = %body.event, "Domain event data must be an object");
        return Err(StatusCode::BAD_REQUEST);
    }

    state
        .session_handle
        .broadcast_to_room(room_id, body.event, body.data)
        .map_err(worker_unavailable)?;
    Ok(StatusCode::ACCEPTED)
}

/// Deliver an event to every connection of a user
pub async fn post_user_event(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<EventRequestDto>,
) -> Result<StatusCode, StatusCode> {
    authorize(&state, &headers)?;

    let user_id = parse_user_id(user_id)?;
    if body.event != NOTIFICATION_EVENT {
        parse_domain_event(&body.event)?;
    }

    state
        .session_handle
        .broadcast_to_user(user_id, body.event, body.data)
        .map_err(worker_unavailable)?;
    Ok(StatusCode::ACCEPTED)
}

/// Remove a user from a project room after their access was revoked
pub async fn post_eviction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<EvictionRequestDto>,
) -> Result<StatusCode, StatusCode> {
    authorize(&state, &headers)?;

    let user_id = parse_user_id(body.user_id)?;
    let room_id = parse_room_id(body.room_id)?;

    state
        .session_handle
        .evict(user_id, room_id)
        .map_err(worker_unavailable)?;
    Ok(StatusCode::ACCEPTED)
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), StatusCode> {
    let Some(expected) = state.internal_token.as_deref() else {
        return Ok(());
    };
    let provided = headers
        .get(INTERNAL_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    if provided == Some(expected) {
        Ok(())
    } else {
        tracing::warn!("Rejected internal request with a missing or wrong token");
        Err(StatusCode::UNAUTHORIZED)
    }
}

fn parse_room_id(raw: String) -> Result<RoomId, StatusCode> {
    RoomId::new(raw).map_err(|e| {
        tracing::warn!("Invalid room id: {}", e);
        StatusCode::BAD_REQUEST
    })
}

fn parse_user_id(raw: String) -> Result<UserId, StatusCode> {
    UserId::new(raw).map_err(|e| {
        tracing::warn!("Invalid user id: {}", e);
        StatusCode::BAD_REQUEST
    })
}

fn parse_domain_event(name: &str) -> Result<DomainEvent, StatusCode> {
    name.parse().map_err(|_| {
        tracing::warn!(event = %name, "Unknown event name");
        StatusCode::BAD_REQUEST
    })
}

fn worker_unavailable(error: CommandError) -> StatusCode {
    tracing::error!("Session command worker unavailable: {}", error);
    StatusCode::SERVICE_UNAVAILABLE
}
