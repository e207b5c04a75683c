//! HTTP API request/response DTOs.

use serde::{Deserialize, Serialize};

/// Room summary for the room list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub id: String,
    pub member_count: usize,
    pub user_ids: Vec<String>,
    pub created_at: String,
}

/// Member detail for the room detail endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetailDto {
    pub connection_id: String,
    pub user_id: String,
    pub joined_at: String,
}

/// Room detail for the room detail endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailDto {
    pub id: String,
    pub members: Vec<MemberDetailDto>,
    pub created_at: String,
}

/// Body of the internal room/user event endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRequestDto {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Body of the internal eviction endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvictionRequestDto {
    pub user_id: String,
    pub room_id: String,
}
