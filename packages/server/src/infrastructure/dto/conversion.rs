//! Conversion logic between DTOs and domain models.

use huddle_shared::time::timestamp_to_rfc3339;

use crate::domain::{InboundEvent, OutboundEvent, Room, RoomId, SessionError};
use crate::infrastructure::dto::{http as http_dto, websocket as dto};

// ========================================
// DTO → Domain
// ========================================

fn parse_room_id(raw: String) -> Result<RoomId, SessionError> {
    RoomId::new(raw).map_err(|e| SessionError::MalformedEvent(e.to_string()))
}

impl TryFrom<dto::ClientEvent> for InboundEvent {
    type Error = SessionError;

    fn try_from(event: dto::ClientEvent) -> Result<Self, Self::Error> {
        Ok(match event {
            dto::ClientEvent::JoinRoom(payload) => Self::JoinRoom {
                room_id: parse_room_id(payload.room_id)?,
            },
            dto::ClientEvent::LeaveRoom(payload) => Self::LeaveRoom {
                room_id: parse_room_id(payload.room_id)?,
            },
            dto::ClientEvent::CursorMove(payload) => Self::CursorMove {
                room_id: parse_room_id(payload.room_id)?,
                x: payload.x,
                y: payload.y,
            },
            dto::ClientEvent::TypingStart(payload) => Self::TypingStart {
                room_id: parse_room_id(payload.room_id)?,
                subject_id: payload.subject_id,
            },
            dto::ClientEvent::TypingStop(payload) => Self::TypingStop {
                room_id: parse_room_id(payload.room_id)?,
                subject_id: payload.subject_id,
            },
        })
    }
}

/// Decode a text frame received from a client.
pub fn decode_client_event(text: &str) -> Result<InboundEvent, SessionError> {
    let event: dto::ClientEvent =
        serde_json::from_str(text).map_err(|e| SessionError::MalformedEvent(e.to_string()))?;
    InboundEvent::try_from(event)
}

// ========================================
// Domain → DTO
// ========================================

impl From<&SessionError> for dto::ErrorPayload {
    fn from(error: &SessionError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
            room_id: error.room_id().map(|room| room.as_str().to_string()),
            fatal: error.is_fatal(),
        }
    }
}

/// Encode an outbound event as the JSON text of a WebSocket frame.
pub fn encode_outbound_event(event: &OutboundEvent) -> Result<String, serde_json::Error> {
    let typed = match event {
        OutboundEvent::Connected {
            connection_id,
            user_id,
        } => dto::ServerEvent::Connected(dto::ConnectedPayload {
            connection_id: connection_id.to_string(),
            user_id: user_id.as_str().to_string(),
        }),
        OutboundEvent::RoomJoined { room_id, user_ids } => {
            dto::ServerEvent::RoomJoined(dto::RoomJoinedPayload {
                room_id: room_id.as_str().to_string(),
                user_ids: user_ids.iter().map(|id| id.as_str().to_string()).collect(),
            })
        }
        OutboundEvent::UserJoined {
            room_id,
            user_id,
            profile,
        } => dto::ServerEvent::UserJoined(dto::UserJoinedPayload {
            room_id: room_id.as_str().to_string(),
            user_id: user_id.as_str().to_string(),
            display_name: profile.display_name.clone(),
            avatar_url: profile.avatar_url.clone(),
        }),
        OutboundEvent::UserLeft { room_id, user_id } => {
            dto::ServerEvent::UserLeft(dto::UserLeftPayload {
                room_id: room_id.as_str().to_string(),
                user_id: user_id.as_str().to_string(),
            })
        }
        OutboundEvent::UserTyping {
            room_id,
            user_id,
            subject_id,
            is_typing,
        } => dto::ServerEvent::UserTyping(dto::UserTypingPayload {
            room_id: room_id.as_str().to_string(),
            user_id: user_id.as_str().to_string(),
            subject_id: subject_id.clone(),
            is_typing: *is_typing,
        }),
        OutboundEvent::Cursor {
            room_id,
            user_id,
            x,
            y,
        } => dto::ServerEvent::Cursors(dto::CursorPayload {
            room_id: room_id.as_str().to_string(),
            user_id: user_id.as_str().to_string(),
            x: *x,
            y: *y,
        }),
        OutboundEvent::Error(error) => dto::ServerEvent::Error(error.into()),
        OutboundEvent::Domain { event, data } => {
            return serde_json::to_string(&dto::EventFrame {
                event: event.name(),
                data: data.clone(),
            });
        }
        OutboundEvent::Notification { data } => {
            return serde_json::to_string(&dto::EventFrame {
                event: event.name(),
                data: data.clone(),
            });
        }
    };
    serde_json::to_string(&typed)
}

impl From<&Room> for http_dto::RoomSummaryDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            member_count: room.members.len(),
            user_ids: room
                .user_ids()
                .into_iter()
                .map(|id| id.into_string())
                .collect(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        }
    }
}

impl From<&Room> for http_dto::RoomDetailDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            members: room
                .members
                .values()
                .map(|member| http_dto::MemberDetailDto {
                    connection_id: member.connection_id.to_string(),
                    user_id: member.user_id.as_str().to_string(),
                    joined_at: timestamp_to_rfc3339(member.joined_at.value()),
                })
                .collect(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChangeAction, DomainEvent, ResourceKind, UserId};
    use serde_json::{Value, json};

    fn room(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    #[test]
    fn test_decode_typing_stop() {
        // テスト項目: typing-stop が TypingStop に変換される
        // given (前提条件):
        let text = r#"{"event":"typing-stop","data":{"roomId":"p1","subjectId":"task-9"}}"#;

        // when (操作):
        let event = decode_client_event(text).unwrap();

        // then (期待する結果):
        assert_eq!(
            event,
            InboundEvent::TypingStop {
                room_id: room("p1"),
                subject_id: "task-9".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_rejects_blank_room_id() {
        // テスト項目: 空のルーム ID は malformed-event になる
        // given (前提条件):
        let text = r#"{"event":"join-room","data":{"roomId":"  "}}"#;

        // when (操作):
        let result = decode_client_event(text);

        // then (期待する結果):
        assert!(matches!(result, Err(SessionError::MalformedEvent(_))));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        // テスト項目: JSON でないテキストは malformed-event になる
        // given (前提条件):
        let text = "hello";

        // when (操作):
        let result = decode_client_event(text);

        // then (期待する結果):
        assert!(matches!(result, Err(SessionError::MalformedEvent(_))));
    }

    #[test]
    fn test_encode_cursor_event() {
        // テスト項目: カーソルイベントが cursors として送信者 ID と座標つきでエンコードされる
        // given (前提条件):
        let event = OutboundEvent::Cursor {
            room_id: room("p1"),
            user_id: UserId::new("alice".to_string()).unwrap(),
            x: 10.0,
            y: 20.0,
        };

        // when (操作):
        let text = encode_outbound_event(&event).unwrap();

        // then (期待する結果):
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "cursors",
                "data": {"roomId": "p1", "userId": "alice", "x": 10.0, "y": 20.0}
            })
        );
    }

    #[test]
    fn test_encode_access_revoked_error() {
        // テスト項目: 権限取り消しエラーがコード・ルーム・回復可能フラグつきでエンコードされる
        // given (前提条件):
        let event = OutboundEvent::Error(SessionError::AccessRevoked(room("p1")));

        // when (操作):
        let text = encode_outbound_event(&event).unwrap();

        // then (期待する結果):
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["event"], "error");
        assert_eq!(value["data"]["code"], "access-revoked");
        assert_eq!(value["data"]["roomId"], "p1");
        assert_eq!(value["data"]["fatal"], false);
    }

    #[test]
    fn test_encode_domain_event_keeps_name_and_data() {
        // テスト項目: ドメインイベントはイベント名とデータをそのまま持つ
        // given (前提条件):
        let event = OutboundEvent::Domain {
            event: DomainEvent::new(ResourceKind::Comment, ChangeAction::Deleted),
            data: json!({"projectId": "p1", "commentId": "c1"}),
        };

        // when (操作):
        let text = encode_outbound_event(&event).unwrap();

        // then (期待する結果):
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "comment-deleted",
                "data": {"projectId": "p1", "commentId": "c1"}
            })
        );
    }
}
