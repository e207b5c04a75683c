//! Message formatting utilities for client display.

use huddle_server::infrastructure::dto::websocket::{EventFrame, ServerEvent};
use huddle_shared::time::timestamp_to_rfc3339;

use crate::session_adapter::AdapterAction;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a frame received from the server
    pub fn format_event(frame: &EventFrame) -> String {
        let Some(event) = frame.to_server_event() else {
            return format!("\n← {}: {}\n", frame.event, frame.data);
        };

        match event {
            ServerEvent::Connected(connected) => format!(
                "\n* connected as {} (connection {})\n",
                connected.user_id, connected.connection_id
            ),
            ServerEvent::RoomJoined(joined) => format!(
                "\n============================================================\n\
                 Joined {}\n\
                 Members: {}\n\
                 ============================================================\n",
                joined.room_id,
                joined.user_ids.join(", ")
            ),
            ServerEvent::UserJoined(joined) => format!(
                "\n+ {} ({}) joined {}\n",
                joined.display_name, joined.user_id, joined.room_id
            ),
            ServerEvent::UserLeft(left) => {
                format!("\n- {} left {}\n", left.user_id, left.room_id)
            }
            ServerEvent::UserTyping(typing) => {
                let verb = if typing.is_typing {
                    "is typing on"
                } else {
                    "stopped typing on"
                };
                format!(
                    "\n~ {} {} {} in {}\n",
                    typing.user_id, verb, typing.subject_id, typing.room_id
                )
            }
            ServerEvent::Cursors(cursor) => format!(
                "\n@ {} cursor at ({}, {}) in {}\n",
                cursor.user_id, cursor.x, cursor.y, cursor.room_id
            ),
            ServerEvent::Error(error) => match error.room_id {
                Some(room_id) => format!("\n! [{}] {} ({})\n", error.code, error.message, room_id),
                None => format!("\n! [{}] {}\n", error.code, error.message),
            },
        }
    }

    /// Format what the session adapter decided, if the user should see it
    pub fn format_action(action: &AdapterAction) -> Option<String> {
        match action {
            AdapterAction::Invalidate {
                project_id,
                category,
            } => Some(format!(
                "  (cache: {} of {} invalidated)\n",
                category.as_str(),
                project_id
            )),
            AdapterAction::LeaveProjectView { project_id } => Some(format!(
                "\nAccess to {} was revoked, leaving the project view\n",
                project_id
            )),
            AdapterAction::BackOff => None,
            AdapterAction::Notify(message) => Some(format!("\nNotice: {}\n", message)),
            AdapterAction::Reauthenticate { reason, .. } => Some(format!(
                "\nSession ended: {}. Sign in again to continue.\n",
                reason
            )),
        }
    }

    /// Format a confirmation message after sending
    pub fn format_sent_confirmation(sent_at: i64) -> String {
        format!("sent at {}\n", timestamp_to_rfc3339(sent_at))
    }

    pub fn format_binary_message(byte_count: usize) -> String {
        format!("\n← Received {} bytes of binary data\n", byte_count)
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_adapter::CacheCategory;
    use serde_json::{Value, json};

    fn frame(event: &str, data: Value) -> EventFrame {
        EventFrame {
            event: event.to_string(),
            data,
        }
    }

    #[test]
    fn test_format_room_joined() {
        // テスト項目: ルーム参加の応答にメンバー一覧が表示される
        // given (前提条件):
        let frame = frame("room-joined", json!({ "roomId": "p1", "userIds": ["alice", "bob"] }));

        // when (操作):
        let result = MessageFormatter::format_event(&frame);

        // then (期待する結果):
        assert!(result.contains("Joined p1"));
        assert!(result.contains("Members: alice, bob"));
    }

    #[test]
    fn test_format_user_joined() {
        // テスト項目: 参加通知に表示名とユーザー ID が表示される
        // given (前提条件):
        let frame = frame(
            "user-joined",
            json!({ "roomId": "p1", "userId": "bob", "displayName": "Bob", "avatarUrl": null }),
        );

        // when (操作):
        let result = MessageFormatter::format_event(&frame);

        // then (期待する結果):
        assert!(result.contains("+ Bob (bob) joined p1"));
    }

    #[test]
    fn test_format_typing_stopped() {
        // テスト項目: 入力終了の通知が正しくフォーマットされる
        // given (前提条件):
        let frame = frame(
            "user-typing",
            json!({ "roomId": "p1", "userId": "bob", "subjectId": "task-1", "isTyping": false }),
        );

        // when (操作):
        let result = MessageFormatter::format_event(&frame);

        // then (期待する結果):
        assert!(result.contains("bob stopped typing on task-1 in p1"));
    }

    #[test]
    fn test_format_error_with_room() {
        // テスト項目: エラーにはコードとルームが表示される
        // given (前提条件):
        let frame = frame(
            "error",
            json!({ "code": "not-in-room", "message": "not a member of room 'p1'", "roomId": "p1", "fatal": false }),
        );

        // when (操作):
        let result = MessageFormatter::format_event(&frame);

        // then (期待する結果):
        assert!(result.contains("[not-in-room]"));
        assert!(result.contains("(p1)"));
    }

    #[test]
    fn test_format_domain_event_falls_back_to_raw_json() {
        // テスト項目: ドメインイベントはイベント名とデータがそのまま表示される
        // given (前提条件):
        let frame = frame("task-created", json!({ "projectId": "p1" }));

        // when (操作):
        let result = MessageFormatter::format_event(&frame);

        // then (期待する結果):
        assert!(result.contains("task-created"));
        assert!(result.contains("\"projectId\":\"p1\""));
    }

    #[test]
    fn test_back_off_is_not_shown() {
        // テスト項目: BackOff はユーザーに表示されず、無効化は表示される
        // given (前提条件):
        let invalidate = AdapterAction::Invalidate {
            project_id: "p1".to_string(),
            category: CacheCategory::Labels,
        };

        // when (操作):
        let back_off = MessageFormatter::format_action(&AdapterAction::BackOff);
        let invalidated = MessageFormatter::format_action(&invalidate);

        // then (期待する結果):
        assert_eq!(back_off, None);
        assert_eq!(invalidated.as_deref(), Some("  (cache: labels of p1 invalidated)\n"));
    }

    #[test]
    fn test_format_sent_confirmation() {
        // テスト項目: 送信確認メッセージが正しくフォーマットされる
        // given (前提条件):
        let sent_at = 1672498800000;

        // when (操作):
        let result = MessageFormatter::format_sent_confirmation(sent_at);

        // then (期待する結果):
        assert!(result.contains("sent at"));
        assert!(result.contains("2022-12-31T15:00:00"));
    }

    #[test]
    fn test_format_raw_message() {
        // テスト項目: 生メッセージが正しくフォーマットされる
        // given (前提条件):
        let text = "unknown message format";

        // when (操作):
        let result = MessageFormatter::format_raw_message(text);

        // then (期待する結果):
        assert!(result.contains("unknown message format"));
        assert!(result.contains("Received:"));
    }
}
