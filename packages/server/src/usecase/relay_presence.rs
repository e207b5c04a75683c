//! UseCase: カーソル移動・入力中表示の中継
//!
//! 送信者がプロジェクトルームの現在のメンバーである場合だけ、
//! 送信者以外のメンバーへ中継します。

use std::sync::Arc;

use crate::domain::{Connection, OutboundEvent, RoomId, SessionError, SessionRepository};

use super::broadcast_event::BroadcastEventUseCase;

/// プレゼンス中継のユースケース
pub struct RelayPresenceUseCase {
    repository: Arc<dyn SessionRepository>,
    broadcaster: Arc<BroadcastEventUseCase>,
}

impl RelayPresenceUseCase {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        broadcaster: Arc<BroadcastEventUseCase>,
    ) -> Self {
        Self {
            repository,
            broadcaster,
        }
    }

    pub async fn cursor_move(
        &self,
        connection: &Connection,
        room_id: &RoomId,
        x: f64,
        y: f64,
    ) -> Result<usize, SessionError> {
        self.ensure_member(connection, room_id).await?;
        let event = OutboundEvent::Cursor {
            room_id: room_id.clone(),
            user_id: connection.user_id.clone(),
            x,
            y,
        };
        Ok(self
            .broadcaster
            .to_room(room_id, &event, Some(&connection.id))
            .await)
    }

    /// typing-start は `is_typing = true`、typing-stop は `false`
    pub async fn typing(
        &self,
        connection: &Connection,
        room_id: &RoomId,
        subject_id: String,
        is_typing: bool,
    ) -> Result<usize, SessionError> {
        self.ensure_member(connection, room_id).await?;
        let event = OutboundEvent::UserTyping {
            room_id: room_id.clone(),
            user_id: connection.user_id.clone(),
            subject_id,
            is_typing,
        };
        Ok(self
            .broadcaster
            .to_room(room_id, &event, Some(&connection.id))
            .await)
    }

    async fn ensure_member(
        &self,
        connection: &Connection,
        room_id: &RoomId,
    ) -> Result<(), SessionError> {
        if room_id.is_private()
            || !self
                .repository
                .room_members(room_id)
                .await
                .contains(&connection.id)
        {
            return Err(SessionError::NotInRoom(room_id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{TestSession, drain, event_names, room};

    fn create_usecase(session: &TestSession) -> RelayPresenceUseCase {
        RelayPresenceUseCase::new(
            session.repository.clone(),
            Arc::new(BroadcastEventUseCase::new(
                session.repository.clone(),
                session.pusher.clone(),
            )),
        )
    }

    #[tokio::test]
    async fn test_cursor_move_reaches_other_members_once() {
        // テスト項目: A と B が p1 に参加し、A のカーソル移動は B にちょうど 1 回だけ届く
        // given (前提条件):
        let session = TestSession::new();
        let usecase = create_usecase(&session);
        let (alice, mut alice_rx) = session.open("alice").await;
        let (bob, mut bob_rx) = session.open("bob").await;
        session.enter(&alice.id, "p1").await;
        session.enter(&bob.id, "p1").await;

        // when (操作):
        let sent = usecase.cursor_move(&alice, &room("p1"), 10.0, 20.0).await;

        // then (期待する結果):
        assert_eq!(sent, Ok(1));
        let frames = drain(&mut bob_rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["event"], "cursors");
        assert_eq!(frames[0]["data"]["userId"], "alice");
        assert_eq!(frames[0]["data"]["x"], 10.0);
        assert_eq!(frames[0]["data"]["y"], 20.0);
        assert!(event_names(&mut alice_rx).is_empty());
    }

    #[tokio::test]
    async fn test_cursor_move_does_not_reach_non_members() {
        // テスト項目: p1 のメンバーでない B にはカーソル移動が届かない
        // given (前提条件):
        let session = TestSession::new();
        let usecase = create_usecase(&session);
        let (alice, _alice_rx) = session.open("alice").await;
        let (_bob, mut bob_rx) = session.open("bob").await;
        session.enter(&alice.id, "p1").await;

        // when (操作):
        let sent = usecase.cursor_move(&alice, &room("p1"), 10.0, 20.0).await;

        // then (期待する結果):
        assert_eq!(sent, Ok(0));
        assert!(event_names(&mut bob_rx).is_empty());
    }

    #[tokio::test]
    async fn test_presence_from_non_member_is_rejected() {
        // テスト項目: 参加していないルームへのプレゼンスは NotInRoom になり、配信されない
        // given (前提条件):
        let session = TestSession::new();
        let usecase = create_usecase(&session);
        let (alice, _alice_rx) = session.open("alice").await;
        let (bob, mut bob_rx) = session.open("bob").await;
        session.enter(&bob.id, "p1").await;

        // when (操作):
        let cursor = usecase.cursor_move(&alice, &room("p1"), 1.0, 2.0).await;
        let typing = usecase
            .typing(&alice, &room("p1"), "task-1".to_string(), true)
            .await;
        let private = usecase
            .typing(&alice, &alice.private_room(), "task-1".to_string(), true)
            .await;

        // then (期待する結果):
        assert_eq!(cursor, Err(SessionError::NotInRoom(room("p1"))));
        assert_eq!(typing, Err(SessionError::NotInRoom(room("p1"))));
        assert_eq!(private, Err(SessionError::NotInRoom(alice.private_room())));
        assert!(event_names(&mut bob_rx).is_empty());
    }

    #[tokio::test]
    async fn test_typing_start_and_stop_share_event_shape() {
        // テスト項目: typing-start / typing-stop は同じ user-typing イベントの isTyping で区別される
        // given (前提条件):
        let session = TestSession::new();
        let usecase = create_usecase(&session);
        let (alice, _alice_rx) = session.open("alice").await;
        let (bob, mut bob_rx) = session.open("bob").await;
        session.enter(&alice.id, "p1").await;
        session.enter(&bob.id, "p1").await;

        // when (操作):
        usecase
            .typing(&alice, &room("p1"), "task-1".to_string(), true)
            .await
            .unwrap();
        usecase
            .typing(&alice, &room("p1"), "task-1".to_string(), false)
            .await
            .unwrap();

        // then (期待する結果):
        let frames = drain(&mut bob_rx);
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f["event"] == "user-typing"));
        assert!(frames.iter().all(|f| f["data"]["subjectId"] == "task-1"));
        assert_eq!(frames[0]["data"]["isTyping"], true);
        assert_eq!(frames[1]["data"]["isTyping"], false);
    }
}
