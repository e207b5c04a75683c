//! CRUD 層 → セッション層の一方向コマンド
//!
//! CRUD 層はセッション層の内部状態に直接触れず、`SessionHandle` にコマンドを送るだけです。
//! コマンドワーカーは受け取った順にコマンドを適用します。

use std::sync::Arc;

use serde_json::Value;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::domain::{RoomId, UserId};

use super::{
    broadcast_event::BroadcastEventUseCase, error::CommandError, evict_member::EvictMemberUseCase,
};

/// セッション層へのコマンド
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// ドメイン変更をプロジェクトルームへ配信
    BroadcastToRoom {
        room_id: RoomId,
        event: String,
        data: Value,
    },
    /// 通知をユーザーの全接続へ配信
    BroadcastToUser {
        user_id: UserId,
        event: String,
        data: Value,
    },
    /// 権限の取り消しによる即時退出
    Evict { user_id: UserId, room_id: RoomId },
}

/// コマンド送信用のハンドル
#[derive(Debug, Clone)]
pub struct SessionHandle {
    sender: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn send(&self, command: SessionCommand) -> Result<(), CommandError> {
        self.sender
            .send(command)
            .map_err(|_| CommandError::WorkerStopped)
    }

    pub fn broadcast_to_room(
        &self,
        room_id: RoomId,
        event: impl Into<String>,
        data: Value,
    ) -> Result<(), CommandError> {
        self.send(SessionCommand::BroadcastToRoom {
            room_id,
            event: event.into(),
            data,
        })
    }

    pub fn broadcast_to_user(
        &self,
        user_id: UserId,
        event: impl Into<String>,
        data: Value,
    ) -> Result<(), CommandError> {
        self.send(SessionCommand::BroadcastToUser {
            user_id,
            event: event.into(),
            data,
        })
    }

    pub fn evict(&self, user_id: UserId, room_id: RoomId) -> Result<(), CommandError> {
        self.send(SessionCommand::Evict { user_id, room_id })
    }
}

/// コマンドワーカーを起動する
///
/// すべての `SessionHandle` が破棄されるとワーカーは終了する。
pub fn spawn_command_worker(
    broadcaster: Arc<BroadcastEventUseCase>,
    evict_member: Arc<EvictMemberUseCase>,
) -> (SessionHandle, JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::unbounded_channel();

    let worker = tokio::spawn(async move {
        while let Some(command) = receiver.recv().await {
            match command {
                SessionCommand::BroadcastToRoom {
                    room_id,
                    event,
                    data,
                } => {
                    if let Err(e) = broadcaster.domain_event(&room_id, &event, data).await {
                        tracing::warn!(room_id = %room_id, "Rejected room broadcast: {}", e);
                    }
                }
                SessionCommand::BroadcastToUser {
                    user_id,
                    event,
                    data,
                } => {
                    if let Err(e) = broadcaster.user_event(&user_id, &event, data).await {
                        tracing::warn!(user_id = %user_id, "Rejected user broadcast: {}", e);
                    }
                }
                SessionCommand::Evict { user_id, room_id } => {
                    evict_member.execute(&user_id, &room_id).await;
                }
            }
        }
        tracing::info!("Session command worker stopped");
    });

    (SessionHandle { sender }, worker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::SessionRepository,
        usecase::test_support::{TestSession, event_names, room, user},
    };
    use serde_json::json;

    fn spawn(session: &TestSession) -> (SessionHandle, JoinHandle<()>) {
        spawn_command_worker(
            Arc::new(BroadcastEventUseCase::new(
                session.repository.clone(),
                session.pusher.clone(),
            )),
            Arc::new(EvictMemberUseCase::new(
                session.repository.clone(),
                session.pusher.clone(),
            )),
        )
    }

    #[tokio::test]
    async fn test_commands_apply_in_arrival_order() {
        // テスト項目: コマンドは送った順に適用される（配信 → 退出 → 配信）
        // given (前提条件):
        let session = TestSession::new();
        let (alice, mut alice_rx) = session.open("alice").await;
        let (bob, mut bob_rx) = session.open("bob").await;
        session.enter(&alice.id, "p1").await;
        session.enter(&bob.id, "p1").await;
        let (handle, worker) = spawn(&session);

        // when (操作):
        handle
            .broadcast_to_room(room("p1"), "task-created", json!({ "taskId": "t1" }))
            .unwrap();
        handle.evict(user("bob"), room("p1")).unwrap();
        handle
            .broadcast_to_room(room("p1"), "task-deleted", json!({ "taskId": "t1" }))
            .unwrap();
        drop(handle);
        worker.await.unwrap();

        // then (期待する結果):
        assert_eq!(
            event_names(&mut alice_rx),
            vec!["task-created", "user-left", "task-deleted"]
        );
        assert_eq!(event_names(&mut bob_rx), vec!["task-created", "error"]);
        assert_eq!(session.repository.room_members(&room("p1")).await, vec![alice.id]);
    }

    #[tokio::test]
    async fn test_invalid_command_does_not_stop_worker() {
        // テスト項目: 不正なコマンドは破棄され、後続のコマンドは処理される
        // given (前提条件):
        let session = TestSession::new();
        let (_alice, mut alice_rx) = session.open("alice").await;
        let (handle, worker) = spawn(&session);

        // when (操作):
        handle
            .broadcast_to_user(user("alice"), "rocket-launched", json!({}))
            .unwrap();
        handle
            .broadcast_to_user(user("alice"), "notification", json!({ "message": "hi" }))
            .unwrap();
        drop(handle);
        worker.await.unwrap();

        // then (期待する結果):
        assert_eq!(event_names(&mut alice_rx), vec!["notification"]);
    }

    #[tokio::test]
    async fn test_send_after_worker_stopped_fails() {
        // テスト項目: ワーカー停止後の送信は WorkerStopped になる
        // given (前提条件):
        let session = TestSession::new();
        let (handle, worker) = spawn(&session);
        worker.abort();
        let _ = worker.await;

        // when (操作):
        let result = handle.evict(user("bob"), room("p1"));

        // then (期待する結果):
        assert_eq!(result, Err(CommandError::WorkerStopped));
    }
}
