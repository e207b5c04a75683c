//! UseCase: 接続の切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectSessionUseCase::execute() / force_close()
//! - 全ルームからの除外と、プロジェクトルームごとの user-left 通知
//!
//! ### なぜこのテストが必要か
//! - 切断後にルームのメンバー集合へ接続が残らないことを保証
//! - 2 回目の呼び出しで通知が重複しないこと（冪等性）を確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：複数ルームに参加した接続の切断
//! - エッジケース：同じ接続の二重切断、存在しない接続の切断
//! - 致命的エラーによる強制切断

use std::sync::Arc;

use crate::domain::{
    ConnectionId, MessagePusher, OutboundEvent, RoomId, SessionError, SessionRepository,
};

use super::{heartbeat::HeartbeatTasks, rate_limiter::RateLimiter};

/// 切断処理のユースケース
pub struct DisconnectSessionUseCase {
    repository: Arc<dyn SessionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    rate_limiter: Arc<RateLimiter>,
    heartbeat_tasks: Arc<HeartbeatTasks>,
}

impl DisconnectSessionUseCase {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        rate_limiter: Arc<RateLimiter>,
        heartbeat_tasks: Arc<HeartbeatTasks>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            rate_limiter,
            heartbeat_tasks,
        }
    }

    /// 切断を実行
    ///
    /// # Returns
    ///
    /// * `Some(rooms)` - 接続が抜けたプロジェクトルーム（user-left を通知済み）
    /// * `None` - 接続はすでに片付け済み（何もしない）
    pub async fn execute(&self, connection_id: &ConnectionId) -> Option<Vec<RoomId>> {
        // 1. 付随するタスク・状態を破棄
        self.heartbeat_tasks.cancel(connection_id).await;
        self.rate_limiter.remove(connection_id).await;
        self.message_pusher.unregister_client(connection_id).await;

        // 2. 全ルームから外す
        let removed = self.repository.remove_connection(connection_id).await?;
        let user_id = removed.connection.user_id;

        // 3. 抜けたプロジェクトルームの残りのメンバーへ通知
        let mut left_rooms = Vec::new();
        for (room_id, remaining) in removed.rooms {
            if room_id.is_private() {
                continue;
            }
            let event = OutboundEvent::UserLeft {
                room_id: room_id.clone(),
                user_id: user_id.clone(),
            };
            if let Err(e) = self.message_pusher.broadcast(remaining, &event).await {
                tracing::warn!(room_id = %room_id, "Failed to broadcast user-left: {}", e);
            }
            left_rooms.push(room_id);
        }

        tracing::info!(
            %connection_id,
            user_id = %user_id,
            rooms = left_rooms.len(),
            "Connection removed"
        );
        Some(left_rooms)
    }

    /// 致命的エラーを通知してトランスポートを閉じ、切断処理を行う
    pub async fn force_close(&self, connection_id: &ConnectionId, error: SessionError) {
        tracing::warn!(%connection_id, code = error.code(), "Force-closing connection: {}", error);

        let reason = error.to_string();
        if let Err(e) = self
            .message_pusher
            .push_to(connection_id, &OutboundEvent::Error(error))
            .await
        {
            tracing::debug!(%connection_id, "Terminal error not delivered: {}", e);
        }
        self.message_pusher.close(connection_id, &reason).await;
        self.execute(connection_id).await;
    }
}
