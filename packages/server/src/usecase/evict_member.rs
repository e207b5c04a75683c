//! UseCase: 権限の取り消しによる即時退出
//!
//! CRUD 層が権限を取り消した直後に呼び出します。ハートビートの 3 番目の検証を
//! 次のティックを待たずに行うものです。

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher, RoomId, SessionRepository, UserId};

use super::revocation::revoke_membership;

/// 退出処理のユースケース
pub struct EvictMemberUseCase {
    repository: Arc<dyn SessionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl EvictMemberUseCase {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// `user_id` の全接続を `room_id` から外す
    ///
    /// # Returns
    ///
    /// 外した接続（ルームにいなければ空）
    pub async fn execute(&self, user_id: &UserId, room_id: &RoomId) -> Vec<ConnectionId> {
        if room_id.is_private() {
            return Vec::new();
        }

        let mut evicted = Vec::new();
        for connection_id in self.repository.connections_of_user(user_id).await {
            if revoke_membership(
                self.repository.as_ref(),
                self.message_pusher.as_ref(),
                &connection_id,
                room_id,
            )
            .await
            {
                evicted.push(connection_id);
            }
        }

        if evicted.is_empty() {
            tracing::debug!(user_id = %user_id, room_id = %room_id, "Nothing to evict");
        } else {
            tracing::info!(
                user_id = %user_id,
                room_id = %room_id,
                connections = evicted.len(),
                "Evicted user from room"
            );
        }
        evicted
    }
}
