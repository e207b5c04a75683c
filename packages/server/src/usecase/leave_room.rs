//! UseCase: ルームからの退出

use std::sync::Arc;

use crate::domain::{Connection, MessagePusher, OutboundEvent, RoomId, SessionRepository};

/// ルーム退出のユースケース
pub struct LeaveRoomUseCase {
    repository: Arc<dyn SessionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl LeaveRoomUseCase {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// ルームから退出し、残りのメンバーへ user-left を送る
    ///
    /// メンバーでないルームや個人ルームの退出は何もせず `false` を返す。
    pub async fn execute(&self, connection: &Connection, room_id: &RoomId) -> bool {
        if room_id.is_private() {
            return false;
        }
        let Some(removal) = self.repository.remove_member(&connection.id, room_id).await else {
            return false;
        };

        let event = OutboundEvent::UserLeft {
            room_id: room_id.clone(),
            user_id: removal.user_id,
        };
        if let Err(e) = self.message_pusher.broadcast(removal.remaining, &event).await {
            tracing::warn!(room_id = %room_id, "Failed to broadcast user-left: {}", e);
        }
        tracing::info!(connection_id = %connection.id, room_id = %room_id, "Left room");
        true
    }
}
