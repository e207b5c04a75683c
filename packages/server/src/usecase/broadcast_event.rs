//! UseCase: ルーム・ユーザー単位のブロードキャスト
//!
//! プレゼンスイベントとドメインイベントの配信をまとめて扱います。
//! メンバーの取得と送信の間にメンバーが変わっても、送信は配信時点でのメンバーにだけ届きます。

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{
    ConnectionId, DomainEvent, MessagePusher, OutboundEvent, RoomId, SessionRepository, UserId,
};

use super::error::BroadcastError;

/// 個人ルーム宛ての汎用通知のイベント名
pub const NOTIFICATION_EVENT: &str = "notification";

/// ブロードキャストのユースケース
pub struct BroadcastEventUseCase {
    repository: Arc<dyn SessionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl BroadcastEventUseCase {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// ルームの全メンバー（`exclude` を除く）へ送る
    ///
    /// # Returns
    ///
    /// 送信対象にした接続の数
    pub async fn to_room(
        &self,
        room_id: &RoomId,
        event: &OutboundEvent,
        exclude: Option<&ConnectionId>,
    ) -> usize {
        let targets: Vec<ConnectionId> = self
            .repository
            .room_members(room_id)
            .await
            .into_iter()
            .filter(|id| Some(id) != exclude)
            .collect();
        let count = targets.len();

        if let Err(e) = self.message_pusher.broadcast(targets, event).await {
            tracing::warn!(room_id = %room_id, event = %event.name(), "Broadcast failed: {}", e);
            return 0;
        }
        tracing::debug!(room_id = %room_id, event = %event.name(), targets = count, "Broadcast to room");
        count
    }

    /// ユーザーの全接続（個人ルーム）へ送る
    pub async fn to_user(&self, user_id: &UserId, event: &OutboundEvent) -> usize {
        self.to_room(&RoomId::private_for(user_id), event, None).await
    }

    /// CRUD 層からのドメインイベントをプロジェクトルームへ配信する
    ///
    /// `data` には `projectId` を必ず含める（指定がなければ補う）。
    pub async fn domain_event(
        &self,
        room_id: &RoomId,
        event_name: &str,
        data: Value,
    ) -> Result<usize, BroadcastError> {
        let Some(project_id) = room_id.project_id() else {
            return Err(BroadcastError::NotAProjectRoom(room_id.to_string()));
        };
        let event: DomainEvent = event_name
            .parse()
            .map_err(|_| BroadcastError::UnknownEvent(event_name.to_string()))?;

        let mut data = match data {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            _ => return Err(BroadcastError::InvalidData),
        };
        data.insert("projectId".to_string(), Value::String(project_id.to_string()));

        let outbound = OutboundEvent::Domain {
            event,
            data: Value::Object(data),
        };
        Ok(self.to_room(room_id, &outbound, None).await)
    }

    /// CRUD 層からのイベントをユーザーの個人ルームへ配信する
    ///
    /// ドメインイベント名か `notification` を受け付ける。
    pub async fn user_event(
        &self,
        user_id: &UserId,
        event_name: &str,
        data: Value,
    ) -> Result<usize, BroadcastError> {
        let outbound = if event_name == NOTIFICATION_EVENT {
            OutboundEvent::Notification { data }
        } else {
            let event: DomainEvent = event_name
                .parse()
                .map_err(|_| BroadcastError::UnknownEvent(event_name.to_string()))?;
            OutboundEvent::Domain { event, data }
        };
        Ok(self.to_user(user_id, &outbound).await)
    }
}
