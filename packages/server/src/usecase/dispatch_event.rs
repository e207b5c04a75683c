//! UseCase: 受信イベントの振り分け
//!
//! クライアントから受信したすべてのイベントはここを通ります。
//! 1. レート制限（イベントの種類を問わず、デコードに失敗したフレームも数える）
//! 2. デコード結果の確認
//! 3. イベントごとのユースケースへ振り分け
//!
//! 拒否したイベントは黙って捨てず、必ず `error` イベントで本人へ知らせます。

use std::sync::Arc;

use huddle_shared::time::Clock;

use crate::domain::{
    ConnectionId, InboundEvent, MessagePusher, OutboundEvent, RateLimitDecision, SessionError,
    SessionRepository, Timestamp,
};

use super::{
    disconnect_session::DisconnectSessionUseCase, join_room::JoinRoomUseCase,
    leave_room::LeaveRoomUseCase, rate_limiter::RateLimiter,
    relay_presence::RelayPresenceUseCase,
};

/// 受信イベント振り分けのユースケース
pub struct DispatchEventUseCase {
    repository: Arc<dyn SessionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    rate_limiter: Arc<RateLimiter>,
    join_room: Arc<JoinRoomUseCase>,
    leave_room: Arc<LeaveRoomUseCase>,
    relay_presence: Arc<RelayPresenceUseCase>,
    disconnect: Arc<DisconnectSessionUseCase>,
    clock: Arc<dyn Clock>,
}

impl DispatchEventUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        rate_limiter: Arc<RateLimiter>,
        join_room: Arc<JoinRoomUseCase>,
        leave_room: Arc<LeaveRoomUseCase>,
        relay_presence: Arc<RelayPresenceUseCase>,
        disconnect: Arc<DisconnectSessionUseCase>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            rate_limiter,
            join_room,
            leave_room,
            relay_presence,
            disconnect,
            clock,
        }
    }

    /// 何らかのフレームを受信したことを記録する（生存確認の応答を含む）
    pub async fn touch(&self, connection_id: &ConnectionId) -> bool {
        let now = Timestamp::new(self.clock.now_millis());
        self.repository.record_activity(connection_id, now).await
    }

    /// 受信イベントを処理する
    ///
    /// # Arguments
    ///
    /// * `connection_id` - 送信元の接続
    /// * `decoded` - テキストフレームのデコード結果
    ///
    /// # Returns
    ///
    /// * `Ok(())` - 処理した（または接続がすでに切断されていた）
    /// * `Err(SessionError)` - 拒否した（本人へ `error` イベントを送信済み）
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        decoded: Result<InboundEvent, SessionError>,
    ) -> Result<(), SessionError> {
        // 1. レート制限
        if self.rate_limiter.check(connection_id).await == RateLimitDecision::Throttled {
            tracing::warn!(%connection_id, "Inbound event throttled");
            return self.reject(connection_id, SessionError::RateLimited).await;
        }

        // 2. デコード結果
        let event = match decoded {
            Ok(event) => event,
            Err(error) => return self.reject(connection_id, error).await,
        };

        let Some(connection) = self.repository.find_connection(connection_id).await else {
            tracing::debug!(%connection_id, "Event from closed connection ignored");
            return Ok(());
        };
        tracing::debug!(%connection_id, event = event.name(), "Dispatching event");

        // 3. 振り分け
        let result = match event {
            InboundEvent::JoinRoom { room_id } => self
                .join_room
                .execute(&connection, &room_id)
                .await
                .map(|_| ()),
            InboundEvent::LeaveRoom { room_id } => {
                self.leave_room.execute(&connection, &room_id).await;
                Ok(())
            }
            InboundEvent::CursorMove { room_id, x, y } => self
                .relay_presence
                .cursor_move(&connection, &room_id, x, y)
                .await
                .map(|_| ()),
            InboundEvent::TypingStart {
                room_id,
                subject_id,
            } => self
                .relay_presence
                .typing(&connection, &room_id, subject_id, true)
                .await
                .map(|_| ()),
            InboundEvent::TypingStop {
                room_id,
                subject_id,
            } => self
                .relay_presence
                .typing(&connection, &room_id, subject_id, false)
                .await
                .map(|_| ()),
        };

        match result {
            Ok(()) => Ok(()),
            Err(error) => self.reject(connection_id, error).await,
        }
    }

    async fn reject(
        &self,
        connection_id: &ConnectionId,
        error: SessionError,
    ) -> Result<(), SessionError> {
        if error.is_fatal() {
            self.disconnect
                .force_close(connection_id, error.clone())
                .await;
        } else if let Err(e) = self
            .message_pusher
            .push_to(connection_id, &OutboundEvent::Error(error.clone()))
            .await
        {
            tracing::debug!(%connection_id, "Error event not delivered: {}", e);
        }
        Err(error)
    }
}
