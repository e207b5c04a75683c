//! UseCase: ハートビートによる再検証
//!
//! 接続確立後に変わりうる認可状態（トークンの期限、アカウントの有効フラグ、
//! プロジェクトの権限）を 1 回分検証します。ハートビートタスクが定期的に呼び出します。
//!
//! 1. 生存確認: 前回の ping 以降なにも受信しておらず、タイムアウトを過ぎていれば強制切断
//! 2. トークン: 署名・期限を再検証し、失敗すれば強制切断
//! 3. アカウント: 無効化されていれば強制切断
//! 4. ルーム: 参加中のプロジェクトルームごとに権限を再確認し、失ったルームからだけ外す
//! 5. 次回のために ping を送り、送信時刻を記録（送れなければ強制切断）
//!
//! 外部ストアへの問い合わせ中は Repository のロックを保持しません。
//! 問い合わせ中に接続が切断された場合、Repository への反映は何もしません。

use std::sync::Arc;

use huddle_shared::time::Clock;

use crate::domain::{
    Connection, ConnectionId, MessagePusher, PermissionStore, RoomId, SessionError,
    SessionRepository, Timestamp, TokenVerifier, UserStore,
};

use super::{disconnect_session::DisconnectSessionUseCase, revocation::revoke_membership};

/// 1 回の再検証の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// 接続は維持。`revoked` は権限を失って外れたルーム
    Healthy { revoked: Vec<RoomId> },
    /// 致命的エラーで強制切断した
    Closed(SessionError),
    /// 接続はすでに存在しない
    Gone,
}

/// 再検証のユースケース
pub struct RevalidateSessionUseCase {
    repository: Arc<dyn SessionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    token_verifier: Arc<dyn TokenVerifier>,
    user_store: Arc<dyn UserStore>,
    permission_store: Arc<dyn PermissionStore>,
    disconnect: Arc<DisconnectSessionUseCase>,
    clock: Arc<dyn Clock>,
    liveness_timeout_millis: i64,
}

impl RevalidateSessionUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        token_verifier: Arc<dyn TokenVerifier>,
        user_store: Arc<dyn UserStore>,
        permission_store: Arc<dyn PermissionStore>,
        disconnect: Arc<DisconnectSessionUseCase>,
        clock: Arc<dyn Clock>,
        liveness_timeout_millis: i64,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            token_verifier,
            user_store,
            permission_store,
            disconnect,
            clock,
            liveness_timeout_millis,
        }
    }

    pub async fn execute(&self, connection_id: &ConnectionId) -> HeartbeatOutcome {
        let Some(connection) = self.repository.find_connection(connection_id).await else {
            return HeartbeatOutcome::Gone;
        };
        let now = Timestamp::new(self.clock.now_millis());

        // 1. 生存確認
        if connection.is_unresponsive(now, self.liveness_timeout_millis) {
            return self.close(connection_id, SessionError::LivenessTimeout).await;
        }

        // 2. トークン
        if let Err(error) = self.check_token(&connection, now) {
            return self.close(connection_id, error).await;
        }

        // 3. アカウント
        match self.user_store.is_active(&connection.user_id).await {
            Ok(true) => {}
            Ok(false) => return self.close(connection_id, SessionError::AccountInactive).await,
            Err(e) => {
                tracing::warn!(
                    %connection_id,
                    "User store unavailable during heartbeat, keeping connection: {}",
                    e
                );
            }
        }

        // 4. ルームごとの権限
        let mut revoked = Vec::new();
        for room_id in connection.project_rooms() {
            let allowed = match self
                .permission_store
                .has_access(&connection.user_id, room_id)
                .await
            {
                Ok(allowed) => allowed,
                Err(e) => {
                    tracing::warn!(room_id = %room_id, "Permission check failed, treating as revoked: {}", e);
                    false
                }
            };
            if !allowed
                && revoke_membership(
                    self.repository.as_ref(),
                    self.message_pusher.as_ref(),
                    connection_id,
                    room_id,
                )
                .await
            {
                revoked.push(room_id.clone());
            }
        }

        // 5. 次回の生存確認（送信できなければトランスポートはすでに失われている）
        if let Err(e) = self.message_pusher.ping(connection_id).await {
            tracing::debug!(%connection_id, "Failed to send ping: {}", e);
            return self.close(connection_id, SessionError::LivenessTimeout).await;
        }
        self.repository.record_probe(connection_id, now).await;

        HeartbeatOutcome::Healthy { revoked }
    }

    fn check_token(&self, connection: &Connection, now: Timestamp) -> Result<(), SessionError> {
        let verified = self
            .token_verifier
            .verify(&connection.token.value)
            .map_err(|e| SessionError::Unauthenticated(e.to_string()))?;
        if verified.user_id != connection.user_id {
            return Err(SessionError::Unauthenticated(
                "token subject does not match the connection".to_string(),
            ));
        }
        if connection.token.is_expired_at(now) || verified.expires_at <= now {
            return Err(SessionError::Unauthenticated("token has expired".to_string()));
        }
        Ok(())
    }

    async fn close(&self, connection_id: &ConnectionId, error: SessionError) -> HeartbeatOutcome {
        self.disconnect.force_close(connection_id, error.clone()).await;
        HeartbeatOutcome::Closed(error)
    }
}
