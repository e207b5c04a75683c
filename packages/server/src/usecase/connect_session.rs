//! UseCase: ハンドシェイク認証と接続の確立
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectSessionUseCase::execute() メソッド
//! - トークン検証、アカウントの有効確認、個人ルームへの自動参加、ハートビートの起動
//!
//! ### どのような状況を想定しているか
//! - 正常系：有効なトークンでの接続
//! - 異常系：トークンなし、不正なトークン、無効化されたアカウント、ユーザーストアの障害

use std::sync::Arc;

use huddle_shared::time::Clock;

use crate::domain::{
    AccessToken, Connection, ConnectionId, MessagePusher, OutboundEvent, PusherChannel,
    SessionError, SessionRepository, Timestamp, TokenVerifier, UserStore,
};

use super::heartbeat::HeartbeatSupervisor;

/// 接続確立のユースケース
pub struct ConnectSessionUseCase {
    repository: Arc<dyn SessionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    token_verifier: Arc<dyn TokenVerifier>,
    user_store: Arc<dyn UserStore>,
    heartbeat: Arc<HeartbeatSupervisor>,
    clock: Arc<dyn Clock>,
}

impl ConnectSessionUseCase {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        token_verifier: Arc<dyn TokenVerifier>,
        user_store: Arc<dyn UserStore>,
        heartbeat: Arc<HeartbeatSupervisor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            token_verifier,
            user_store,
            heartbeat,
            clock,
        }
    }

    /// ハンドシェイクを認証し、接続を確立する
    ///
    /// # Arguments
    ///
    /// * `token` - ハンドシェイクで提示されたトークン
    /// * `sender` - 接続への送信チャンネル
    ///
    /// # Returns
    ///
    /// * `Ok(Connection)` - 確立した接続（個人ルームに参加済み、ハートビート起動済み）
    /// * `Err(SessionError)` - `Unauthenticated` / `AccountInactive` / `ServiceUnavailable`
    pub async fn execute(
        &self,
        token: Option<&str>,
        sender: PusherChannel,
    ) -> Result<Connection, SessionError> {
        let now = Timestamp::new(self.clock.now_millis());

        // 1. トークンの検証
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| SessionError::Unauthenticated("missing token".to_string()))?;
        let verified = self
            .token_verifier
            .verify(token)
            .map_err(|e| SessionError::Unauthenticated(e.to_string()))?;
        if verified.expires_at <= now {
            return Err(SessionError::Unauthenticated(
                "token has expired".to_string(),
            ));
        }

        // 2. アカウントの有効確認
        match self.user_store.is_active(&verified.user_id).await {
            Ok(true) => {}
            Ok(false) => return Err(SessionError::AccountInactive),
            Err(e) => return Err(SessionError::ServiceUnavailable(e.to_string())),
        }

        // 3. 接続を作成し、個人ルームへ参加
        let connection = Connection::new(
            ConnectionId::generate(),
            verified.user_id.clone(),
            AccessToken::new(token.to_string(), verified.expires_at),
            now,
        );
        let connection_id = connection.id;
        let private_room = connection.private_room();
        self.repository
            .insert_connection(connection)
            .await
            .map_err(|e| SessionError::ServiceUnavailable(e.to_string()))?;
        self.repository
            .add_member(&connection_id, &private_room, None, now)
            .await
            .map_err(|e| SessionError::ServiceUnavailable(e.to_string()))?;

        // 4. 送信チャンネルを登録し、接続の確立を本人へ通知
        self.message_pusher
            .register_client(connection_id, sender)
            .await;
        let connected = OutboundEvent::Connected {
            connection_id,
            user_id: verified.user_id.clone(),
        };
        if let Err(e) = self.message_pusher.push_to(&connection_id, &connected).await {
            tracing::warn!(%connection_id, "Failed to push connected event: {}", e);
        }

        // 5. ハートビートを開始
        self.heartbeat.start(connection_id).await;

        tracing::info!(%connection_id, user_id = %verified.user_id, "Connection established");

        self.repository
            .find_connection(&connection_id)
            .await
            .ok_or_else(|| SessionError::ServiceUnavailable("connection vanished".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MockTokenVerifier, MockUserStore, StoreError, TokenError, VerifiedToken},
        usecase::test_support::{START_MILLIS, TestSession, drain, user},
    };
    use tokio::sync::mpsc;

    fn verifier_for(user_id: &str, expires_at: i64) -> MockTokenVerifier {
        let user_id = user(user_id);
        let mut verifier = MockTokenVerifier::new();
        verifier.expect_verify().returning(move |_| {
            Ok(VerifiedToken {
                user_id: user_id.clone(),
                expires_at: Timestamp::new(expires_at),
            })
        });
        verifier
    }

    #[tokio::test]
    async fn test_connect_success() {
        // テスト項目: 有効なトークンで接続すると個人ルームに参加し、connected が届き、ハートビートが起動する
        // given (前提条件):
        let session = TestSession::new();
        session.add_user("alice", &[]).await;
        let services = session.services(Arc::new(verifier_for("alice", START_MILLIS + 60_000)));
        let (tx, mut rx) = mpsc::unbounded_channel();

        // when (操作):
        let connection = services.connect.execute(Some("valid"), tx).await.unwrap();

        // then (期待する結果):
        assert_eq!(connection.user_id, user("alice"));
        assert!(connection.is_member_of(&connection.private_room()));
        assert_eq!(connection.token.value, "valid");
        let frames = drain(&mut rx);
        assert_eq!(frames[0]["event"], "connected");
        assert_eq!(frames[0]["data"]["userId"], "alice");
        assert_eq!(
            frames[0]["data"]["connectionId"],
            connection.id.to_string()
        );
        assert!(services.heartbeat_tasks.is_running(&connection.id).await);
    }

    #[tokio::test]
    async fn test_connect_without_token() {
        // テスト項目: トークンなしのハンドシェイクは Unauthenticated になり、接続は作られない
        // given (前提条件):
        let session = TestSession::new();
        let mut verifier = MockTokenVerifier::new();
        verifier.expect_verify().never();
        let services = session.services(Arc::new(verifier));
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let result = services.connect.execute(None, tx.clone()).await;
        let blank = services.connect.execute(Some("  "), tx).await;

        // then (期待する結果):
        assert!(matches!(result, Err(SessionError::Unauthenticated(_))));
        assert!(matches!(blank, Err(SessionError::Unauthenticated(_))));
        assert_eq!(session.repository.count_connections().await, 0);
    }

    #[tokio::test]
    async fn test_connect_with_invalid_token() {
        // テスト項目: 検証に失敗したトークンは Unauthenticated になる
        // given (前提条件):
        let session = TestSession::new();
        let mut verifier = MockTokenVerifier::new();
        verifier
            .expect_verify()
            .returning(|_| Err(TokenError::InvalidSignature));
        let services = session.services(Arc::new(verifier));
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let result = services.connect.execute(Some("forged"), tx).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(SessionError::Unauthenticated(
                TokenError::InvalidSignature.to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_connect_with_expired_token() {
        // テスト項目: 有効期限を過ぎたトークンは Unauthenticated になる
        // given (前提条件):
        let session = TestSession::new();
        session.add_user("alice", &[]).await;
        let services = session.services(Arc::new(verifier_for("alice", START_MILLIS)));
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let result = services.connect.execute(Some("stale"), tx).await;

        // then (期待する結果):
        assert!(matches!(result, Err(SessionError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn test_connect_with_inactive_account() {
        // テスト項目: 無効化されたアカウントは AccountInactive になる
        // given (前提条件):
        let session = TestSession::new();
        session.add_user("alice", &[]).await;
        session.users.set_active(&user("alice"), false).await;
        let services = session.services(Arc::new(verifier_for("alice", START_MILLIS + 60_000)));
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let result = services.connect.execute(Some("valid"), tx).await;

        // then (期待する結果):
        assert_eq!(result, Err(SessionError::AccountInactive));
        assert_eq!(session.repository.count_connections().await, 0);
    }

    #[tokio::test]
    async fn test_connect_when_user_store_is_down() {
        // テスト項目: ユーザーストアの障害時は ServiceUnavailable になる
        // given (前提条件):
        let session = TestSession::new();
        let mut users = MockUserStore::new();
        users
            .expect_is_active()
            .returning(|_| Err(StoreError::Unavailable("connection refused".to_string())));
        let services = session.services_with(
            Arc::new(verifier_for("alice", START_MILLIS + 60_000)),
            Arc::new(users),
            session.permissions.clone(),
        );
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let result = services.connect.execute(Some("valid"), tx).await;

        // then (期待する結果):
        assert!(matches!(result, Err(SessionError::ServiceUnavailable(_))));
    }
}
