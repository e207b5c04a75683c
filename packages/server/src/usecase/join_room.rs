//! UseCase: プロジェクトルームへの参加
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - 権限ストアによる認可、参加時の user-joined / room-joined 通知
//!
//! ### なぜこのテストが必要か
//! - 権限のないユーザーのメンバー集合への追加を防ぐ
//! - 取り消しと競合した参加で、取り消されたメンバーが復活しないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：権限のあるユーザーの参加
//! - 異常系：権限なし、個人ルームへの参加、権限ストアの障害
//! - エッジケース：二重参加、権限チェック中の取り消し

use std::sync::Arc;

use huddle_shared::time::Clock;

use crate::domain::{
    Connection, ConnectionId, MembershipChange, MessagePusher, OutboundEvent, PermissionStore,
    RepositoryError, RoomId, SessionError, SessionRepository, Timestamp, UserId, UserProfile,
    UserStore,
};

/// 権限チェックと取り消しが競合したときの再試行回数の上限
const MAX_JOIN_ATTEMPTS: usize = 3;

/// 参加の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// 参加した。`notified` は user-joined を送った接続の数
    Joined { notified: usize },
    /// すでにメンバーだった
    AlreadyMember,
    /// 処理中に接続が切断された
    ConnectionClosed,
}

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    repository: Arc<dyn SessionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    permission_store: Arc<dyn PermissionStore>,
    user_store: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
}

impl JoinRoomUseCase {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        permission_store: Arc<dyn PermissionStore>,
        user_store: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            permission_store,
            user_store,
            clock,
        }
    }

    /// ルームへの参加を実行
    ///
    /// 権限の確認は Repository のロックの外で行い、確認前に読んだ取り消し世代が
    /// 変わっていなければ反映する。変わっていれば確認からやり直す。
    pub async fn execute(
        &self,
        connection: &Connection,
        room_id: &RoomId,
    ) -> Result<JoinOutcome, SessionError> {
        if room_id.is_private() {
            return Err(SessionError::AccessDenied(room_id.clone()));
        }

        for attempt in 1..=MAX_JOIN_ATTEMPTS {
            let epoch = self
                .repository
                .revocation_epoch(&connection.user_id, room_id)
                .await;
            if !self.has_access(&connection.user_id, room_id).await {
                tracing::info!(
                    connection_id = %connection.id,
                    user_id = %connection.user_id,
                    room_id = %room_id,
                    "Join denied"
                );
                return Err(SessionError::AccessDenied(room_id.clone()));
            }

            let joined_at = Timestamp::new(self.clock.now_millis());
            match self
                .repository
                .add_member(&connection.id, room_id, Some(epoch), joined_at)
                .await
            {
                Ok(MembershipChange::Joined { others }) => {
                    let targets: Vec<_> = others.iter().map(|m| m.connection_id).collect();
                    let mut user_ids: Vec<UserId> =
                        others.into_iter().map(|member| member.user_id).collect();
                    user_ids.push(connection.user_id.clone());
                    user_ids.sort();
                    user_ids.dedup();

                    let notified = targets.len();
                    self.announce(connection, room_id, targets).await;
                    self.acknowledge(connection, room_id, user_ids).await;
                    tracing::info!(
                        connection_id = %connection.id,
                        user_id = %connection.user_id,
                        room_id = %room_id,
                        "Joined room"
                    );
                    return Ok(JoinOutcome::Joined { notified });
                }
                Ok(MembershipChange::AlreadyMember) => {
                    let user_ids = self.member_user_ids(room_id).await;
                    self.acknowledge(connection, room_id, user_ids).await;
                    return Ok(JoinOutcome::AlreadyMember);
                }
                Err(RepositoryError::StaleAuthorization(_)) => {
                    tracing::debug!(
                        connection_id = %connection.id,
                        room_id = %room_id,
                        attempt,
                        "Revocation raced join, re-checking permission"
                    );
                }
                Err(RepositoryError::ConnectionNotFound(_)) => {
                    return Ok(JoinOutcome::ConnectionClosed);
                }
                Err(e) => return Err(SessionError::ServiceUnavailable(e.to_string())),
            }
        }

        tracing::warn!(
            connection_id = %connection.id,
            room_id = %room_id,
            "Join kept racing revocations, denying"
        );
        Err(SessionError::AccessDenied(room_id.clone()))
    }

    async fn has_access(&self, user_id: &UserId, room_id: &RoomId) -> bool {
        match self.permission_store.has_access(user_id, room_id).await {
            Ok(allowed) => allowed,
            Err(e) => {
                tracing::warn!(room_id = %room_id, "Permission check failed, denying: {}", e);
                false
            }
        }
    }

    async fn member_user_ids(&self, room_id: &RoomId) -> Vec<UserId> {
        self.repository
            .find_room(room_id)
            .await
            .map(|room| room.user_ids())
            .unwrap_or_default()
    }

    /// 既存のメンバーへ user-joined を送る
    async fn announce(
        &self,
        connection: &Connection,
        room_id: &RoomId,
        targets: Vec<ConnectionId>,
    ) {
        if targets.is_empty() {
            return;
        }
        let profile = match self.user_store.get_profile(&connection.user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => UserProfile::fallback(&connection.user_id),
            Err(e) => {
                tracing::warn!(user_id = %connection.user_id, "Failed to load profile: {}", e);
                UserProfile::fallback(&connection.user_id)
            }
        };
        let event = OutboundEvent::UserJoined {
            room_id: room_id.clone(),
            user_id: connection.user_id.clone(),
            profile,
        };
        if let Err(e) = self.message_pusher.broadcast(targets, &event).await {
            tracing::warn!(room_id = %room_id, "Failed to broadcast user-joined: {}", e);
        }
    }

    /// 参加した本人へ room-joined を送る
    async fn acknowledge(&self, connection: &Connection, room_id: &RoomId, user_ids: Vec<UserId>) {
        let event = OutboundEvent::RoomJoined {
            room_id: room_id.clone(),
            user_ids,
        };
        if let Err(e) = self.message_pusher.push_to(&connection.id, &event).await {
            tracing::warn!(connection_id = %connection.id, "Failed to push room-joined: {}", e);
        }
    }
}
