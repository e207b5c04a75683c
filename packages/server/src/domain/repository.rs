//! Repository trait 定義
//!
//! 接続とルームのメンバーシップを保持するストアのインターフェース。
//! 1 つのルームのメンバー集合と 1 つの接続のルーム集合への変更は、すべてこの trait の
//! 実装内で直列化される。外部 I/O（権限チェック）の待機中にロックを保持してはならないため、
//! UseCase 層は「先に問い合わせ、後でこの trait で反映する」順序で使う。

use async_trait::async_trait;

use super::{
    entity::{Connection, Room, RoomMember},
    error::RepositoryError,
    value_object::{ConnectionId, RoomId, Timestamp, UserId},
};

/// `add_member` の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipChange {
    /// 新たに参加した。`others` は参加前からいたメンバー
    Joined { others: Vec<RoomMember> },
    /// すでにメンバーだった
    AlreadyMember,
}

/// メンバーシップ削除の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRemoval {
    pub user_id: UserId,
    /// 削除後にルームに残っているメンバー
    pub remaining: Vec<ConnectionId>,
}

/// 接続削除の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedConnection {
    pub connection: Connection,
    /// 接続が参加していたルームと、削除後に残っているメンバー
    pub rooms: Vec<(RoomId, Vec<ConnectionId>)>,
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// 接続を登録
    async fn insert_connection(&self, connection: Connection) -> Result<(), RepositoryError>;

    /// 接続のスナップショットを取得
    async fn find_connection(&self, connection_id: &ConnectionId) -> Option<Connection>;

    /// 接続を削除し、参加していた全ルームから外す（存在しなければ `None`）
    async fn remove_connection(&self, connection_id: &ConnectionId) -> Option<RemovedConnection>;

    /// ユーザーが持つ全接続
    async fn connections_of_user(&self, user_id: &UserId) -> Vec<ConnectionId>;

    /// ユーザーのルームに対する取り消し世代（そのユーザーの接続がルームから取り消されるたびに増える）
    async fn revocation_epoch(&self, user_id: &UserId, room_id: &RoomId) -> u64;

    /// ルームへ参加させる
    ///
    /// `expected_epoch` が指定され、接続の所有ユーザーの現在の取り消し世代と異なる場合は
    /// `RepositoryError::StaleAuthorization` を返して何も変更しない。
    async fn add_member(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
        expected_epoch: Option<u64>,
        joined_at: Timestamp,
    ) -> Result<MembershipChange, RepositoryError>;

    /// ルームから外す（メンバーでなければ `None`）
    async fn remove_member(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Option<MemberRemoval>;

    /// 権限の取り消しによりルームから外す。接続が存在すれば、メンバーでなくても
    /// 所有ユーザーの取り消し世代を進める（メンバーでなければ `None`）
    async fn revoke_member(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Option<MemberRemoval>;

    /// ルームの現在のメンバー
    async fn room_members(&self, room_id: &RoomId) -> Vec<ConnectionId>;

    /// 受信を記録（接続が存在しなければ `false`）
    async fn record_activity(&self, connection_id: &ConnectionId, at: Timestamp) -> bool;

    /// 生存確認の送信を記録（応答待ちの ping があれば時刻は据え置き。接続が存在しなければ `false`）
    async fn record_probe(&self, connection_id: &ConnectionId, at: Timestamp) -> bool;

    /// 存在するルームの一覧
    async fn list_rooms(&self) -> Vec<Room>;

    async fn find_room(&self, room_id: &RoomId) -> Option<Room>;

    async fn count_connections(&self) -> usize;
}
