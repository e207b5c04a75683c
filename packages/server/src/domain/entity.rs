//! エンティティ
//!
//! - `Connection`: 認証済みのトランスポート単位のセッション
//! - `Room`: ファンアウト用の論理チャンネル（プロジェクトルーム、または個人ルーム）

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::value_object::{ConnectionId, RoomId, Timestamp, UserId};

/// ハンドシェイク時に提示されたトークンと有効期限
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Timestamp,
}

impl AccessToken {
    pub fn new(value: String, expires_at: Timestamp) -> Self {
        Self { value, expires_at }
    }

    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

/// ユーザーの公開プロフィール（プレゼンスイベントに含める）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UserProfile {
    /// プロフィールが取得できなかったときの代替値
    pub fn fallback(user_id: &UserId) -> Self {
        Self {
            display_name: user_id.as_str().to_string(),
            avatar_url: None,
        }
    }
}

/// 接続
///
/// 生存期間中、所有ユーザーは常に 1 人。作成時に個人ルームへ自動参加する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub user_id: UserId,
    pub token: AccessToken,
    /// 参加中のルーム（個人ルームを含む）
    pub rooms: BTreeSet<RoomId>,
    pub connected_at: Timestamp,
    /// 最後に何らかのフレームを受信した時刻
    pub last_seen_at: Timestamp,
    /// 最後に生存確認（ping）を送った時刻
    pub last_probe_at: Option<Timestamp>,
}

impl Connection {
    pub fn new(
        id: ConnectionId,
        user_id: UserId,
        token: AccessToken,
        connected_at: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            token,
            rooms: BTreeSet::new(),
            connected_at,
            last_seen_at: connected_at,
            last_probe_at: None,
        }
    }

    pub fn private_room(&self) -> RoomId {
        RoomId::private_for(&self.user_id)
    }

    pub fn is_member_of(&self, room_id: &RoomId) -> bool {
        self.rooms.contains(room_id)
    }

    /// 参加中のプロジェクトルーム（個人ルームを除く）
    pub fn project_rooms(&self) -> impl Iterator<Item = &RoomId> {
        self.rooms.iter().filter(|room| !room.is_private())
    }

    /// 送った ping に対して、まだ何も受信していないか
    pub fn has_pending_probe(&self) -> bool {
        matches!(self.last_probe_at, Some(probe) if self.last_seen_at < probe)
    }

    /// 応答のない ping から `timeout_millis` 以上経過しているか
    pub fn is_unresponsive(&self, now: Timestamp, timeout_millis: i64) -> bool {
        match self.last_probe_at {
            Some(probe) => self.has_pending_probe() && now.millis_since(probe) >= timeout_millis,
            None => false,
        }
    }

    /// 生存確認の送信を記録する
    ///
    /// 応答待ちの ping があるうちは時刻を進めない。タイムアウトは最も古い未応答の ping から数える。
    pub fn record_probe(&mut self, at: Timestamp) {
        if !self.has_pending_probe() {
            self.last_probe_at = Some(at);
        }
    }
}

/// ルームのメンバー（接続単位。1 ユーザーが複数タブで複数接続を持ちうる）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomMember {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub joined_at: Timestamp,
}

/// ルーム
///
/// メンバーシップは権限ストアから派生した非正規の構造。最初の参加で暗黙に作られ、空になれば破棄される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Room {
    pub id: RoomId,
    pub members: BTreeMap<ConnectionId, RoomMember>,
    pub created_at: Timestamp,
}

impl Room {
    pub fn new(id: RoomId, created_at: Timestamp) -> Self {
        Self {
            id,
            members: BTreeMap::new(),
            created_at,
        }
    }

    /// メンバーを追加する。すでにメンバーであれば `false`
    pub fn add_member(&mut self, member: RoomMember) -> bool {
        if self.members.contains_key(&member.connection_id) {
            return false;
        }
        self.members.insert(member.connection_id, member);
        true
    }

    pub fn remove_member(&mut self, connection_id: &ConnectionId) -> Option<RoomMember> {
        self.members.remove(connection_id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.members.keys().copied().collect()
    }

    /// メンバーのユーザー ID（重複なし、ソート済み）
    pub fn user_ids(&self) -> Vec<UserId> {
        self.members
            .values()
            .map(|member| member.user_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
