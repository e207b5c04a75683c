//! イベントのドメインモデル
//!
//! - `InboundEvent`: クライアントから受信するイベント（閉じた列挙型）
//! - `OutboundEvent`: クライアントへ送信するプレゼンス・ドメイン・エラーイベント
//! - `DomainEvent`: CRUD 層から届くドメイン変更（リソース種別 × 操作）

use std::{fmt, str::FromStr};

use super::{
    entity::UserProfile,
    error::SessionError,
    value_object::{ConnectionId, RoomId, UserId},
};

/// クライアント → サーバーのイベント
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    JoinRoom { room_id: RoomId },
    LeaveRoom { room_id: RoomId },
    CursorMove { room_id: RoomId, x: f64, y: f64 },
    TypingStart { room_id: RoomId, subject_id: String },
    TypingStop { room_id: RoomId, subject_id: String },
}

impl InboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join-room",
            Self::LeaveRoom { .. } => "leave-room",
            Self::CursorMove { .. } => "cursor-move",
            Self::TypingStart { .. } => "typing-start",
            Self::TypingStop { .. } => "typing-stop",
        }
    }
}

/// ドメイン変更の対象リソース
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Task,
    Status,
    Label,
    Comment,
    File,
    Widget,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        Self::Task,
        Self::Status,
        Self::Label,
        Self::Comment,
        Self::File,
        Self::Widget,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Status => "status",
            Self::Label => "label",
            Self::Comment => "comment",
            Self::File => "file",
            Self::Widget => "widget",
        }
    }
}

/// ドメイン変更の操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

/// ドメインイベント（例: `task-created`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomainEvent {
    pub resource: ResourceKind,
    pub action: ChangeAction,
}

impl DomainEvent {
    pub fn new(resource: ResourceKind, action: ChangeAction) -> Self {
        Self { resource, action }
    }

    pub fn name(&self) -> String {
        format!("{}-{}", self.resource.as_str(), self.action.as_str())
    }
}

impl fmt::Display for DomainEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.resource.as_str(), self.action.as_str())
    }
}

impl FromStr for DomainEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, action) = s
            .split_once('-')
            .ok_or_else(|| format!("unknown domain event '{}'", s))?;
        let resource = ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == resource)
            .ok_or_else(|| format!("unknown resource '{}'", resource))?;
        let action = match action {
            "created" => ChangeAction::Created,
            "updated" => ChangeAction::Updated,
            "deleted" => ChangeAction::Deleted,
            other => return Err(format!("unknown action '{}'", other)),
        };
        Ok(Self { resource, action })
    }
}

/// サーバー → クライアントのイベント
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    /// ハンドシェイク成功直後に本人へ送る
    Connected {
        connection_id: ConnectionId,
        user_id: UserId,
    },
    /// 参加成功時に本人へ送る（現在のメンバー一覧つき）
    RoomJoined {
        room_id: RoomId,
        user_ids: Vec<UserId>,
    },
    UserJoined {
        room_id: RoomId,
        user_id: UserId,
        profile: UserProfile,
    },
    UserLeft {
        room_id: RoomId,
        user_id: UserId,
    },
    UserTyping {
        room_id: RoomId,
        user_id: UserId,
        subject_id: String,
        is_typing: bool,
    },
    Cursor {
        room_id: RoomId,
        user_id: UserId,
        x: f64,
        y: f64,
    },
    Error(SessionError),
    /// CRUD 層からのドメイン変更。`data` には `projectId` が必ず含まれる
    Domain {
        event: DomainEvent,
        data: serde_json::Value,
    },
    /// 個人ルーム宛ての通知
    Notification {
        data: serde_json::Value,
    },
}

impl OutboundEvent {
    /// ワイヤ上のイベント名
    pub fn name(&self) -> String {
        match self {
            Self::Connected { .. } => "connected".to_string(),
            Self::RoomJoined { .. } => "room-joined".to_string(),
            Self::UserJoined { .. } => "user-joined".to_string(),
            Self::UserLeft { .. } => "user-left".to_string(),
            Self::UserTyping { .. } => "user-typing".to_string(),
            Self::Cursor { .. } => "cursors".to_string(),
            Self::Error(_) => "error".to_string(),
            Self::Domain { event, .. } => event.name(),
            Self::Notification { .. } => "notification".to_string(),
        }
    }
}
