//! ドメイン層のエラー型

use thiserror::Error;

use super::value_object::RoomId;

/// 値オブジェクト生成時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("user id must not be empty")]
    UserIdEmpty,

    #[error("user id is too long ({0} bytes)")]
    UserIdTooLong(usize),

    #[error("user id '{0}' contains whitespace")]
    UserIdInvalidCharacter(String),

    #[error("room id must not be empty")]
    RoomIdEmpty,

    #[error("room id is too long ({0} bytes)")]
    RoomIdTooLong(usize),
}

/// Repository 操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// 接続が存在しない（切断済み）
    #[error("connection '{0}' not found")]
    ConnectionNotFound(String),

    /// 同じ接続 ID がすでに登録されている
    #[error("connection '{0}' is already registered")]
    DuplicateConnection(String),

    /// 権限チェック後にルームの取り消しが発生した
    #[error("authorization for room '{0}' changed while joining")]
    StaleAuthorization(String),
}

/// メッセージ送信（通知）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection '{0}' is not registered")]
    ClientNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),

    #[error("failed to encode event: {0}")]
    Encode(String),
}

/// 外部ストア（権限ストア、ユーザーストア）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// トークン検証のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token subject is invalid: {0}")]
    InvalidSubject(String),
}

/// クライアントに `error` イベントとして通知されるセッションエラー
///
/// `Unauthenticated` / `AccountInactive` / `LivenessTimeout` / `ServiceUnavailable` は
/// 接続にとって致命的で、通知後にトランスポートを閉じる。それ以外は回復可能。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("authentication failed: {0}")]
    Unauthenticated(String),

    #[error("account has been deactivated")]
    AccountInactive,

    #[error("access to project '{0}' denied")]
    AccessDenied(RoomId),

    #[error("your access to this project has been revoked ({0})")]
    AccessRevoked(RoomId),

    #[error("not a member of room '{0}'")]
    NotInRoom(RoomId),

    #[error("too many events, slow down")]
    RateLimited,

    #[error("connection timed out")]
    LivenessTimeout,

    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl SessionError {
    /// ワイヤ上のエラーコード
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::AccountInactive => "account-inactive",
            Self::AccessDenied(_) => "access-denied",
            Self::AccessRevoked(_) => "access-revoked",
            Self::NotInRoom(_) => "not-in-room",
            Self::RateLimited => "rate-limited",
            Self::LivenessTimeout => "connection-timeout",
            Self::MalformedEvent(_) => "malformed-event",
            Self::ServiceUnavailable(_) => "service-unavailable",
        }
    }

    /// 接続を閉じるべきエラーかどうか
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated(_)
                | Self::AccountInactive
                | Self::LivenessTimeout
                | Self::ServiceUnavailable(_)
        )
    }

    /// エラーの対象ルーム（ルーム単位のエラーのみ）
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::AccessDenied(room) | Self::AccessRevoked(room) | Self::NotInRoom(room) => {
                Some(room)
            }
            _ => None,
        }
    }
}
