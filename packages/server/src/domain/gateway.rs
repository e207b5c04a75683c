//! 外部コラボレーターのインターフェース
//!
//! 権限ストア、ユーザーストア、トークン検証はセッション層の外側（CRUD 層・認証基盤）が所有します。
//! セッション層はこれらの trait にのみ依存します。

use async_trait::async_trait;

use super::{
    entity::UserProfile,
    error::{StoreError, TokenError},
    value_object::{RoomId, Timestamp, UserId},
};

/// 権限ストア
///
/// 参加時と各ハートビートで、その時点の権限を問い合わせる。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// `user_id` がプロジェクトルーム `project` にアクセスできるか
    async fn has_access(&self, user_id: &UserId, project: &RoomId) -> Result<bool, StoreError>;
}

/// ユーザーストア
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// アカウントが有効か
    async fn is_active(&self, user_id: &UserId) -> Result<bool, StoreError>;

    /// 公開プロフィール（存在しなければ `None`）
    async fn get_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError>;
}

/// 検証済みトークンの内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: UserId,
    pub expires_at: Timestamp,
}

/// トークン検証
///
/// ハンドシェイク時と各ハートビートで呼ばれる。
#[cfg_attr(test, mockall::automock)]
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError>;
}
