//! インメモリの権限ストア・ユーザーストア

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{PermissionStore, RoomId, StoreError, UserId, UserProfile, UserStore};

/// ユーザー ID → アクセスできるプロジェクト ID の集合
#[derive(Debug, Default)]
pub struct InMemoryPermissionStore {
    grants: RwLock<HashMap<UserId, HashSet<String>>>,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn grant(&self, user_id: UserId, project_id: impl Into<String>) {
        let mut grants = self.grants.write().await;
        grants.entry(user_id).or_default().insert(project_id.into());
    }

    /// 権限を取り消す（存在しなければ `false`）
    pub async fn revoke(&self, user_id: &UserId, project_id: &str) -> bool {
        let mut grants = self.grants.write().await;
        grants
            .get_mut(user_id)
            .is_some_and(|projects| projects.remove(project_id))
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn has_access(&self, user_id: &UserId, project: &RoomId) -> Result<bool, StoreError> {
        let Some(project_id) = project.project_id() else {
            return Ok(false);
        };
        let grants = self.grants.read().await;
        Ok(grants
            .get(user_id)
            .is_some_and(|projects| projects.contains(project_id)))
    }
}

#[derive(Debug, Clone)]
struct UserRecord {
    profile: UserProfile,
    active: bool,
}

/// ユーザーの有効フラグとプロフィール
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user_id: UserId, profile: UserProfile, active: bool) {
        let mut users = self.users.write().await;
        users.insert(user_id, UserRecord { profile, active });
    }

    /// 有効フラグを変更する（ユーザーが存在しなければ `false`）
    pub async fn set_active(&self, user_id: &UserId, active: bool) -> bool {
        let mut users = self.users.write().await;
        match users.get_mut(user_id) {
            Some(record) => {
                record.active = active;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    /// 未登録のユーザーは無効として扱う
    async fn is_active(&self, user_id: &UserId) -> Result<bool, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(user_id).is_some_and(|record| record.active))
    }

    async fn get_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(user_id).map(|record| record.profile.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn room(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_permission_grant_and_revoke() {
        // テスト項目: 付与した権限は参照でき、取り消すと参照できなくなる
        // given (前提条件):
        let store = InMemoryPermissionStore::new();
        store.grant(user("alice"), "p1").await;

        // when (操作) / then (期待する結果):
        assert_eq!(store.has_access(&user("alice"), &room("p1")).await, Ok(true));
        assert_eq!(store.has_access(&user("alice"), &room("p2")).await, Ok(false));
        assert_eq!(store.has_access(&user("bob"), &room("p1")).await, Ok(false));

        assert!(store.revoke(&user("alice"), "p1").await);
        assert!(!store.revoke(&user("alice"), "p1").await);
        assert_eq!(store.has_access(&user("alice"), &room("p1")).await, Ok(false));
    }

    #[tokio::test]
    async fn test_permission_never_grants_private_rooms() {
        // テスト項目: 個人ルームへのアクセスは権限ストアでは許可されない
        // given (前提条件):
        let store = InMemoryPermissionStore::new();
        store.grant(user("alice"), "user:alice").await;

        // when (操作):
        let result = store
            .has_access(&user("alice"), &RoomId::private_for(&user("alice")))
            .await;

        // then (期待する結果):
        assert_eq!(result, Ok(false));
    }

    #[tokio::test]
    async fn test_user_store_active_flag_and_profile() {
        // テスト項目: 有効フラグの切り替えとプロフィールの取得
        // given (前提条件):
        let store = InMemoryUserStore::new();
        let profile = UserProfile {
            display_name: "Alice".to_string(),
            avatar_url: Some("https://example.com/a.png".to_string()),
        };
        store.insert(user("alice"), profile.clone(), true).await;

        // when (操作):
        let deactivated = store.set_active(&user("alice"), false).await;

        // then (期待する結果):
        assert!(deactivated);
        assert_eq!(store.is_active(&user("alice")).await, Ok(false));
        assert_eq!(store.get_profile(&user("alice")).await, Ok(Some(profile)));
        assert_eq!(store.is_active(&user("nobody")).await, Ok(false));
        assert_eq!(store.get_profile(&user("nobody")).await, Ok(None));
        assert!(!store.set_active(&user("nobody"), true).await);
    }
}
