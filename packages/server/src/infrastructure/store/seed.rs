//! シードファイルの読み込み
//!
//! ```json
//! {
//!   "users": [{ "id": "alice", "displayName": "Alice", "avatarUrl": null, "active": true }],
//!   "permissions": [{ "userId": "alice", "projectId": "p1" }]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::inmemory::{InMemoryPermissionStore, InMemoryUserStore};
use crate::domain::{UserId, UserProfile};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUser {
    pub id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedPermission {
    pub user_id: UserId,
    pub project_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub permissions: Vec<SeedPermission>,
}

impl SeedData {
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// ストアへ書き込む
    pub async fn apply(&self, users: &InMemoryUserStore, permissions: &InMemoryPermissionStore) {
        for user in &self.users {
            let profile = UserProfile {
                display_name: user.display_name.clone(),
                avatar_url: user.avatar_url.clone(),
            };
            users.insert(user.id.clone(), profile, user.active).await;
        }
        for permission in &self.permissions {
            permissions
                .grant(permission.user_id.clone(), permission.project_id.clone())
                .await;
        }
        tracing::info!(
            users = self.users.len(),
            permissions = self.permissions.len(),
            "Seed data applied"
        );
    }
}
