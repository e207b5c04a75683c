//! UseCase テスト用の共通セットアップ

use std::sync::Arc;

use huddle_shared::time::ManualClock;
use tokio::sync::mpsc;

use crate::{
    config::SessionConfig,
    domain::{
        AccessToken, Connection, ConnectionId, MessagePusher, PermissionStore, PushFrame, RoomId,
        SessionRepository, Timestamp, TokenVerifier, UserId, UserProfile, UserStore,
    },
    infrastructure::{
        message_pusher::WebSocketMessagePusher,
        repository::InMemorySessionRepository,
        store::{InMemoryPermissionStore, InMemoryUserStore},
    },
    usecase::services::{Collaborators, SessionServices},
};

pub(crate) const START_MILLIS: i64 = 1_700_000_000_000;

pub(crate) fn user(id: &str) -> UserId {
    UserId::new(id.to_string()).unwrap()
}

pub(crate) fn room(id: &str) -> RoomId {
    RoomId::new(id.to_string()).unwrap()
}

/// インメモリ実装一式
pub(crate) struct TestSession {
    pub clock: Arc<ManualClock>,
    pub repository: Arc<InMemorySessionRepository>,
    pub pusher: Arc<WebSocketMessagePusher>,
    pub permissions: Arc<InMemoryPermissionStore>,
    pub users: Arc<InMemoryUserStore>,
}

impl TestSession {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(ManualClock::new(START_MILLIS)),
            repository: Arc::new(InMemorySessionRepository::new()),
            pusher: Arc::new(WebSocketMessagePusher::new()),
            permissions: Arc::new(InMemoryPermissionStore::new()),
            users: Arc::new(InMemoryUserStore::new()),
        }
    }

    pub fn now(&self) -> Timestamp {
        use huddle_shared::time::Clock;
        Timestamp::new(self.clock.now_millis())
    }

    /// 有効なユーザーを登録し、プロジェクトの権限を付与する
    pub async fn add_user(&self, id: &str, projects: &[&str]) {
        let profile = UserProfile {
            display_name: id.to_uppercase(),
            avatar_url: None,
        };
        self.users.insert(user(id), profile, true).await;
        for project in projects {
            self.permissions.grant(user(id), *project).await;
        }
    }

    /// ハンドシェイク済みの接続を直接作る（個人ルームへの参加まで）
    pub async fn open(&self, user_id: &str) -> (Connection, mpsc::UnboundedReceiver<PushFrame>) {
        let now = self.now();
        let token = AccessToken::new(
            format!("token-{}", user_id),
            Timestamp::new(now.value() + 3_600_000),
        );
        let connection = Connection::new(ConnectionId::generate(), user(user_id), token, now);
        self.repository
            .insert_connection(connection.clone())
            .await
            .unwrap();
        self.repository
            .add_member(&connection.id, &connection.private_room(), None, now)
            .await
            .unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        self.pusher.register_client(connection.id, tx).await;
        (connection, rx)
    }

    /// 権限チェックを通さずにルームへ参加させる
    pub async fn enter(&self, connection_id: &ConnectionId, room_id: &str) {
        self.repository
            .add_member(connection_id, &room(room_id), None, self.now())
            .await
            .unwrap();
    }
}

/// 受信済みのテキストフレームをすべて取り出す
pub(crate) fn drain(rx: &mut mpsc::UnboundedReceiver<PushFrame>) -> Vec<serde_json::Value> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        if let PushFrame::Text(text) = frame {
            frames.push(serde_json::from_str(&text).unwrap());
        }
    }
    frames
}

/// 受信済みのイベント名をすべて取り出す
pub(crate) fn event_names(rx: &mut mpsc::UnboundedReceiver<PushFrame>) -> Vec<String> {
    drain(rx)
        .into_iter()
        .map(|frame| frame["event"].as_str().unwrap_or_default().to_string())
        .collect()
}

impl TestSession {
    /// インメモリのストアで UseCase 一式を組み立てる
    pub fn services(&self, token_verifier: Arc<dyn TokenVerifier>) -> SessionServices {
        self.services_with(token_verifier, self.users.clone(), self.permissions.clone())
    }

    pub fn services_with(
        &self,
        token_verifier: Arc<dyn TokenVerifier>,
        user_store: Arc<dyn UserStore>,
        permission_store: Arc<dyn PermissionStore>,
    ) -> SessionServices {
        SessionServices::new(
            &SessionConfig::default(),
            self.repository.clone(),
            self.pusher.clone(),
            Collaborators {
                token_verifier,
                user_store,
                permission_store,
                clock: self.clock.clone(),
            },
        )
    }
}
