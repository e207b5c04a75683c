//! Integration tests for the session server over real sockets.
//!
//! Each test starts an in-process server on an ephemeral port and talks to it
//! with tokio-tungstenite (WebSocket) and reqwest (HTTP).

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use huddle_server::{
    config::SessionConfig,
    domain::{RateLimitPolicy, UserId, UserProfile},
    infrastructure::{
        auth::JwtTokenVerifier,
        message_pusher::WebSocketMessagePusher,
        repository::InMemorySessionRepository,
        store::{InMemoryPermissionStore, InMemoryUserStore},
    },
    ui::Server,
    usecase::{Collaborators, SessionServices},
};
use huddle_shared::time::SystemClock;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Error as WsError, Message},
};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const JWT_SECRET: &str = "integration-secret";
const INTERNAL_TOKEN: &str = "internal-secret";

/// Helper struct to manage an in-process server
struct TestServer {
    addr: SocketAddr,
    verifier: Arc<JwtTokenVerifier>,
    users: Arc<InMemoryUserStore>,
    permissions: Arc<InMemoryPermissionStore>,
    http: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(RateLimitPolicy::default()).await
    }

    async fn start_with(rate_limit: RateLimitPolicy) -> Self {
        let config = SessionConfig {
            heartbeat_interval: Duration::from_secs(300),
            liveness_timeout: Duration::from_secs(300),
            rate_limit,
            internal_token: Some(INTERNAL_TOKEN.to_string()),
        };
        let verifier = Arc::new(JwtTokenVerifier::new(JWT_SECRET));
        let users = Arc::new(InMemoryUserStore::new());
        let permissions = Arc::new(InMemoryPermissionStore::new());

        let services = SessionServices::new(
            &config,
            Arc::new(InMemorySessionRepository::new()),
            Arc::new(WebSocketMessagePusher::new()),
            Collaborators {
                token_verifier: verifier.clone(),
                user_store: users.clone(),
                permission_store: permissions.clone(),
                clock: Arc::new(SystemClock),
            },
        );
        let server = Server::new(services, config.internal_token.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server.serve(listener, std::future::pending()));

        Self {
            addr,
            verifier,
            users,
            permissions,
            http: reqwest::Client::new(),
        }
    }

    /// Register an active user with access to `projects`
    async fn add_user(&self, id: &str, display_name: &str, projects: &[&str]) {
        let user_id = UserId::new(id.to_string()).unwrap();
        let profile = UserProfile {
            display_name: display_name.to_string(),
            avatar_url: None,
        };
        self.users.insert(user_id.clone(), profile, true).await;
        for project in projects {
            self.permissions.grant(user_id.clone(), *project).await;
        }
    }

    fn token_for(&self, id: &str) -> String {
        let user_id = UserId::new(id.to_string()).unwrap();
        self.verifier
            .issue(&user_id, chrono::Duration::hours(1))
            .unwrap()
    }

    fn ws_url(&self, token: Option<&str>) -> String {
        match token {
            Some(token) => format!("ws://{}/ws?token={}", self.addr, token),
            None => format!("ws://{}/ws", self.addr),
        }
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Connect as `id` and consume the `connected` greeting
    async fn connect(&self, id: &str) -> WsClient {
        let token = self.token_for(id);
        let (mut ws, _) = connect_async(self.ws_url(Some(&token))).await.unwrap();
        let greeting = next_event(&mut ws).await;
        assert_eq!(greeting["event"], "connected");
        assert_eq!(greeting["data"]["userId"], id);
        ws
    }

    async fn post_internal(&self, path: &str, body: Value) -> reqwest::StatusCode {
        self.http
            .post(self.http_url(path))
            .header("x-internal-token", INTERNAL_TOKEN)
            .json(&body)
            .send()
            .await
            .unwrap()
            .status()
    }
}

async fn send_event(ws: &mut WsClient, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    ws.send(Message::text(frame)).await.unwrap();
}

/// Next text frame as JSON, skipping control frames
async fn next_event(ws: &mut WsClient) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(3), ws.next())
            .await
            .expect("timed out waiting for an event")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Next event with the given name, skipping any others
async fn next_event_named(ws: &mut WsClient, name: &str) -> Value {
    loop {
        let event = next_event(ws).await;
        if event["event"] == name {
            return event;
        }
    }
}

async fn join(ws: &mut WsClient, room_id: &str) -> Value {
    send_event(ws, "join-room", json!({ "roomId": room_id })).await;
    next_event_named(ws, "room-joined").await
}

fn handshake_status(result: Result<(WsClient, impl Sized), WsError>) -> u16 {
    match result {
        Err(WsError::Http(response)) => response.status().as_u16(),
        Err(other) => panic!("unexpected handshake error: {}", other),
        Ok(_) => panic!("handshake unexpectedly succeeded"),
    }
}

#[tokio::test]
async fn test_health_check_and_empty_room_list() {
    // テスト項目: ヘルスチェックとルーム一覧（空）が取得できる
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let health: Value = server
        .http
        .get(server.http_url("/api/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rooms: Value = server
        .http
        .get(server.http_url("/api/rooms"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(health, json!({"status": "ok"}));
    assert_eq!(rooms, json!([]));
}

#[tokio::test]
async fn test_handshake_without_token_is_rejected() {
    // テスト項目: トークンなしのハンドシェイクは 401 で拒否される
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let result = connect_async(server.ws_url(None)).await;

    // then (期待する結果):
    assert_eq!(handshake_status(result), 401);
}

#[tokio::test]
async fn test_handshake_with_forged_token_is_rejected() {
    // テスト項目: 別の鍵で署名されたトークンは 401 で拒否される
    // given (前提条件):
    let server = TestServer::start().await;
    server.add_user("alice", "Alice", &[]).await;
    let forged = JwtTokenVerifier::new("another-secret")
        .issue(&UserId::new("alice".to_string()).unwrap(), chrono::Duration::hours(1))
        .unwrap();

    // when (操作):
    let result = connect_async(server.ws_url(Some(&forged))).await;

    // then (期待する結果):
    assert_eq!(handshake_status(result), 401);
}

#[tokio::test]
async fn test_handshake_for_unknown_user_is_forbidden() {
    // テスト項目: 有効なトークンでもユーザーが存在しなければ 403 で拒否される
    // given (前提条件):
    let server = TestServer::start().await;
    let token = server.token_for("ghost");

    // when (操作):
    let result = connect_async(server.ws_url(Some(&token))).await;

    // then (期待する結果):
    assert_eq!(handshake_status(result), 403);
}

#[tokio::test]
async fn test_join_and_cursor_relay() {
    // テスト項目: 2 人が同じプロジェクトに参加し、カーソルが相手にだけ中継される
    // given (前提条件):
    let server = TestServer::start().await;
    server.add_user("alice", "Alice", &["p1"]).await;
    server.add_user("bob", "Bob", &["p1"]).await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;

    // when (操作):
    let alice_ack = join(&mut alice, "p1").await;
    let bob_ack = join(&mut bob, "p1").await;
    let joined = next_event_named(&mut alice, "user-joined").await;
    send_event(&mut bob, "cursor-move", json!({ "roomId": "p1", "x": 12.5, "y": 40.0 })).await;
    let cursor = next_event_named(&mut alice, "cursors").await;

    // then (期待する結果):
    assert_eq!(alice_ack["data"]["userIds"], json!(["alice"]));
    assert_eq!(bob_ack["data"]["userIds"], json!(["alice", "bob"]));
    assert_eq!(joined["data"]["userId"], "bob");
    assert_eq!(joined["data"]["displayName"], "Bob");
    assert_eq!(
        cursor["data"],
        json!({ "roomId": "p1", "userId": "bob", "x": 12.5, "y": 40.0 })
    );

    let rooms: Value = server
        .http
        .get(server.http_url("/api/rooms"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rooms[0]["id"], "p1");
    assert_eq!(rooms[0]["memberCount"], 2);
}

#[tokio::test]
async fn test_join_without_permission_reports_access_denied() {
    // テスト項目: 権限のないプロジェクトへの参加は access-denied エラーになり、接続は維持される
    // given (前提条件):
    let server = TestServer::start().await;
    server.add_user("alice", "Alice", &["p1"]).await;
    let mut alice = server.connect("alice").await;

    // when (操作):
    send_event(&mut alice, "join-room", json!({ "roomId": "secret" })).await;
    let error = next_event_named(&mut alice, "error").await;

    // then (期待する結果):
    assert_eq!(error["data"]["code"], "access-denied");
    assert_eq!(error["data"]["roomId"], "secret");
    assert_eq!(error["data"]["fatal"], false);
    let ack = join(&mut alice, "p1").await;
    assert_eq!(ack["data"]["roomId"], "p1");

    let detail = server
        .http
        .get(server.http_url("/api/rooms/secret"))
        .send()
        .await
        .unwrap();
    assert_eq!(detail.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_closing_connection_notifies_room() {
    // テスト項目: 切断したユーザーの退出がルームの残りのメンバーに通知される
    // given (前提条件):
    let server = TestServer::start().await;
    server.add_user("alice", "Alice", &["p1"]).await;
    server.add_user("bob", "Bob", &["p1"]).await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    join(&mut alice, "p1").await;
    join(&mut bob, "p1").await;

    // when (操作):
    bob.close(None).await.unwrap();
    let left = next_event_named(&mut alice, "user-left").await;

    // then (期待する結果):
    assert_eq!(left["data"], json!({ "roomId": "p1", "userId": "bob" }));
}

#[tokio::test]
async fn test_eviction_removes_member_immediately() {
    // テスト項目: 内部エンドポイントからの退出指示で、対象は access-revoked を受け取りルームから外れる
    // given (前提条件):
    let server = TestServer::start().await;
    server.add_user("alice", "Alice", &["p1"]).await;
    server.add_user("bob", "Bob", &["p1"]).await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    join(&mut alice, "p1").await;
    join(&mut bob, "p1").await;

    // when (操作):
    let bob_id = UserId::new("bob".to_string()).unwrap();
    server.permissions.revoke(&bob_id, "p1").await;
    let status = server
        .post_internal("/internal/evictions", json!({ "userId": "bob", "roomId": "p1" }))
        .await;
    let revoked = next_event_named(&mut bob, "error").await;
    let left = next_event_named(&mut alice, "user-left").await;

    // then (期待する結果):
    assert_eq!(status, reqwest::StatusCode::ACCEPTED);
    assert_eq!(revoked["data"]["code"], "access-revoked");
    assert_eq!(revoked["data"]["roomId"], "p1");
    assert_eq!(left["data"]["userId"], "bob");

    // 退出後のカーソル送信はルーム外として拒否される
    send_event(&mut bob, "cursor-move", json!({ "roomId": "p1", "x": 1.0, "y": 1.0 })).await;
    let error = next_event_named(&mut bob, "error").await;
    assert_eq!(error["data"]["code"], "not-in-room");
}

#[tokio::test]
async fn test_domain_event_reaches_project_members() {
    // テスト項目: CRUD 層からのドメインイベントがプロジェクトのメンバーに projectId 付きで届く
    // given (前提条件):
    let server = TestServer::start().await;
    server.add_user("alice", "Alice", &["p1"]).await;
    let mut alice = server.connect("alice").await;
    join(&mut alice, "p1").await;

    // when (操作):
    let status = server
        .post_internal(
            "/internal/rooms/p1/events",
            json!({ "event": "task-created", "data": { "taskId": "t1" } }),
        )
        .await;
    let event = next_event_named(&mut alice, "task-created").await;

    // then (期待する結果):
    assert_eq!(status, reqwest::StatusCode::ACCEPTED);
    assert_eq!(event["data"], json!({ "taskId": "t1", "projectId": "p1" }));
}

#[tokio::test]
async fn test_notification_reaches_every_connection_of_user() {
    // テスト項目: ユーザー宛ての通知は同じユーザーのすべての接続に届く
    // given (前提条件):
    let server = TestServer::start().await;
    server.add_user("alice", "Alice", &[]).await;
    let mut laptop = server.connect("alice").await;
    let mut phone = server.connect("alice").await;

    // when (操作):
    let status = server
        .post_internal(
            "/internal/users/alice/events",
            json!({ "event": "notification", "data": { "text": "hello" } }),
        )
        .await;

    // then (期待する結果):
    assert_eq!(status, reqwest::StatusCode::ACCEPTED);
    for ws in [&mut laptop, &mut phone] {
        let event = next_event_named(ws, "notification").await;
        assert_eq!(event["data"], json!({ "text": "hello" }));
    }
}

#[tokio::test]
async fn test_internal_endpoints_validate_requests() {
    // テスト項目: 内部エンドポイントはトークン・イベント名・ルームの種類を検証する
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let without_token = server
        .http
        .post(server.http_url("/internal/rooms/p1/events"))
        .json(&json!({ "event": "task-created", "data": {} }))
        .send()
        .await
        .unwrap()
        .status();
    let unknown_event = server
        .post_internal(
            "/internal/rooms/p1/events",
            json!({ "event": "task-exploded", "data": {} }),
        )
        .await;
    let private_room = server
        .post_internal(
            "/internal/rooms/user:alice/events",
            json!({ "event": "task-created", "data": {} }),
        )
        .await;
    let array_data = server
        .post_internal(
            "/internal/rooms/p1/events",
            json!({ "event": "task-created", "data": [1, 2] }),
        )
        .await;

    // then (期待する結果):
    assert_eq!(without_token, reqwest::StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_event, reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(private_room, reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(array_data, reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_flooding_connection_is_rate_limited() {
    // テスト項目: ウィンドウ内の上限を超えたイベントは rate-limited で拒否され、接続は維持される
    // given (前提条件):
    let server = TestServer::start_with(RateLimitPolicy {
        window_millis: 60_000,
        max_events: 3,
    })
    .await;
    server.add_user("alice", "Alice", &["p1"]).await;
    let mut alice = server.connect("alice").await;
    join(&mut alice, "p1").await;

    // when (操作):
    for i in 0..3_i32 {
        send_event(
            &mut alice,
            "cursor-move",
            json!({ "roomId": "p1", "x": f64::from(i), "y": 0.0 }),
        )
        .await;
    }
    let error = next_event_named(&mut alice, "error").await;

    // then (期待する結果):
    assert_eq!(error["data"]["code"], "rate-limited");
    assert_eq!(error["data"]["fatal"], false);
}
