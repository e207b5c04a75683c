//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの `PusherChannel` を管理
//! - `OutboundEvent` を JSON にエンコードして送信（push_to, broadcast）
//! - 生存確認（ping）と強制切断（close）の指示
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された送信チャンネルを受け取り、フレームを流し込むだけです。
//! `broadcast` はロックを保持したまま全ターゲットへ送るため、
//! 同じルームへのイベントはどのメンバーにも同じ順序で届きます。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{ConnectionId, MessagePushError, MessagePusher, OutboundEvent, PushFrame, PusherChannel},
    infrastructure::dto::conversion::encode_outbound_event,
};

/// 強制切断時の WebSocket クローズコード（policy violation）
pub const CLOSE_CODE_POLICY: u16 = 1008;

/// WebSocket を使った MessagePusher 実装
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// 接続中のクライアントの送信チャンネル
    clients: Mutex<HashMap<ConnectionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    fn encode(event: &OutboundEvent) -> Result<String, MessagePushError> {
        encode_outbound_event(event).map_err(|e| MessagePushError::Encode(e.to_string()))
    }

    pub async fn count_clients(&self) -> usize {
        self.clients.lock().await.len()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        clients.insert(connection_id, sender);
        tracing::debug!(%connection_id, "Connection registered to MessagePusher");
    }

    async fn unregister_client(&self, connection_id: &ConnectionId) {
        let mut clients = self.clients.lock().await;
        if clients.remove(connection_id).is_some() {
            tracing::debug!(%connection_id, "Connection unregistered from MessagePusher");
        }
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &OutboundEvent,
    ) -> Result<(), MessagePushError> {
        let text = Self::encode(event)?;
        let clients = self.clients.lock().await;

        let sender = clients
            .get(connection_id)
            .ok_or_else(|| MessagePushError::ClientNotFound(connection_id.to_string()))?;
        sender
            .send(PushFrame::Text(text))
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::debug!(%connection_id, event = %event.name(), "Pushed event");
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        event: &OutboundEvent,
    ) -> Result<(), MessagePushError> {
        if targets.is_empty() {
            return Ok(());
        }
        let text = Self::encode(event)?;
        let clients = self.clients.lock().await;

        for target in targets {
            match clients.get(&target) {
                // ブロードキャストでは一部の送信失敗を許容
                Some(sender) => {
                    if let Err(e) = sender.send(PushFrame::Text(text.clone())) {
                        tracing::warn!(connection_id = %target, "Failed to push event: {}", e);
                    }
                }
                None => {
                    tracing::debug!(
                        connection_id = %target,
                        "Connection not registered during broadcast, skipping"
                    );
                }
            }
        }
        tracing::debug!(event = %event.name(), "Broadcasted event");

        Ok(())
    }

    async fn ping(&self, connection_id: &ConnectionId) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;
        let sender = clients
            .get(connection_id)
            .ok_or_else(|| MessagePushError::ClientNotFound(connection_id.to_string()))?;
        sender
            .send(PushFrame::Ping)
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))
    }

    async fn close(&self, connection_id: &ConnectionId, reason: &str) {
        let mut clients = self.clients.lock().await;
        if let Some(sender) = clients.remove(connection_id) {
            // 送信タスクがすでに終了していれば無視してよい
            let _ = sender.send(PushFrame::Close {
                code: CLOSE_CODE_POLICY,
                reason: reason.to_string(),
            });
            tracing::info!(%connection_id, reason, "Requested connection close");
        }
    }
}
