//! MessagePusher trait 定義
//!
//! 接続へのイベント送信（通知）のインターフェース。
//! WebSocket の生成は UI 層、送信チャンネルの管理とエンコードは Infrastructure 層が担当します。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{error::MessagePushError, event::OutboundEvent, value_object::ConnectionId};

/// 接続の送信タスクへ渡すフレーム
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushFrame {
    /// エンコード済みのイベント
    Text(String),
    /// 生存確認
    Ping,
    /// トランスポートを閉じる
    Close { code: u16, reason: String },
}

/// 接続ごとの送信チャンネル
pub type PusherChannel = mpsc::UnboundedSender<PushFrame>;

/// MessagePusher trait
///
/// ## 順序保証
///
/// `broadcast` は 1 回の呼び出しの中で全ターゲットへの送信を終える。
/// そのため同じルームへ順に発行されたイベントは、どのメンバーにも同じ順序で届く。
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続の送信チャンネルを登録
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// 接続の送信チャンネルを登録解除（存在しなければ何もしない）
    async fn unregister_client(&self, connection_id: &ConnectionId);

    /// 特定の接続へ送信
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &OutboundEvent,
    ) -> Result<(), MessagePushError>;

    /// 複数の接続へ送信（一部の送信失敗は許容する）
    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        event: &OutboundEvent,
    ) -> Result<(), MessagePushError>;

    /// 生存確認（ping）を送信
    async fn ping(&self, connection_id: &ConnectionId) -> Result<(), MessagePushError>;

    /// トランスポートを閉じるよう指示し、登録を解除する
    async fn close(&self, connection_id: &ConnectionId, reason: &str);
}
