//! Shared application state.

use std::sync::Arc;

use crate::usecase::{
    ConnectSessionUseCase, DisconnectSessionUseCase, DispatchEventUseCase, InspectRoomsUseCase,
    SessionHandle,
};

/// Shared application state
pub struct AppState {
    /// ConnectSessionUseCase（ハンドシェイクの認証と登録）
    pub connect_session: Arc<ConnectSessionUseCase>,
    /// DisconnectSessionUseCase（切断時の後片付け）
    pub disconnect_session: Arc<DisconnectSessionUseCase>,
    /// DispatchEventUseCase（クライアントイベントの処理）
    pub dispatch_event: Arc<DispatchEventUseCase>,
    /// InspectRoomsUseCase（HTTP API 用のルーム参照）
    pub inspect_rooms: Arc<InspectRoomsUseCase>,
    /// CRUD 層からのコマンド送信口
    pub session_handle: SessionHandle,
    /// 内部エンドポイント用の共有シークレット（未設定なら認証なし）
    pub internal_token: Option<String>,
}
