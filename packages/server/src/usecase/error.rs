//! UseCase 層のエラー型

use thiserror::Error;

/// CRUD 層からのブロードキャスト要求のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    #[error("event data must be a JSON object")]
    InvalidData,

    #[error("room '{0}' is not a project room")]
    NotAProjectRoom(String),
}

/// SessionHandle 経由のコマンド送信のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("session command worker has stopped")]
    WorkerStopped,
}

/// ルーム参照のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InspectRoomsError {
    #[error("room '{0}' not found")]
    RoomNotFound(String),
}
