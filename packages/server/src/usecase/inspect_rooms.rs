//! UseCase: ルームの参照（HTTP API 用）
//!
//! 個人ルームは一覧にも詳細にも出しません。

use std::sync::Arc;

use crate::domain::{Room, RoomId, SessionRepository};

use super::error::InspectRoomsError;

pub struct InspectRoomsUseCase {
    repository: Arc<dyn SessionRepository>,
}

impl InspectRoomsUseCase {
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self { repository }
    }

    /// 存在するプロジェクトルームの一覧（ID 順）
    pub async fn list(&self) -> Vec<Room> {
        let mut rooms: Vec<Room> = self
            .repository
            .list_rooms()
            .await
            .into_iter()
            .filter(|room| !room.id.is_private())
            .collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        rooms
    }

    pub async fn find(&self, room_id: &str) -> Result<Room, InspectRoomsError> {
        let not_found = || InspectRoomsError::RoomNotFound(room_id.to_string());
        let id = RoomId::new(room_id.to_string()).map_err(|_| not_found())?;
        if id.is_private() {
            return Err(not_found());
        }
        self.repository.find_room(&id).await.ok_or_else(not_found)
    }
}
