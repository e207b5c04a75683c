//! InMemory Session Repository 実装
//!
//! ドメイン層が定義する SessionRepository trait の具体的な実装。
//! 接続・ルーム・取り消し世代を 1 つの `Mutex` の内側にまとめて保持し、
//! メンバーシップの変更をすべて直列化します。
//!
//! ## 取り消し世代
//!
//! 世代は (ユーザー, ルーム) ごとに持ち、ルームが空になって破棄されても残します。
//! ユーザーの最後の接続が削除された時点でそのユーザーの世代をまとめて破棄します。
//! 参加処理は生きている接続からしか行われないため、破棄後に古い世代と比べられることはありません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Connection, ConnectionId, MemberRemoval, MembershipChange, RemovedConnection,
    RepositoryError, Room, RoomId, RoomMember, SessionRepository, Timestamp, UserId,
};

#[derive(Debug, Default)]
struct SessionState {
    connections: HashMap<ConnectionId, Connection>,
    rooms: HashMap<RoomId, Room>,
    revocation_epochs: HashMap<UserId, HashMap<RoomId, u64>>,
}

impl SessionState {
    fn epoch_of(&self, user_id: &UserId, room_id: &RoomId) -> u64 {
        self.revocation_epochs
            .get(user_id)
            .and_then(|rooms| rooms.get(room_id))
            .copied()
            .unwrap_or(0)
    }

    fn detach(&mut self, connection_id: &ConnectionId, room_id: &RoomId) -> Option<MemberRemoval> {
        let connection = self.connections.get_mut(connection_id)?;
        if !connection.rooms.remove(room_id) {
            return None;
        }
        let user_id = connection.user_id.clone();

        let remaining = match self.rooms.get_mut(room_id) {
            Some(room) => {
                room.remove_member(connection_id);
                let remaining = room.connection_ids();
                if room.is_empty() {
                    self.rooms.remove(room_id);
                }
                remaining
            }
            None => Vec::new(),
        };

        Some(MemberRemoval { user_id, remaining })
    }
}

/// インメモリ Session Repository 実装
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    state: Mutex<SessionState>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert_connection(&self, connection: Connection) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        if state.connections.contains_key(&connection.id) {
            return Err(RepositoryError::DuplicateConnection(
                connection.id.to_string(),
            ));
        }
        state.connections.insert(connection.id, connection);
        Ok(())
    }

    async fn find_connection(&self, connection_id: &ConnectionId) -> Option<Connection> {
        let state = self.state.lock().await;
        state.connections.get(connection_id).cloned()
    }

    async fn remove_connection(&self, connection_id: &ConnectionId) -> Option<RemovedConnection> {
        let mut state = self.state.lock().await;
        let connection = state.connections.remove(connection_id)?;

        let mut rooms = Vec::with_capacity(connection.rooms.len());
        for room_id in &connection.rooms {
            let remaining = match state.rooms.get_mut(room_id) {
                Some(room) => {
                    room.remove_member(connection_id);
                    let remaining = room.connection_ids();
                    if room.is_empty() {
                        state.rooms.remove(room_id);
                    }
                    remaining
                }
                None => Vec::new(),
            };
            rooms.push((room_id.clone(), remaining));
        }

        let user_id = &connection.user_id;
        if !state.connections.values().any(|other| &other.user_id == user_id) {
            state.revocation_epochs.remove(user_id);
        }

        Some(RemovedConnection { connection, rooms })
    }

    async fn connections_of_user(&self, user_id: &UserId) -> Vec<ConnectionId> {
        let state = self.state.lock().await;
        let mut ids: Vec<ConnectionId> = state
            .connections
            .values()
            .filter(|connection| &connection.user_id == user_id)
            .map(|connection| connection.id)
            .collect();
        ids.sort();
        ids
    }

    async fn revocation_epoch(&self, user_id: &UserId, room_id: &RoomId) -> u64 {
        let state = self.state.lock().await;
        state.epoch_of(user_id, room_id)
    }

    async fn add_member(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
        expected_epoch: Option<u64>,
        joined_at: Timestamp,
    ) -> Result<MembershipChange, RepositoryError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let connection = state
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;

        if let Some(expected) = expected_epoch {
            let current = state
                .revocation_epochs
                .get(&connection.user_id)
                .and_then(|rooms| rooms.get(room_id))
                .copied()
                .unwrap_or(0);
            if current != expected {
                return Err(RepositoryError::StaleAuthorization(
                    room_id.as_str().to_string(),
                ));
            }
        }

        if connection.rooms.contains(room_id) {
            return Ok(MembershipChange::AlreadyMember);
        }
        connection.rooms.insert(room_id.clone());

        let room = state
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| Room::new(room_id.clone(), joined_at));
        let others: Vec<RoomMember> = room.members.values().cloned().collect();
        room.add_member(RoomMember {
            connection_id: *connection_id,
            user_id: connection.user_id.clone(),
            joined_at,
        });

        Ok(MembershipChange::Joined { others })
    }

    async fn remove_member(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Option<MemberRemoval> {
        let mut state = self.state.lock().await;
        state.detach(connection_id, room_id)
    }

    async fn revoke_member(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Option<MemberRemoval> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let user_id = state.connections.get(connection_id)?.user_id.clone();
        *state
            .revocation_epochs
            .entry(user_id)
            .or_default()
            .entry(room_id.clone())
            .or_insert(0) += 1;
        state.detach(connection_id, room_id)
    }

    async fn room_members(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        let state = self.state.lock().await;
        state
            .rooms
            .get(room_id)
            .map(Room::connection_ids)
            .unwrap_or_default()
    }

    async fn record_activity(&self, connection_id: &ConnectionId, at: Timestamp) -> bool {
        let mut state = self.state.lock().await;
        match state.connections.get_mut(connection_id) {
            Some(connection) => {
                connection.last_seen_at = connection.last_seen_at.max(at);
                true
            }
            None => false,
        }
    }

    async fn record_probe(&self, connection_id: &ConnectionId, at: Timestamp) -> bool {
        let mut state = self.state.lock().await;
        match state.connections.get_mut(connection_id) {
            Some(connection) => {
                connection.record_probe(at);
                true
            }
            None => false,
        }
    }

    async fn list_rooms(&self) -> Vec<Room> {
        let state = self.state.lock().await;
        let mut rooms: Vec<Room> = state.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        rooms
    }

    async fn find_room(&self, room_id: &RoomId) -> Option<Room> {
        let state = self.state.lock().await;
        state.rooms.get(room_id).cloned()
    }

    async fn count_connections(&self) -> usize {
        let state = self.state.lock().await;
        state.connections.len()
    }
}
