//! UseCase の組み立て
//!
//! 依存関係は次の順に解決します。
//! Repository / MessagePusher / 外部コラボレーター → RateLimiter, HeartbeatTasks
//! → Disconnect → Revalidate → HeartbeatSupervisor → Connect → Join / Leave / Presence → Dispatch

use std::sync::Arc;

use huddle_shared::time::Clock;
use tokio::task::JoinHandle;

use crate::{
    config::SessionConfig,
    domain::{MessagePusher, PermissionStore, SessionRepository, TokenVerifier, UserStore},
};

use super::{
    broadcast_event::BroadcastEventUseCase,
    connect_session::ConnectSessionUseCase,
    disconnect_session::DisconnectSessionUseCase,
    dispatch_event::DispatchEventUseCase,
    evict_member::EvictMemberUseCase,
    heartbeat::{HeartbeatSupervisor, HeartbeatTasks},
    inspect_rooms::InspectRoomsUseCase,
    join_room::JoinRoomUseCase,
    leave_room::LeaveRoomUseCase,
    rate_limiter::RateLimiter,
    relay_presence::RelayPresenceUseCase,
    revalidate_session::RevalidateSessionUseCase,
    session_command::{SessionHandle, spawn_command_worker},
};

/// セッション層の外側にある協調先
#[derive(Clone)]
pub struct Collaborators {
    pub token_verifier: Arc<dyn TokenVerifier>,
    pub user_store: Arc<dyn UserStore>,
    pub permission_store: Arc<dyn PermissionStore>,
    pub clock: Arc<dyn Clock>,
}

/// 組み立て済みの UseCase 一式
pub struct SessionServices {
    pub connect: Arc<ConnectSessionUseCase>,
    pub disconnect: Arc<DisconnectSessionUseCase>,
    pub dispatch: Arc<DispatchEventUseCase>,
    pub broadcast: Arc<BroadcastEventUseCase>,
    pub evict: Arc<EvictMemberUseCase>,
    pub revalidate: Arc<RevalidateSessionUseCase>,
    pub inspect: Arc<InspectRoomsUseCase>,
    pub heartbeat_tasks: Arc<HeartbeatTasks>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl SessionServices {
    pub fn new(
        config: &SessionConfig,
        repository: Arc<dyn SessionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        collaborators: Collaborators,
    ) -> Self {
        let Collaborators {
            token_verifier,
            user_store,
            permission_store,
            clock,
        } = collaborators;

        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit, clock.clone()));
        let heartbeat_tasks = Arc::new(HeartbeatTasks::default());

        let disconnect = Arc::new(DisconnectSessionUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            rate_limiter.clone(),
            heartbeat_tasks.clone(),
        ));
        let revalidate = Arc::new(RevalidateSessionUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            token_verifier.clone(),
            user_store.clone(),
            permission_store.clone(),
            disconnect.clone(),
            clock.clone(),
            config.liveness_timeout_millis(),
        ));
        let heartbeat = Arc::new(HeartbeatSupervisor::new(
            revalidate.clone(),
            heartbeat_tasks.clone(),
            config.heartbeat_interval,
        ));
        let connect = Arc::new(ConnectSessionUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            token_verifier,
            user_store.clone(),
            heartbeat,
            clock.clone(),
        ));

        let broadcast = Arc::new(BroadcastEventUseCase::new(
            repository.clone(),
            message_pusher.clone(),
        ));
        let join_room = Arc::new(JoinRoomUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            permission_store,
            user_store,
            clock.clone(),
        ));
        let leave_room = Arc::new(LeaveRoomUseCase::new(
            repository.clone(),
            message_pusher.clone(),
        ));
        let relay_presence = Arc::new(RelayPresenceUseCase::new(
            repository.clone(),
            broadcast.clone(),
        ));
        let dispatch = Arc::new(DispatchEventUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            rate_limiter.clone(),
            join_room,
            leave_room,
            relay_presence,
            disconnect.clone(),
            clock,
        ));
        let evict = Arc::new(EvictMemberUseCase::new(
            repository.clone(),
            message_pusher,
        ));
        let inspect = Arc::new(InspectRoomsUseCase::new(repository));

        Self {
            connect,
            disconnect,
            dispatch,
            broadcast,
            evict,
            revalidate,
            inspect,
            heartbeat_tasks,
            rate_limiter,
        }
    }

    /// CRUD 層からのコマンドを処理するワーカーを起動する
    pub fn start_command_worker(&self) -> (SessionHandle, JoinHandle<()>) {
        spawn_command_worker(self.broadcast.clone(), self.evict.clone())
    }
}
