//! UseCase 層
//!
//! セッション層の操作（接続、切断、参加、退出、プレゼンス中継、ブロードキャスト、
//! 退出処理、ハートビート）を 1 操作 1 構造体で提供します。

mod broadcast_event;
mod connect_session;
mod disconnect_session;
mod dispatch_event;
mod error;
mod evict_member;
mod heartbeat;
mod inspect_rooms;
mod join_room;
mod leave_room;
mod rate_limiter;
mod relay_presence;
mod revalidate_session;
mod revocation;
mod services;
mod session_command;

#[cfg(test)]
mod test_support;

pub use broadcast_event::{BroadcastEventUseCase, NOTIFICATION_EVENT};
pub use connect_session::ConnectSessionUseCase;
pub use disconnect_session::DisconnectSessionUseCase;
pub use dispatch_event::DispatchEventUseCase;
pub use error::{BroadcastError, CommandError, InspectRoomsError};
pub use evict_member::EvictMemberUseCase;
pub use heartbeat::{HeartbeatSupervisor, HeartbeatTasks};
pub use inspect_rooms::InspectRoomsUseCase;
pub use join_room::{JoinOutcome, JoinRoomUseCase};
pub use leave_room::LeaveRoomUseCase;
pub use rate_limiter::RateLimiter;
pub use relay_presence::RelayPresenceUseCase;
pub use revalidate_session::{HeartbeatOutcome, RevalidateSessionUseCase};
pub use services::{Collaborators, SessionServices};
pub use session_command::{SessionCommand, SessionHandle, spawn_command_worker};
