//! ドメイン層
//!
//! セッション層のドメインモデル（値オブジェクト、エンティティ、イベント）と、
//! 外部とのやり取りに必要なインターフェース（Repository, MessagePusher, 外部ストア）を定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

pub mod entity;
pub mod error;
pub mod event;
pub mod gateway;
pub mod message_pusher;
pub mod rate_limit;
pub mod repository;
pub mod value_object;

pub use entity::{AccessToken, Connection, Room, RoomMember, UserProfile};
pub use error::{
    MessagePushError, RepositoryError, SessionError, StoreError, TokenError, ValueObjectError,
};
pub use event::{ChangeAction, DomainEvent, InboundEvent, OutboundEvent, ResourceKind};
pub use gateway::{PermissionStore, TokenVerifier, UserStore, VerifiedToken};
#[cfg(test)]
pub use gateway::{MockPermissionStore, MockTokenVerifier, MockUserStore};
pub use message_pusher::{MessagePusher, PushFrame, PusherChannel};
pub use rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimitWindow};
pub use repository::{MemberRemoval, MembershipChange, RemovedConnection, SessionRepository};
pub use value_object::{ConnectionId, RoomId, Timestamp, UserId};
