//! 権限の取り消しによるルームからの除外（ハートビートと退出処理で共通）

use crate::domain::{
    ConnectionId, MessagePusher, OutboundEvent, RoomId, SessionError, SessionRepository,
};

/// 接続を `room_id` から外し、本人へ access-revoked を、残りのメンバーへ user-left を送る
///
/// メンバーでなければ何もせず `false` を返す。
pub(crate) async fn revoke_membership(
    repository: &dyn SessionRepository,
    message_pusher: &dyn MessagePusher,
    connection_id: &ConnectionId,
    room_id: &RoomId,
) -> bool {
    let Some(removal) = repository.revoke_member(connection_id, room_id).await else {
        return false;
    };

    let revoked = OutboundEvent::Error(SessionError::AccessRevoked(room_id.clone()));
    if let Err(e) = message_pusher.push_to(connection_id, &revoked).await {
        tracing::warn!(%connection_id, "Failed to notify access revocation: {}", e);
    }

    let left = OutboundEvent::UserLeft {
        room_id: room_id.clone(),
        user_id: removal.user_id.clone(),
    };
    if let Err(e) = message_pusher.broadcast(removal.remaining, &left).await {
        tracing::warn!(room_id = %room_id, "Failed to broadcast user-left: {}", e);
    }

    tracing::info!(
        %connection_id,
        user_id = %removal.user_id,
        room_id = %room_id,
        "Membership revoked"
    );
    true
}
