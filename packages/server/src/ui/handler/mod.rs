//! Request handlers.

mod http;
mod internal;
mod websocket;

pub use http::{get_room_detail, get_rooms, health_check};
pub use internal::{post_eviction, post_room_event, post_user_event};
pub use websocket::websocket_handler;
