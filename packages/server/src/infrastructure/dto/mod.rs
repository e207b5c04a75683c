//! Data Transfer Objects (DTOs) for the session layer.
//!
//! DTOs are organized by protocol:
//! - `websocket`: WebSocket frame DTOs (`{"event": ..., "data": ...}`)
//! - `http`: HTTP API request/response DTOs

pub mod conversion;
pub mod http;
pub mod websocket;
