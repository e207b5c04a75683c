//! Huddle session server.
//!
//! Authenticated WebSocket sessions, project rooms with presence fan-out,
//! heartbeat re-validation and server-initiated eviction.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
