//! Huddle command-line client.
//!
//! Connects to a Huddle session server with an access token, sends presence
//! events typed at an interactive prompt, and reacts to server frames through
//! the [`session_adapter::ClientSessionAdapter`].

pub mod command;
pub mod domain;
pub mod error;
mod formatter;
mod runner;
mod session;
pub mod session_adapter;
mod ui;

pub use runner::{ClientOptions, run_client};
