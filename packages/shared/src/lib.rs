//! Utilities shared by the Huddle server and client binaries.

pub mod logger;
pub mod time;
