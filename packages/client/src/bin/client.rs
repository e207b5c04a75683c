//! Huddle command-line client with reconnection support.
//!
//! Connects to a Huddle session server with an access token and sends
//! presence events typed at the prompt (`/join`, `/leave`, `/cursor`,
//! `/typing`, `/quit`). Reconnects with exponential backoff, but never after
//! the server rejected the credentials.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin huddle-client -- --token "$(cargo run -q --bin huddle-server -- --jwt-secret dev --print-token-for alice)"
//! ```

use std::time::Duration;

use clap::Parser;
use huddle_client::{
    ClientOptions,
    domain::{DEFAULT_RECONNECT_MAX_DELAY, ReconnectPolicy},
    run_client,
    session_adapter::DEFAULT_PERSISTENT_THRESHOLD,
};
use huddle_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "huddle-client")]
#[command(about = "Interactive client for the Huddle session server", long_about = None)]
struct Args {
    /// Access token presented at the handshake
    #[arg(short = 't', long)]
    token: String,

    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Reconnection attempts before giving up
    #[arg(long, default_value = "5")]
    max_reconnect_attempts: u32,

    /// Delay before the first reconnection attempt, doubled on each retry
    #[arg(long, default_value = "500")]
    reconnect_base_delay_ms: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let options = ClientOptions {
        url: args.url,
        token: args.token,
        reconnect: ReconnectPolicy {
            max_attempts: args.max_reconnect_attempts,
            base_delay: Duration::from_millis(args.reconnect_base_delay_ms),
            max_delay: DEFAULT_RECONNECT_MAX_DELAY,
        },
        persistent_threshold: DEFAULT_PERSISTENT_THRESHOLD,
    };

    if let Err(e) = run_client(options).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
