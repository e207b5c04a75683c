//! Huddle session server.
//!
//! Authenticates WebSocket connections with HS256 access tokens, keeps project
//! rooms with presence fan-out, and accepts domain events from the CRUD layer.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin huddle-server -- --jwt-secret dev-secret --seed seed.json
//! cargo run --bin huddle-server -- --jwt-secret dev-secret --print-token-for alice
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use huddle_server::{
    config::SessionConfig,
    domain::{RateLimitPolicy, UserId},
    infrastructure::{
        auth::JwtTokenVerifier,
        message_pusher::WebSocketMessagePusher,
        repository::InMemorySessionRepository,
        store::{InMemoryPermissionStore, InMemoryUserStore, SeedData},
    },
    ui::Server,
    usecase::{Collaborators, SessionServices},
};
use huddle_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "huddle-server")]
#[command(about = "Real-time collaborative session server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Shared HS256 secret used to verify access tokens
    #[arg(long)]
    jwt_secret: String,

    /// Seconds between heartbeat re-validations of a connection
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    heartbeat_interval_secs: u64,

    /// Seconds a connection may stay silent after a liveness probe
    #[arg(long, default_value = "20", value_parser = clap::value_parser!(u64).range(1..))]
    liveness_timeout_secs: u64,

    /// Length of the inbound rate limit window in seconds
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    rate_limit_window_secs: u64,

    /// Inbound events allowed per connection within one window
    #[arg(long, default_value = "50", value_parser = clap::value_parser!(u32).range(1..))]
    rate_limit_max_events: u32,

    /// JSON file with users and project permissions to load at startup
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Shared secret required on the internal endpoints
    #[arg(long)]
    internal_token: Option<String>,

    /// Print a one-hour access token for this user and exit
    #[arg(long, value_name = "USER_ID")]
    print_token_for: Option<String>,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            liveness_timeout: Duration::from_secs(self.liveness_timeout_secs),
            rate_limit: RateLimitPolicy {
                window_millis: i64::try_from(self.rate_limit_window_secs.saturating_mul(1_000))
                    .unwrap_or(i64::MAX),
                max_events: self.rate_limit_max_events,
            },
            internal_token: self.internal_token.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();
    let token_verifier = Arc::new(JwtTokenVerifier::new(&args.jwt_secret));

    if let Some(user_id) = &args.print_token_for {
        print_token(&token_verifier, user_id);
        return;
    }

    let config = args.session_config();
    tracing::info!(
        heartbeat_interval = ?config.heartbeat_interval,
        liveness_timeout = ?config.liveness_timeout,
        rate_limit = ?config.rate_limit,
        "Session configuration loaded"
    );

    // Initialize dependencies in order:
    // 1. External stores (seeded)
    // 2. Repository and MessagePusher
    // 3. UseCases
    // 4. Server

    // 1. External stores
    let user_store = Arc::new(InMemoryUserStore::new());
    let permission_store = Arc::new(InMemoryPermissionStore::new());
    if let Some(path) = &args.seed {
        match SeedData::load(path) {
            Ok(seed) => seed.apply(&user_store, &permission_store).await,
            Err(e) => {
                tracing::error!("Failed to load seed file {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    } else {
        tracing::warn!("No seed file given, every handshake will be rejected as inactive");
    }

    // 2. Repository and MessagePusher
    let repository = Arc::new(InMemorySessionRepository::new());
    let message_pusher = Arc::new(WebSocketMessagePusher::new());

    // 3. UseCases
    let services = SessionServices::new(
        &config,
        repository,
        message_pusher,
        Collaborators {
            token_verifier,
            user_store,
            permission_store,
            clock: Arc::new(SystemClock),
        },
    );

    // 4. Create and run the server
    let server = Server::new(services, config.internal_token.clone());
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn print_token(verifier: &JwtTokenVerifier, raw_user_id: &str) {
    let user_id = match UserId::new(raw_user_id.to_string()) {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Invalid user id '{}': {}", raw_user_id, e);
            std::process::exit(1);
        }
    };
    match verifier.issue(&user_id, chrono::Duration::hours(1)) {
        Ok(token) => println!("{}", token),
        Err(e) => {
            tracing::error!("Failed to issue token: {}", e);
            std::process::exit(1);
        }
    }
}
