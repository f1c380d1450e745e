use std::net::SocketAddr;
use tokio::net::TcpListener;

use vidnote_server::config::{generate_config_template, Config};
use vidnote_server::{routes, state};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vidnote_server=info"));
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(env_filter).init();
    }

    tracing::info!("VidNote relay v{} starting", env!("CARGO_PKG_VERSION"));

    match config.relay.heartbeat() {
        Some(heartbeat) => tracing::info!(
            interval_secs = heartbeat.interval.as_secs(),
            pong_timeout_secs = heartbeat.pong_timeout.as_secs(),
            "Heartbeat enabled"
        ),
        None => tracing::info!("Heartbeat disabled, relying on transport close events"),
    }

    let app_state = state::AppState::new(&config.relay);
    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
