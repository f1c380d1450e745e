use clap::Parser;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use vidnote_client::{
    ClientConfig, ClientError, ConnectionState, Id, ReconnectPolicy, RelayClient, RelayHandler,
};

/// Follow a VidNote video room from the terminal.
/// Each line typed on stdin is sent to the room as a comment.
#[derive(Parser, Debug)]
#[command(name = "vidnote-client", version, about = "Follow a VidNote video room")]
struct Args {
    /// Relay WebSocket endpoint
    #[arg(long, env = "VIDNOTE_RELAY_URL", default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Video room to join
    #[arg(long)]
    video_id: Id,

    /// User id announced in the join
    #[arg(long)]
    user_id: Id,

    /// Do not reconnect after the socket drops
    #[arg(long)]
    no_reconnect: bool,

    /// Delay before each reconnect attempt
    #[arg(long, default_value_t = 3000)]
    reconnect_interval_ms: u64,

    /// Reconnect attempts before giving up
    #[arg(long, default_value_t = 5)]
    max_reconnect_attempts: u32,

    /// Give up on a single connect attempt after this long
    #[arg(long, default_value_t = 10_000)]
    connect_timeout_ms: u64,
}

/// Prints room activity to stdout.
struct Printer;

impl RelayHandler for Printer {
    fn on_joined(&self, video_id: &Id) {
        println!("* joined video {}", video_id);
    }

    fn on_new_comment(&self, comment: &Value) {
        let author = comment.get("userId").map(Value::to_string).unwrap_or_default();
        match comment.get("content").and_then(Value::as_str) {
            Some(content) => println!("[{}] {}", author, content),
            None => println!("[{}] {}", author, comment),
        }
    }

    fn on_typing_indicator(&self, user_id: &Id, is_typing: bool) {
        if is_typing {
            println!("* {} is typing...", user_id);
        }
    }

    fn on_state_change(&self, state: ConnectionState) {
        tracing::debug!(state = %state, "Connection state changed");
    }

    fn on_error(&self, error: &ClientError) {
        eprintln!("! {}", error);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vidnote_client=warn")),
        )
        .init();

    let reconnect = if args.no_reconnect {
        ReconnectPolicy::disabled()
    } else {
        ReconnectPolicy {
            enabled: true,
            interval: Duration::from_millis(args.reconnect_interval_ms),
            max_attempts: args.max_reconnect_attempts,
        }
    };
    let config = ClientConfig::new(args.url)
        .with_room(args.video_id, args.user_id.clone())
        .with_reconnect(reconnect)
        .with_connect_timeout(Duration::from_millis(args.connect_timeout_ms));

    let mut client = RelayClient::new(config, Printer);
    client.connect().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    let comment = json!({"userId": args.user_id, "content": line});
                    if !client.send_comment(comment) {
                        eprintln!("! not connected, comment not sent");
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.disconnect().await;
    Ok(())
}
