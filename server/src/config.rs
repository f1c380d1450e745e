use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// VidNote real-time comment relay
///
/// Only flags the user actually passed are serialized, so an unset flag never
/// shadows a value from the TOML file or the environment.
#[derive(Parser, Serialize, Clone, Debug, Default)]
#[command(name = "vidnote-server", version, about = "VidNote real-time comment relay")]
pub struct Cli {
    /// Port to listen on
    #[arg(long, env = "VIDNOTE_PORT")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Bind address
    #[arg(long, env = "VIDNOTE_BIND_ADDRESS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    /// Path to TOML config file
    #[arg(long, default_value = "./vidnote.toml")]
    #[serde(skip)]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "VIDNOTE_JSON_LOGS")]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    #[serde(skip)]
    pub generate_config: bool,
}

/// Resolved server configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    pub port: u16,

    pub bind_address: String,

    pub json_logs: bool,

    /// Relay tuning (loaded from [relay] section in TOML)
    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(skip)]
    pub generate_config: bool,
}

/// Per-connection transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Seconds between server pings. 0 disables the heartbeat, leaving
    /// cleanup to the transport's own close and error events.
    #[serde(default)]
    pub heartbeat_interval_secs: u64,

    /// Seconds to wait for a pong before closing the socket (default: 10)
    #[serde(default = "default_pong_timeout")]
    pub pong_timeout_secs: u64,

    /// Largest accepted inbound frame in bytes (default: 65536)
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 0,
            pong_timeout_secs: default_pong_timeout(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

fn default_pong_timeout() -> u64 {
    10
}

fn default_max_message_bytes() -> usize {
    64 * 1024
}

/// Ping/pong keepalive timings derived from [`RelayConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub interval: Duration,
    pub pong_timeout: Duration,
}

impl RelayConfig {
    pub fn heartbeat(&self) -> Option<Heartbeat> {
        if self.heartbeat_interval_secs == 0 {
            return None;
        }
        Some(Heartbeat {
            interval: Duration::from_secs(self.heartbeat_interval_secs),
            pong_timeout: Duration::from_secs(self.pong_timeout_secs),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "0.0.0.0".to_string(),
            json_logs: false,
            relay: RelayConfig::default(),
            generate_config: false,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (VIDNOTE_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(cli: Cli) -> Result<Self, figment::Error> {
        let mut config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&cli.config))
            .merge(Env::prefixed("VIDNOTE_").split("__"))
            .merge(Serialized::defaults(&cli))
            .extract()?;
        config.generate_config = cli.generate_config;
        Ok(config)
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# VidNote Relay Configuration
# Place this file at ./vidnote.toml or specify with --config <path>
# All settings can be overridden via environment variables (VIDNOTE_PORT,
# VIDNOTE_RELAY__HEARTBEAT_INTERVAL_SECS, etc.) or CLI flags (--port, etc.)

# Server port (default: 8080)
# port = 8080

# Bind address (default: 0.0.0.0, all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# ---- Relay ----
# [relay]

# Seconds between server pings; 0 disables the heartbeat (default: 0)
# heartbeat_interval_secs = 0

# Seconds to wait for a pong before closing the socket (default: 10)
# pong_timeout_secs = 10

# Largest accepted inbound frame in bytes (default: 65536)
# max_message_bytes = 65536
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn cli_with_file(path: &str) -> Cli {
        Cli {
            config: path.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_without_file() {
        Jail::expect_with(|_jail| {
            let config = Config::from_cli(cli_with_file("missing.toml"))?;
            assert_eq!(config.port, 8080);
            assert_eq!(config.bind_address, "0.0.0.0");
            assert!(config.relay.heartbeat().is_none());
            assert_eq!(config.relay.max_message_bytes, 65536);
            Ok(())
        });
    }

    #[test]
    fn test_layer_precedence() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "vidnote.toml",
                r#"
                port = 9000
                bind_address = "127.0.0.1"

                [relay]
                heartbeat_interval_secs = 30
                "#,
            )?;
            jail.set_env("VIDNOTE_PORT", "9100");
            jail.set_env("VIDNOTE_RELAY__PONG_TIMEOUT_SECS", "4");

            let mut cli = cli_with_file("vidnote.toml");
            cli.bind_address = Some("10.0.0.1".to_string());
            let config = Config::from_cli(cli)?;

            assert_eq!(config.port, 9100);
            assert_eq!(config.bind_address, "10.0.0.1");
            assert_eq!(
                config.relay.heartbeat(),
                Some(Heartbeat {
                    interval: Duration::from_secs(30),
                    pong_timeout: Duration::from_secs(4),
                })
            );
            Ok(())
        });
    }

    #[test]
    fn test_template_parses_as_toml() {
        Jail::expect_with(|jail| {
            jail.create_file("vidnote.toml", &generate_config_template())?;
            let config = Config::from_cli(cli_with_file("vidnote.toml"))?;
            assert_eq!(config.port, 8080);
            Ok(())
        });
    }
}
