// Application configuration, loaded from environment variables and CLI flags.

use std::path::PathBuf;
use std::time::Duration;

use crate::queue::QUEUE_TIMEOUT;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL (SQLite connection string).
    pub database_url: String,
    /// Maximum pooled database connections.
    pub db_max_connections: u32,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Card catalog JSON file.
    pub cards_path: PathBuf,
    /// How long a queue entry waits before it expires.
    pub queue_timeout: Duration,
    /// Pause between reveal checkpoints.
    pub reveal_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:matchday.db?mode=rwc".to_string(),
            db_max_connections: 5,
            port: 3000,
            cards_path: PathBuf::from("data/cards.json"),
            queue_timeout: QUEUE_TIMEOUT,
            reveal_interval: Duration::from_millis(1500),
        }
    }
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `DATABASE_URL` - SQLite connection string (default: `sqlite:matchday.db?mode=rwc`)
    /// - `DB_MAX_CONNECTIONS` - pool size (default: 5)
    /// - `PORT` - HTTP server port (default: 3000)
    /// - `CARDS_PATH` - card catalog JSON (default: `data/cards.json`)
    /// - `QUEUE_TIMEOUT_SECS` - matchmaking wait before expiry (default: 120)
    /// - `REVEAL_INTERVAL_MS` - pause between match snapshots (default: 1500)
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    /// - `--cards <PATH>` - Override the card catalog path
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let database_url = env("DATABASE_URL").unwrap_or(defaults.database_url);

        let db_max_connections = env("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .filter(|&n: &u32| n > 0)
            .unwrap_or(defaults.db_max_connections);

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = Self::parse_cli_value(args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| env("PORT").and_then(|v| v.parse().ok()))
            .unwrap_or(defaults.port);

        let cards_path = Self::parse_cli_value(args, "--cards")
            .or_else(|| env("CARDS_PATH"))
            .map(PathBuf::from)
            .unwrap_or(defaults.cards_path);

        let queue_timeout = env("QUEUE_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .filter(|&secs: &u64| secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.queue_timeout);

        let reveal_interval = env("REVEAL_INTERVAL_MS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.reveal_interval);

        Config {
            database_url,
            db_max_connections,
            port,
            cards_path,
            queue_timeout,
            reveal_interval,
        }
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}
