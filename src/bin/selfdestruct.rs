//! SELFDESTRUCT Shell
//!
//! Interactive front end over the message store. Reads one command per line
//! from stdin:
//!
//! ```text
//! add <ttl-secs> <message...>   store a message, prints its key
//! get <key>                     read (and start the self-destruct countdown)
//! stats                         print counters
//! quit
//! ```

use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;
use selfdestruct::{ShardedStore, StatsSnapshot, Store, StoreConfig, Uuid, MAX_TTL};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// SELFDESTRUCT - messages that delete themselves after being read
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Remaining lifetime of a message once read, in seconds
    #[arg(long, default_value_t = 60)]
    view_window: u64,

    /// Sweeper interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    sweep_interval_ms: u64,

    /// Number of store partitions (0 = single store)
    #[arg(long, default_value_t = 0)]
    shards: usize,
}

enum Backend {
    Single(Store),
    Sharded(ShardedStore),
}

impl Backend {
    fn add_with_ttl(&self, key: Uuid, message: String, ttl: Duration) -> bool {
        match self {
            Backend::Single(s) => s.add_with_ttl(key, message, ttl),
            Backend::Sharded(s) => s.add_with_ttl(key, message, ttl),
        }
    }

    fn get(&self, key: &Uuid) -> Option<String> {
        match self {
            Backend::Single(s) => s.get(key),
            Backend::Sharded(s) => s.get(key),
        }
    }

    fn stats(&self) -> StatsSnapshot {
        match self {
            Backend::Single(s) => s.stats(),
            Backend::Sharded(s) => s.stats(),
        }
    }

    async fn shutdown(&self) {
        match self {
            Backend::Single(s) => s.shutdown().await,
            Backend::Sharded(s) => s.shutdown().await,
        }
    }
}

enum Reply {
    Print(String),
    Quit,
    Nothing,
}

fn handle_line(backend: &Backend, line: &str) -> anyhow::Result<Reply> {
    let mut parts = line.trim().splitn(3, ' ');
    let reply = match parts.next().unwrap_or_default() {
        "" => return Ok(Reply::Nothing),
        "add" => {
            const USAGE: &str = "usage: add <ttl-secs> <message>";
            let ttl: u64 = parts
                .next()
                .context(USAGE)?
                .parse()
                .context("ttl must be a whole number of seconds")?;
            if ttl > MAX_TTL.as_secs() {
                bail!("ttl must be at most {} seconds", MAX_TTL.as_secs());
            }
            let message = match parts.next().map(str::trim) {
                Some(m) if !m.is_empty() => m.to_string(),
                _ => bail!(USAGE),
            };
            let expires = chrono::Duration::try_seconds(ttl as i64)
                .and_then(|d| Utc::now().checked_add_signed(d))
                .context("ttl out of range")?;
            let key = Uuid::new_v4();
            if !backend.add_with_ttl(key, message, Duration::from_secs(ttl)) {
                bail!("key collision, try again");
            }
            format!("{} (expires {})", key, expires.to_rfc3339())
        }
        "get" => {
            let raw = parts.next().context("usage: get <key>")?;
            let key = Uuid::parse_str(raw.trim()).map_err(selfdestruct::Error::from)?;
            backend
                .get(&key)
                .unwrap_or_else(|| "(no such message)".to_string())
        }
        "stats" => backend.stats().summary(),
        "quit" | "exit" => return Ok(Reply::Quit),
        other => bail!("unknown command: {}", other),
    };
    Ok(Reply::Print(reply))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("selfdestruct=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = StoreConfig::default()
        .with_view_window(Duration::from_secs(args.view_window))
        .with_sweep_interval(Duration::from_millis(args.sweep_interval_ms))
        .with_shards(args.shards);

    let backend = if args.shards == 0 {
        info!("Starting SELFDESTRUCT with a single store");
        Backend::Single(Store::with_config(config)?)
    } else {
        info!("Starting SELFDESTRUCT with {} shards", args.shards);
        Backend::Sharded(ShardedStore::with_config(config)?)
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match handle_line(&backend, &line) {
            Ok(Reply::Print(reply)) => println!("{}", reply),
            Ok(Reply::Quit) => break,
            Ok(Reply::Nothing) => {}
            Err(e) => println!("error: {:#}", e),
        }
    }

    info!("{}", backend.stats().summary());
    backend.shutdown().await;
    Ok(())
}
