//! Send a Pushover message from the command line.
//!
//! ```text
//! cargo run --example send -- HomeControl InfoGroup "Door" "Front door opened" --wait
//! ```
//!
//! Keys are read from `--keys`, `PUSHOVER_KEYS`, or `keys.json` in the
//! config directory. Set `RUST_LOG=debug` to see request ids.

use anyhow::{Context, Result};
use clap::Parser;
use pushover_client::{Config, Dispatcher, KeyStore, DEFAULT_SHUTDOWN_GRACE};
use std::path::PathBuf;
use std::time::Duration;

/// Send a Pushover message by application and receiver name.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Application name from the key file.
    app: String,
    /// Receiver name from the key file.
    receiver: String,
    /// Message title.
    title: String,
    /// Message body.
    message: String,
    /// Key file, overriding the configured one.
    #[arg(long)]
    keys: Option<PathBuf>,
    /// Wait for the server to answer instead of sending in the background.
    #[arg(long)]
    wait: bool,
    /// Timeout in seconds for --wait (default from config).
    #[arg(long)]
    timeout: Option<u64>,
    /// Send the message this many times, one second apart, through a
    /// throttled channel (demonstrates rate limiting).
    #[arg(long, default_value_t = 1)]
    repeat: u32,
    /// Throttle interval in seconds for --repeat.
    #[arg(long, default_value_t = 0)]
    throttle: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(keys) = args.keys {
        config.keys_path = Some(keys);
    }

    let keys_path = config.keys_path()?;
    let keys = KeyStore::load(&keys_path)
        .with_context(|| format!("Failed to load keys from {}", keys_path.display()))?;
    let channel = keys
        .resolve(&args.app, &args.receiver)
        .context("Cannot build channel")?;
    channel.set_throttle(Duration::from_secs(args.throttle));

    let dispatcher = Dispatcher::new(&config).context("Cannot create dispatcher")?;
    let timeout = args
        .timeout
        .map_or_else(|| dispatcher.default_timeout(), Duration::from_secs);

    for attempt in 1..=args.repeat {
        let result = if args.wait {
            dispatcher
                .send_and_wait(&channel, &args.title, &args.message, timeout)
                .await
        } else {
            dispatcher.send(&channel, &args.title, &args.message)
        };

        match result {
            Ok(()) => log::info!("Message {attempt} accepted"),
            Err(err) if err.is_throttled() => log::info!("Message {attempt} throttled"),
            Err(err) => return Err(err).context("Send failed"),
        }

        if attempt < args.repeat {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    if !dispatcher.shutdown(DEFAULT_SHUTDOWN_GRACE).await {
        log::warn!("Exiting with background sends still in flight");
    }
    Ok(())
}
