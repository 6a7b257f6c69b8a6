//! Pushover client - named keys, throttled channels, two send paths.
//!
//! Sends push notifications through the Pushover HTTP API. Application and
//! receiver keys are looked up by short names from a local key file, bound
//! into reusable channels, and sent either waiting for the reply or in the
//! background.
//!
//! # Architecture
//!
//! - **KeyStore** - Name to key mappings, loaded once from JSON
//! - **Channel** - Application/receiver key pair with an optional throttle
//! - **ThrottleGate** - At most one send per interval, checked atomically
//! - **Dispatcher** - HTTP client; waiting and fire-and-forget sends
//!
//! # Example
//!
//! ```ignore
//! let config = Config::load()?;
//! let keys = KeyStore::load(config.keys_path()?)?;
//! let channel = keys.resolve("HomeControl", "InfoGroup")?;
//! channel.set_throttle(Duration::from_secs(60));
//!
//! let dispatcher = Dispatcher::new(&config)?;
//! dispatcher.send(&channel, "Door", "Front door opened")?;
//! dispatcher
//!     .send_and_wait(&channel, "Alarm", "Smoke detected", Duration::from_secs(5))
//!     .await?;
//! dispatcher.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
//! ```

pub mod channel;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod keys;
pub mod throttle;

// Re-export commonly used types
pub use channel::Channel;
pub use config::{Config, ConfigError};
pub use constants::{DEFAULT_SHUTDOWN_GRACE, MESSAGES_ENDPOINT};
pub use dispatch::{BuildError, Dispatcher, SendError};
pub use keys::{KeyStore, LoadError, ResolveError};
pub use throttle::{ThrottleGate, Throttled};
