//! Message delivery to the Pushover API.
//!
//! Two send paths share one [`Dispatcher`]:
//!
//! - [`Dispatcher::send_and_wait`] awaits the HTTP exchange and reports
//!   network and server failures.
//! - [`Dispatcher::send`] spawns the request in the background and returns
//!   at once. Delivery failures are logged and dropped.
//!
//! Both consult the channel's throttle first and return [`SendError::Throttled`]
//! synchronously, so callers can tell "rate limited" apart from "sent".
//!
//! # Architecture
//!
//! ```text
//! Channel::gate ──rejected──> SendError::Throttled
//!     │
//!     accepted
//!     ├── send_and_wait: POST, await status + body
//!     └── send:          TaskTracker::spawn_on(POST) ──> logged, never returned
//! ```
//!
//! Background sends are tracked so [`Dispatcher::shutdown`] can give them a
//! grace period before the process exits.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;

use crate::channel::Channel;
use crate::config::Config;
use crate::constants::USER_AGENT;
use crate::throttle::Throttled;

/// Errors from sending a message.
#[derive(Debug)]
pub enum SendError {
    /// The channel's throttle rejected the send; nothing went out.
    Throttled,
    /// Transport failure: connect, timeout, or reading the reply.
    Network(reqwest::Error),
    /// The API answered with a 5xx status.
    Server(StatusCode),
}

impl SendError {
    /// True for throttle rejections.
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled)
    }

    /// True if the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network(err) if err.is_timeout())
    }
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Throttled => write!(f, "{}", Throttled),
            Self::Network(err) => write!(f, "Pushover request failed: {err}"),
            Self::Server(status) => write!(f, "Pushover server error: {status}"),
        }
    }
}

impl std::error::Error for SendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Network(err) => Some(err),
            Self::Throttled | Self::Server(_) => None,
        }
    }
}

impl From<Throttled> for SendError {
    fn from(_: Throttled) -> Self {
        Self::Throttled
    }
}

impl From<reqwest::Error> for SendError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err)
    }
}

/// Errors while building a [`Dispatcher`].
#[derive(Debug)]
pub enum BuildError {
    /// Not called from inside a Tokio runtime.
    NoRuntime(tokio::runtime::TryCurrentError),
    /// The HTTP client could not be initialized (e.g. TLS backend).
    HttpClient(reqwest::Error),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuntime(err) => write!(f, "Dispatcher needs a Tokio runtime: {err}"),
            Self::HttpClient(err) => write!(f, "Cannot build HTTP client: {err}"),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NoRuntime(err) => Some(err),
            Self::HttpClient(err) => Some(err),
        }
    }
}

/// Form body of a message request.
#[derive(Debug, Clone, Serialize)]
struct MessageForm {
    token: String,
    user: String,
    title: String,
    message: String,
}

impl MessageForm {
    fn new(channel: &Channel, title: &str, body: &str) -> Self {
        Self {
            token: channel.application_key().to_string(),
            user: channel.receiver_key().to_string(),
            title: title.to_string(),
            message: body.to_string(),
        }
    }
}

/// JSON reply from the messages endpoint.
///
/// Only used for logging; a reply that does not parse is not an error.
#[derive(Debug, Default, Deserialize)]
struct Reply {
    #[serde(default)]
    request: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

/// Sends messages for any number of channels.
///
/// Holds a pooled HTTP client and the runtime handle used for background
/// sends. Build one per process and share it.
#[derive(Debug)]
pub struct Dispatcher {
    client: Client,
    endpoint: String,
    runtime: Handle,
    tracker: TaskTracker,
    default_timeout: Duration,
}

impl Dispatcher {
    /// Creates a dispatcher for the configured endpoint.
    ///
    /// Must be called from within a Tokio runtime; background sends are
    /// spawned onto that runtime.
    pub fn new(config: &Config) -> Result<Self, BuildError> {
        let runtime = Handle::try_current().map_err(BuildError::NoRuntime)?;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(BuildError::HttpClient)?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            runtime,
            tracker: TaskTracker::new(),
            default_timeout: config.timeout(),
        })
    }

    /// Creates a dispatcher for a custom endpoint (proxies, tests).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, BuildError> {
        let config = Config {
            endpoint: endpoint.into(),
            ..Config::default()
        };
        Self::new(&config)
    }

    /// Endpoint this dispatcher posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Timeout from the configuration, for callers without their own.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Sends a message and waits for the API to answer.
    ///
    /// Returns `Ok(())` once the reply body was read and the status is below
    /// 500. Client errors (4xx) are logged but still count as delivered.
    /// When throttled, returns immediately without touching the network.
    ///
    /// A `timeout` of `Duration::ZERO` means no timeout.
    pub async fn send_and_wait(
        &self,
        channel: &Channel,
        title: &str,
        body: &str,
        timeout: Duration,
    ) -> Result<(), SendError> {
        let form = MessageForm::new(channel, title, body);
        let timeout = (!timeout.is_zero()).then_some(timeout);
        let request = channel.gate(|| {
            deliver(self.client.clone(), self.endpoint.clone(), form, timeout)
        })?;
        request.await
    }

    /// Sends a message in the background and returns at once.
    ///
    /// Only a throttle rejection is reported. Network and server failures
    /// happen after this returns and are logged, never surfaced.
    pub fn send(&self, channel: &Channel, title: &str, body: &str) -> Result<(), SendError> {
        let form = MessageForm::new(channel, title, body);
        channel.gate(|| {
            let request = deliver(self.client.clone(), self.endpoint.clone(), form, None);
            self.tracker.spawn_on(
                async move {
                    if let Err(err) = request.await {
                        log::warn!("[Pushover] Background send dropped: {err}");
                    }
                },
                &self.runtime,
            );
        })?;
        Ok(())
    }

    /// Number of background sends still in flight.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Waits up to `grace` for background sends to finish.
    ///
    /// Returns `true` if all of them completed. Sends still running after
    /// the deadline are left alone. Sends accepted after this call are
    /// still spawned.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending > 0 {
            log::info!("[Pushover] Waiting for {pending} background send(s)");
        }
        let finished = tokio::time::timeout(grace, self.tracker.wait()).await.is_ok();
        if !finished {
            log::warn!(
                "[Pushover] {} background send(s) still running after {:?}",
                self.tracker.len(),
                grace
            );
        }
        finished
    }
}

/// Posts one message. Owns everything it needs so it can run detached.
async fn deliver(
    client: Client,
    endpoint: String,
    form: MessageForm,
    timeout: Option<Duration>,
) -> Result<(), SendError> {
    let mut request = client.post(&endpoint).form(&form);
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }

    let response = request.send().await?;
    let status = response.status();

    // 5xx replies carry no usable body. Failures are logged by the caller.
    if status.is_server_error() {
        return Err(SendError::Server(status));
    }

    let bytes = response.bytes().await?;
    let reply: Reply = serde_json::from_slice(&bytes).unwrap_or_default();

    if status.is_client_error() {
        log::warn!(
            "[Pushover] Message rejected ({status}): {}",
            reply.errors.join("; ")
        );
    } else {
        log::debug!(
            "[Pushover] Delivered ({status}), request={}",
            reply.request.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
