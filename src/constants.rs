//! Crate-wide constants.
//!
//! Endpoint, timeouts and file names used across the client live here so
//! they are easy to find and override in one place.

use std::time::Duration;

// ============================================================================
// Remote API
// ============================================================================

/// Pushover message endpoint.
///
/// Accepts a form-encoded POST with `token`, `user`, `title` and `message`.
pub const MESSAGES_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("pushover-client/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Timeouts
// ============================================================================

/// Default timeout for waiting sends when the caller has no better value.
///
/// Only used through [`crate::Config`]; `send_and_wait` always takes an
/// explicit timeout.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `Dispatcher::shutdown` callers typically wait for background sends.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// Files & environment
// ============================================================================

/// Directory name below the platform config dir.
pub const CONFIG_DIR_NAME: &str = "pushover";

/// Client settings file inside the config dir.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Key file inside the config dir.
pub const KEYS_FILE_NAME: &str = "keys.json";

/// Overrides the config directory.
pub const ENV_CONFIG_DIR: &str = "PUSHOVER_CONFIG_DIR";

/// Overrides the key file path.
pub const ENV_KEYS: &str = "PUSHOVER_KEYS";

/// Overrides the message endpoint.
pub const ENV_ENDPOINT: &str = "PUSHOVER_ENDPOINT";

/// Overrides the default send timeout, in seconds.
pub const ENV_TIMEOUT: &str = "PUSHOVER_TIMEOUT";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_is_https() {
        assert!(MESSAGES_ENDPOINT.starts_with("https://"));
    }

    #[test]
    fn test_user_agent_carries_version() {
        assert!(USER_AGENT.ends_with(env!("CARGO_PKG_VERSION")));
    }
}
