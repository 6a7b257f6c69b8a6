//! Named application and receiver keys.
//!
//! Pushover identifies the sending application by an API token and the
//! recipient by a user or group key. Both are opaque 30-character strings,
//! so callers refer to them by short names kept in a JSON key file:
//!
//! ```json
//! {
//!   "app": { "HomeControl": "azGDORePK8gMaC0QOYAMyEEuzJnyUi" },
//!   "rec": { "InfoGroup":   "uQiRzpo4DXghDmr9QzzfQu27cmVRsG" }
//! }
//! ```
//!
//! The store is loaded once and never mutated afterwards. It is a plain
//! value: pass it (or an `Arc` of it) wherever channels are built.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::channel::Channel;

/// Failure to load a key file.
#[derive(Debug)]
pub enum LoadError {
    /// The file could not be read.
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The document is not a valid key file.
    Parse(serde_json::Error),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Cannot read key file {}: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "Malformed key file: {err}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err)
    }
}

/// A symbolic name that is not in the key store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No application with this name.
    UnknownApplication(String),
    /// No receiver with this name.
    UnknownReceiver(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownApplication(name) => write!(f, "Unknown pushover application: {name}"),
            Self::UnknownReceiver(name) => write!(f, "Unknown pushover receiver: {name}"),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Application and receiver keys by symbolic name.
#[derive(Clone, Default, Deserialize)]
pub struct KeyStore {
    #[serde(rename = "app", default)]
    applications: HashMap<String, String>,
    #[serde(rename = "rec", default)]
    receivers: HashMap<String, String>,
}

impl KeyStore {
    /// Loads a key file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_slice(&content)?;
        log::debug!(
            "[Keys] Loaded {} applications, {} receivers from {}",
            store.application_count(),
            store.receiver_count(),
            path.display()
        );
        Ok(store)
    }

    /// Parses a key document from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, LoadError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Parses a key document from a reader.
    pub fn from_reader(reader: impl Read) -> Result<Self, LoadError> {
        Ok(serde_json::from_reader(reader)?)
    }

    fn knows_application(&self, name: &str) -> bool {
        self.applications.contains_key(name)
    }

    fn knows_receiver(&self, name: &str) -> bool {
        self.receivers.contains_key(name)
    }

    /// True if every name is a known application. An empty query is true.
    pub fn has_application<I, S>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .all(|name| self.knows_application(name.as_ref()))
    }

    /// True if every name is a known receiver. An empty query is true.
    pub fn has_receiver<I, S>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .all(|name| self.knows_receiver(name.as_ref()))
    }

    /// Like [`has_application`](Self::has_application), but names the first
    /// missing entry. Useful to catch typos at startup.
    pub fn require_applications<I, S>(&self, names: I) -> Result<(), ResolveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match names
            .into_iter()
            .find(|name| !self.knows_application(name.as_ref()))
        {
            Some(missing) => Err(ResolveError::UnknownApplication(missing.as_ref().to_string())),
            None => Ok(()),
        }
    }

    /// Like [`has_receiver`](Self::has_receiver), but names the first
    /// missing entry.
    pub fn require_receivers<I, S>(&self, names: I) -> Result<(), ResolveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match names
            .into_iter()
            .find(|name| !self.knows_receiver(name.as_ref()))
        {
            Some(missing) => Err(ResolveError::UnknownReceiver(missing.as_ref().to_string())),
            None => Ok(()),
        }
    }

    /// Builds an unthrottled [`Channel`] for the named application and receiver.
    ///
    /// When both names are unknown the application is reported.
    pub fn resolve(&self, application: &str, receiver: &str) -> Result<Channel, ResolveError> {
        let app_key = self
            .applications
            .get(application)
            .ok_or_else(|| ResolveError::UnknownApplication(application.to_string()))?;
        let rec_key = self
            .receivers
            .get(receiver)
            .ok_or_else(|| ResolveError::UnknownReceiver(receiver.to_string()))?;
        Ok(Channel::from_keys(app_key.as_str(), rec_key.as_str()))
    }

    /// Known application names, in no particular order.
    pub fn applications(&self) -> impl Iterator<Item = &str> {
        self.applications.keys().map(String::as_str)
    }

    /// Known receiver names, in no particular order.
    pub fn receivers(&self) -> impl Iterator<Item = &str> {
        self.receivers.keys().map(String::as_str)
    }

    /// Number of known applications.
    pub fn application_count(&self) -> usize {
        self.applications.len()
    }

    /// Number of known receivers.
    pub fn receiver_count(&self) -> usize {
        self.receivers.len()
    }

    /// True if neither section has entries.
    pub fn is_empty(&self) -> bool {
        self.applications.is_empty() && self.receivers.is_empty()
    }
}

impl FromStr for KeyStore {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

// Names only; the secrets never reach logs.
impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut apps: Vec<&str> = self.applications().collect();
        let mut recs: Vec<&str> = self.receivers().collect();
        apps.sort_unstable();
        recs.sort_unstable();
        f.debug_struct("KeyStore")
            .field("applications", &apps)
            .field("receivers", &recs)
            .finish()
    }
}
