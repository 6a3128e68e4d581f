//! TOML-based configuration for the agent.
//!
//! Example:
//!
//! ```toml
//! [connection]
//! kind = "unix"
//! socket = "/tmp/mirror-agent.sock"
//! receive_timeout_ms = 250
//!
//! [session]
//! start_video_stream = true
//! display_polling = true
//! polling_interval_ms = 500
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Every field has a serde default, so a partial file (or no file at all)
//! yields a usable configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::session::{DisplayPolling, SessionConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Lower bound of the display polling interval.
pub const MIN_POLLING_INTERVAL_MS: u64 = 10;

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SocketKind {
    /// `socket` is a Unix-domain socket path.
    Unix,
    /// `socket` is a `host:port` address.
    Tcp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    #[serde(default = "default_socket_kind")]
    pub kind: SocketKind,
    #[serde(default = "default_socket")]
    pub socket: String,
    /// How long the receive loop waits for input before sending pending
    /// notifications.
    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,
    /// Budget for delivering one outbound message.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSettings {
    /// Video streams from the start of the session; the device is woken up
    /// during initialization.
    #[serde(default)]
    pub start_video_stream: bool,
    /// Poll the display list instead of relying on display callbacks.
    #[serde(default)]
    pub display_polling: bool,
    /// Clamped to [`MIN_POLLING_INTERVAL_MS`].
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
    /// `0` polls for the whole session.
    #[serde(default)]
    pub polling_duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_socket_kind() -> SocketKind {
    SocketKind::Unix
}
fn default_socket() -> String {
    "/tmp/mirror-agent.sock".to_string()
}
fn default_receive_timeout_ms() -> u64 {
    250
}
fn default_write_timeout_ms() -> u64 {
    5000
}
fn default_polling_interval_ms() -> u64 {
    500
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            kind: default_socket_kind(),
            socket: default_socket(),
            receive_timeout_ms: default_receive_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            start_video_stream: false,
            display_polling: false,
            polling_interval_ms: default_polling_interval_ms(),
            polling_duration_ms: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AgentConfig {
    /// Checks values that parse but cannot drive a session.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero receive or write timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.receive_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "connection.receive_timeout_ms must be positive".to_string(),
            ));
        }
        if self.connection.write_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "connection.write_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the controller settings described by this configuration.
    pub fn session_config(&self) -> SessionConfig {
        let interval_ms = self
            .session
            .polling_interval_ms
            .max(MIN_POLLING_INTERVAL_MS);
        let display_polling = self.session.display_polling.then(|| DisplayPolling {
            interval: Duration::from_millis(interval_ms),
            duration: (self.session.polling_duration_ms > 0)
                .then(|| Duration::from_millis(self.session.polling_duration_ms)),
        });
        SessionConfig {
            receive_timeout: Duration::from_millis(self.connection.receive_timeout_ms),
            write_timeout: Duration::from_millis(self.connection.write_timeout_ms),
            wake_on_initialize: self.session.start_video_stream,
            display_polling,
        }
    }
}

/// Loads `AgentConfig` from `path`, returning defaults if the file does not
/// exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed and
/// [`ConfigError::Invalid`] if [`AgentConfig::validate`] rejects it.
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let config: AgentConfig = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AgentConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
