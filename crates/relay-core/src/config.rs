//! Optional TOML settings file shared by both binaries.
//!
//! Every field is optional.  A value present here overrides the built-in
//! default, and a command-line flag or environment variable overrides the
//! file:
//!
//! ```toml
//! [daemon]
//! socket_path = "/run/automatelinux/automatelinux-daemon.sock"
//! reconnect_backoff_ms = 1000
//! registration_command = "registerNativeHost"
//! request_timeout_ms = 2000
//!
//! [http]
//! bind_address = "127.0.0.1"
//! port = 9223
//!
//! [stdio]
//! max_frame_bytes = 10485760
//! acknowledge = false
//!
//! [logging]
//! level = "info"
//! file = "/tmp/relay-native-host.log"
//! ```
//!
//! Unknown keys are rejected so a typo does not silently fall back to a
//! default.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::link::LinkConfig;
use crate::protocol::message::command;

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error reading settings at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Settings schema ───────────────────────────────────────────────────────────

/// Top-level settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelaySettings {
    pub daemon: DaemonSettings,
    pub http: HttpSettings,
    pub stdio: StdioSettings,
    pub logging: LoggingSettings,
}

/// Control-socket settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonSettings {
    /// Path of the daemon's Unix control socket.
    pub socket_path: Option<PathBuf>,
    /// Pause between reconnect attempts, in milliseconds.
    pub reconnect_backoff_ms: Option<u64>,
    /// `command` value of the registration record.  Replaces the built-in
    /// registration of whichever binary reads this file.
    pub registration_command: Option<String>,
    /// How long `POST /command` waits for the daemon's reply, in milliseconds.
    pub request_timeout_ms: Option<u64>,
}

/// HTTP/SSE bridge listener settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSettings {
    pub bind_address: Option<IpAddr>,
    pub port: Option<u16>,
}

/// Native-messaging stdio settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StdioSettings {
    /// Largest accepted inbound frame body.
    pub max_frame_bytes: Option<usize>,
    /// Answer each browser message with a status acknowledgement.
    pub acknowledge: Option<bool>,
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub level: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl RelaySettings {
    /// Reads and parses the settings file at `path`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Parse`]
    /// if it is not valid settings TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Daemon link settings with file values applied over the defaults.
    pub fn link_config(&self) -> LinkConfig {
        self.link_config_over(LinkConfig::default())
    }

    /// Applies the file's daemon settings over `config`.  A binary with its
    /// own defaults (such as a different registration record) starts from
    /// those.
    pub fn link_config_over(&self, mut config: LinkConfig) -> LinkConfig {
        if let Some(path) = &self.daemon.socket_path {
            config.socket_path = path.clone();
        }
        if let Some(ms) = self.daemon.reconnect_backoff_ms {
            config.reconnect_backoff = Duration::from_millis(ms);
        }
        if let Some(name) = &self.daemon.registration_command {
            config.registration = command(name);
        }
        config
    }

    /// Reply timeout for one-off requests, if configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.daemon.request_timeout_ms.map(Duration::from_millis)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
