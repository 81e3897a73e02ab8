use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

fn default_port() -> u16 {
    22
}

fn default_timeout() -> u64 {
    30
}

fn default_keepalive() -> u64 {
    60
}

/// How the server's host key is checked during the handshake
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyPolicy {
    /// Trust unknown hosts on first contact and remember them.
    /// A key that contradicts a remembered one is still rejected.
    #[default]
    AutoAdd,
    /// Only accept keys already present in the known_hosts file.
    Strict,
}

/// On-disk shape of a session profile
#[derive(Debug, Deserialize)]
struct SessionFile {
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    username: String,
    password: String,
    #[serde(default = "default_timeout")]
    connect_timeout_secs: u64,
    #[serde(default = "default_keepalive")]
    keepalive_interval_secs: u64,
    #[serde(default)]
    host_key_policy: HostKeyPolicy,
    #[serde(default)]
    known_hosts_path: Option<String>,
}

/// Everything needed to open a [`crate::RemoteSession`]
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// 0 disables the connect timeout
    pub connect_timeout_secs: u64,
    /// 0 disables keepalives
    pub keepalive_interval_secs: u64,
    pub host_key_policy: HostKeyPolicy,
    /// File that learned host keys are checked against and appended to.
    /// `None` keeps trust decisions in memory for the lifetime of the session.
    pub known_hosts_path: Option<PathBuf>,
}

impl SessionConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: SecretString::from(password.into()),
            connect_timeout_secs: default_timeout(),
            keepalive_interval_secs: default_keepalive(),
            host_key_policy: HostKeyPolicy::default(),
            known_hosts_path: None,
        }
    }

    /// Load a session profile from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: SessionFile = toml::from_str(content)?;

        if file.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }
        if file.username.trim().is_empty() {
            return Err(ConfigError::Invalid("username must not be empty".to_string()));
        }
        if file.port == 0 {
            return Err(ConfigError::Invalid("port must not be 0".to_string()));
        }

        Ok(Self {
            host: file.host,
            port: file.port,
            username: file.username,
            password: SecretString::from(file.password),
            connect_timeout_secs: file.connect_timeout_secs,
            keepalive_interval_secs: file.keepalive_interval_secs,
            host_key_policy: file.host_key_policy,
            known_hosts_path: file
                .known_hosts_path
                .as_deref()
                .map(super::paths::expand_tilde),
        })
    }

    /// Persist learned host keys in the application's known_hosts file
    pub fn with_default_known_hosts(mut self) -> Self {
        self.known_hosts_path = super::paths::known_hosts_file();
        self
    }

    pub fn with_host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = policy;
        self
    }

    pub fn with_known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Limit on TCP connect and on handshake plus auth; 0 waits indefinitely
    pub fn connect_timeout(&self) -> Option<Duration> {
        if self.connect_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.connect_timeout_secs))
        }
    }

    /// Treat 0 as "no keepalive" to avoid immediate timeout
    pub fn keepalive_interval(&self) -> Option<Duration> {
        if self.keepalive_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.keepalive_interval_secs))
        }
    }
}
