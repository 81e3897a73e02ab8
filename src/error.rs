use std::path::PathBuf;

use russh_sftp::protocol::StatusCode;
use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// SSH-related errors
#[derive(Error, Debug)]
pub enum SshError {
    #[error("Connection failed to {host}:{port}: {reason}")]
    ConnectionFailed {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Command '{0}' was cancelled")]
    Cancelled(String),

    #[error("Command output is not valid UTF-8: {0}")]
    OutputDecode(#[from] std::string::FromUtf8Error),

    #[error("Host key verification failed: {0}")]
    HostKeyVerification(String),

    #[error("Session is closed")]
    Closed,

    #[error("russh error: {0}")]
    Russh(String),
}

impl From<russh::Error> for SshError {
    fn from(err: russh::Error) -> Self {
        SshError::Russh(err.to_string())
    }
}

/// SFTP-related errors
#[derive(Error, Debug)]
pub enum SftpError {
    #[error("SFTP connection failed: {0}")]
    ConnectionFailed(String),

    /// The server answered with a status other than OK.
    #[error("{op} '{path}' failed: {code:?}: {message}")]
    Status {
        op: &'static str,
        path: String,
        code: StatusCode,
        message: String,
    },

    #[error("{op} '{path}' failed: {reason}")]
    FileOperation {
        op: &'static str,
        path: String,
        reason: String,
    },

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Local I/O error: {0}")]
    LocalIo(String),
}

impl SftpError {
    /// Map a russh-sftp error, keeping the status code when there is one.
    pub fn from_sftp(op: &'static str, path: &str, err: russh_sftp::client::error::Error) -> Self {
        match err {
            russh_sftp::client::error::Error::Status(status) => SftpError::Status {
                op,
                path: path.to_string(),
                code: status.status_code,
                message: status.error_message,
            },
            other => SftpError::FileOperation {
                op,
                path: path.to_string(),
                reason: other.to_string(),
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SftpError::Status {
                code: StatusCode::NoSuchFile,
                ..
            }
        )
    }
}

/// Errors from recursive file transfers
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("{0} does not exist")]
    LocalNotFound(PathBuf),

    #[error("Remote path {0} does not exist")]
    RemoteNotFound(String),

    #[error("{path} already exists")]
    AlreadyExists { path: String },

    #[error("{path} exists and is not a directory")]
    NotADirectory { path: String },

    #[error("{path} is neither a regular file nor a directory")]
    Unsupported { path: String },

    #[error("Local I/O error on {path}: {source}")]
    LocalIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Sftp(#[from] SftpError),
}

impl TransferError {
    pub(crate) fn local_io(path: &std::path::Path, source: std::io::Error) -> Self {
        TransferError::LocalIo {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Top-level error returned by [`crate::RemoteSession`]
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Ssh(#[from] SshError),

    #[error(transparent)]
    Sftp(#[from] SftpError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
