//! Recursive SFTP transfers and remote command execution over one SSH
//! connection.
//!
//! [`RemoteSession`] owns the connection, its SFTP sub-channel and the
//! accumulated command output. Tree-walking lives in
//! [`sftp::DirectoryTransfer`], which works against any [`sftp::RemoteFs`].
//! [`blocking::RemoteSession`] offers the same API without async.

pub mod blocking;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod sftp;
pub mod ssh;

pub(crate) mod security_log;

pub use config::{HostKeyPolicy, SessionConfig};
pub use error::Error;
pub use session::RemoteSession;
pub use ssh::{CommandOutput, ExecOptions};
pub use tokio_util::sync::CancellationToken;
