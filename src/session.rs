//! A single SSH connection with its SFTP sub-channel

use std::path::Path;

use russh::Disconnect;
use russh::client::Handle;

use crate::config::SessionConfig;
use crate::error::{Error, SshError};
use crate::sftp::{DirectoryTransfer, SftpSession};
use crate::ssh::exec::{self, CommandOutput, ExecOptions};
use crate::ssh::handler::ClientHandler;
use crate::ssh::SshClient;

/// One authenticated connection, one SFTP sub-channel, and the output of
/// every command run through it.
///
/// The connection is opened by [`RemoteSession::connect`] and released by
/// [`RemoteSession::close`]. Command execution takes `&mut self`, so a
/// session cannot run two commands at once.
pub struct RemoteSession {
    host: String,
    handle: Option<Handle<ClientHandler>>,
    transfer: Option<DirectoryTransfer<SftpSession>>,
    output: String,
    last_output: String,
}

impl std::fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("host", &self.host)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl RemoteSession {
    /// Connect with password authentication and default settings
    pub async fn connect(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> Result<Self, Error> {
        Self::connect_with(SessionConfig::new(host, port, username, password)).await
    }

    pub async fn connect_with(settings: SessionConfig) -> Result<Self, Error> {
        let handle = SshClient::from_session_config(&settings)
            .connect(&settings)
            .await?;

        let sftp = match SftpSession::open(
            &handle,
            &settings.host,
            settings.port,
            &settings.username,
        )
        .await
        {
            Ok(sftp) => sftp,
            Err(e) => {
                if let Err(close_err) = handle
                    .disconnect(Disconnect::ByApplication, "", "en")
                    .await
                {
                    tracing::debug!("Disconnect after SFTP failure: {}", close_err);
                }
                return Err(e.into());
            }
        };

        tracing::info!("Connected to {}:{}", settings.host, settings.port);

        Ok(Self {
            host: settings.host,
            handle: Some(handle),
            transfer: Some(DirectoryTransfer::new(sftp)),
            output: String::new(),
            last_output: String::new(),
        })
    }

    fn transfer(&self) -> Result<&DirectoryTransfer<SftpSession>, SshError> {
        self.transfer.as_ref().ok_or(SshError::Closed)
    }

    /// Upload a local file or directory into remote directory `dst`,
    /// creating `dst` if needed. Returns the number of files copied.
    pub async fn upload(&self, src: impl AsRef<Path>, dst: &str) -> Result<usize, Error> {
        let src = src.as_ref();
        let count = self.transfer()?.upload(src, dst).await?;
        tracing::info!("Uploaded {} file(s) from {} to {}", count, src.display(), dst);
        Ok(count)
    }

    /// Download a remote file or directory into local directory `dst`,
    /// creating `dst` if needed. Returns the number of files copied.
    pub async fn download(&self, src: &str, dst: impl AsRef<Path>) -> Result<usize, Error> {
        let dst = dst.as_ref();
        let count = self.transfer()?.download(src, dst).await?;
        tracing::info!("Downloaded {} file(s) from {} to {}", count, src, dst.display());
        Ok(count)
    }

    /// Remove a remote file or a whole remote directory tree
    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        self.transfer()?.delete(path).await?;
        tracing::info!("Deleted {}", path);
        Ok(())
    }

    /// Run `command`, waiting as long as it takes
    pub async fn exec(&mut self, command: &str) -> Result<CommandOutput, Error> {
        self.exec_with(command, &ExecOptions::default()).await
    }

    /// Run `command` under a deadline and/or cancellation token.
    ///
    /// The merged stdout/stderr is appended to [`Self::output`] and
    /// replaces [`Self::last_output`]. Nothing is recorded on failure.
    pub async fn exec_with(
        &mut self,
        command: &str,
        options: &ExecOptions,
    ) -> Result<CommandOutput, Error> {
        let handle = self.handle.as_ref().ok_or(SshError::Closed)?;

        tracing::debug!("Executing '{}' on {}", command, self.host);
        let result = exec::execute(handle, command, options).await?;

        self.output.push_str(&result.output);
        self.last_output.clone_from(&result.output);
        tracing::debug!(
            "'{}' exited with {:?}: {}",
            command,
            result.exit_status,
            self.last_output
        );

        Ok(result)
    }

    /// All output received over the lifetime of the session
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Output of the most recent successful command
    pub fn last_output(&self) -> &str {
        &self.last_output
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// Release the SFTP sub-channel, then the connection.
    /// Each step is best-effort and skipped when already done.
    pub async fn close(&mut self) {
        if let Some(transfer) = self.transfer.take() {
            if let Err(e) = transfer.fs().close().await {
                tracing::debug!("Closing SFTP session: {}", e);
            }
        }

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle
                .disconnect(Disconnect::ByApplication, "", "en")
                .await
            {
                tracing::debug!("Disconnecting from {}: {}", self.host, e);
            }
            tracing::info!("Disconnected from {}", self.host);
        }
    }
}
