use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, Config, Handle};
use secrecy::ExposeSecret;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::SessionConfig;
use crate::error::SshError;
use crate::security_log;

use super::handler::ClientHandler;

/// SSH client for establishing password-authenticated connections
pub struct SshClient {
    config: Arc<Config>,
}

impl SshClient {
    pub fn new(keepalive_interval: Option<Duration>) -> Self {
        // No inactivity limit: a silent command may run for any length of
        // time. Dead peers are detected through keepalive_max instead.
        let config = Config {
            inactivity_timeout: None,
            keepalive_interval,
            keepalive_max: 3,
            ..Default::default()
        };

        Self {
            config: Arc::new(config),
        }
    }

    pub fn from_session_config(settings: &SessionConfig) -> Self {
        Self::new(settings.keepalive_interval())
    }

    /// Connect and authenticate. The returned handle is the transport that
    /// both the SFTP subsystem and exec channels are opened on.
    pub async fn connect(&self, settings: &SessionConfig) -> Result<Handle<ClientHandler>, SshError> {
        let addr = format!("{}:{}", settings.host, settings.port);
        let connect_timeout = settings.connect_timeout();

        tracing::info!("Connecting to host '{}'", settings.host);

        let stream = within(
            connect_timeout,
            TcpStream::connect(&addr),
            format!("connecting to {}", addr),
        )
        .await?
        .map_err(|e| SshError::ConnectionFailed {
            host: settings.host.clone(),
            port: settings.port,
            reason: e.to_string(),
        })?;

        within(
            connect_timeout,
            self.establish(settings, stream),
            format!("SSH handshake with {}", addr),
        )
        .await?
    }

    async fn establish(
        &self,
        settings: &SessionConfig,
        stream: TcpStream,
    ) -> Result<Handle<ClientHandler>, SshError> {
        let handler = ClientHandler::new(
            settings.host.clone(),
            settings.port,
            settings.host_key_policy,
            settings.known_hosts_path.clone(),
        );

        let mut handle = client::connect_stream(self.config.clone(), stream, handler)
            .await
            .map_err(|e| match e {
                SshError::HostKeyVerification(_) => e,
                other => SshError::ConnectionFailed {
                    host: settings.host.clone(),
                    port: settings.port,
                    reason: other.to_string(),
                },
            })?;

        self.authenticate(&mut handle, settings).await?;
        Ok(handle)
    }

    async fn authenticate(
        &self,
        handle: &mut Handle<ClientHandler>,
        settings: &SessionConfig,
    ) -> Result<(), SshError> {
        let method_name = "password";
        let (host, port, username) = (&settings.host, settings.port, &settings.username);

        security_log::log_auth_attempt(host, port, username, method_name);

        // Use expose_secret() only at the point of authentication
        let auth_result = match handle
            .authenticate_password(username.as_str(), settings.password.expose_secret())
            .await
        {
            Ok(result) => result,
            Err(e) => {
                let reason = e.to_string();
                security_log::log_auth_failure(host, port, username, method_name, &reason);
                return Err(SshError::AuthenticationFailed(reason));
            }
        };

        if !auth_result.success() {
            let reason = "Authentication rejected by server";
            security_log::log_auth_failure(host, port, username, method_name, reason);
            return Err(SshError::AuthenticationFailed(reason.to_string()));
        }

        security_log::log_auth_success(host, port, username, method_name);
        Ok(())
    }
}

/// Await `fut`, bounded by `limit` when one is set
async fn within<F, T>(limit: Option<Duration>, fut: F, what: String) -> Result<T, SshError>
where
    F: Future<Output = T>,
{
    match limit {
        Some(limit) => timeout(limit, fut)
            .await
            .map_err(|_| SshError::Timeout(what)),
        None => Ok(fut.await),
    }
}

impl Default for SshClient {
    fn default() -> Self {
        Self::new(Some(Duration::from_secs(60)))
    }
}
