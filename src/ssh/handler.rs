use std::future::Future;
use std::path::PathBuf;

use russh::client::Handler;
use russh::keys::PublicKey;

use crate::config::HostKeyPolicy;
use crate::error::SshError;

use super::known_hosts::{self, HostKeyDecision};

/// SSH client handler: decides whether to trust the server's host key
pub struct ClientHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
    known_hosts_path: Option<PathBuf>,
}

impl ClientHandler {
    pub fn new(
        host: String,
        port: u16,
        policy: HostKeyPolicy,
        known_hosts_path: Option<PathBuf>,
    ) -> Self {
        Self {
            host,
            port,
            policy,
            known_hosts_path,
        }
    }
}

impl Handler for ClientHandler {
    type Error = SshError;

    fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        let host = self.host.clone();
        let port = self.port;
        let policy = self.policy;
        let path = self.known_hosts_path.clone();
        let key = server_public_key.clone();

        async move {
            // known_hosts access is file I/O; keep it off the reactor
            let decision = tokio::task::spawn_blocking(move || {
                known_hosts::verify_host_key(&host, port, &key, policy, path.as_deref())
            })
            .await
            .map_err(|e| SshError::HostKeyVerification(format!("Host key check failed: {}", e)))??;

            if let HostKeyDecision::Learned { persisted } = decision {
                tracing::debug!("Accepted new host key (persisted: {})", persisted);
            }
            Ok(true)
        }
    }
}
