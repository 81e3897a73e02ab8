//! Host key checks against an OpenSSH known_hosts file

use std::path::Path;

use russh::keys::known_hosts::{known_host_keys_path, learn_known_hosts_path};
use russh::keys::{HashAlg, PublicKey};

use crate::config::HostKeyPolicy;
use crate::error::SshError;
use crate::security_log;

/// Outcome of a host key check that let the connection proceed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKeyDecision {
    /// Key matches a stored entry
    Matched,
    /// First contact: key trusted and, if `persisted`, written to known_hosts
    Learned { persisted: bool },
}

/// Get the SHA-256 fingerprint of a public key
pub fn fingerprint(key: &PublicKey) -> String {
    key.fingerprint(HashAlg::Sha256).to_string()
}

/// Check `key` for `host:port` under `policy`.
///
/// Without a known_hosts file there is nothing to compare against, so
/// `AutoAdd` trusts the key for this connection only and `Strict` refuses it.
pub fn verify_host_key(
    host: &str,
    port: u16,
    key: &PublicKey,
    policy: HostKeyPolicy,
    known_hosts_path: Option<&Path>,
) -> Result<HostKeyDecision, SshError> {
    let fp = fingerprint(key);

    let Some(path) = known_hosts_path else {
        return match policy {
            HostKeyPolicy::AutoAdd => {
                security_log::log_host_key_learned(host, port, &fp, false);
                Ok(HostKeyDecision::Learned { persisted: false })
            }
            HostKeyPolicy::Strict => {
                let reason = "strict host key checking without a known_hosts file";
                security_log::log_host_key_rejected(host, port, &fp, reason);
                Err(SshError::HostKeyVerification(reason.to_string()))
            }
        };
    };

    if policy == HostKeyPolicy::AutoAdd {
        ensure_known_hosts_file(path).map_err(|e| {
            SshError::HostKeyVerification(format!(
                "Failed to create known_hosts {}: {}",
                path.display(),
                e
            ))
        })?;
    }

    let known = if path.exists() {
        known_host_keys_path(host, port, path).map_err(|e| {
            SshError::HostKeyVerification(format!(
                "Failed to read known_hosts {}: {}",
                path.display(),
                e
            ))
        })?
    } else {
        Vec::new()
    };

    if known.iter().any(|(_, existing)| existing == key) {
        tracing::debug!("Host key verified for {}:{}", host, port);
        return Ok(HostKeyDecision::Matched);
    }

    if let Some((line, _)) = known.first() {
        let reason = format!(
            "host key for {}:{} does not match {} line {}",
            host,
            port,
            path.display(),
            line
        );
        security_log::log_host_key_rejected(host, port, &fp, &reason);
        return Err(SshError::HostKeyVerification(reason));
    }

    match policy {
        HostKeyPolicy::AutoAdd => {
            learn_known_hosts_path(host, port, key, path).map_err(|e| {
                SshError::HostKeyVerification(format!(
                    "Failed to write known_hosts {}: {}",
                    path.display(),
                    e
                ))
            })?;
            security_log::log_host_key_learned(host, port, &fp, true);
            Ok(HostKeyDecision::Learned { persisted: true })
        }
        HostKeyPolicy::Strict => {
            let reason = format!("{}:{} is not in {}", host, port, path.display());
            security_log::log_host_key_rejected(host, port, &fp, &reason);
            Err(SshError::HostKeyVerification(reason))
        }
    }
}

fn ensure_known_hosts_file(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if path.exists() {
        return Ok(());
    }

    let mut options = std::fs::OpenOptions::new();
    options.create_new(true).write(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    match options.open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}
