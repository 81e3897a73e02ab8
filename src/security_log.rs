//! Security event logging for audit trails.
//!
//! Structured events for authentication attempts, SFTP connection
//! establishment and host key decisions. All events use
//! `target: "security"` so they can be filtered on their own:
//!
//! ```bash
//! RUST_LOG=security=info
//! ```

use tracing::{info, warn};

/// Log an SSH authentication attempt.
pub fn log_auth_attempt(host: &str, port: u16, username: &str, method: &str) {
    info!(
        target: "security",
        event = "auth_attempt",
        host = %host,
        port = port,
        username = %username,
        method = %method,
        "SSH authentication attempt"
    );
}

/// Log a successful SSH authentication.
pub fn log_auth_success(host: &str, port: u16, username: &str, method: &str) {
    info!(
        target: "security",
        event = "auth_success",
        host = %host,
        port = port,
        username = %username,
        method = %method,
        "SSH authentication succeeded"
    );
}

/// Log a failed SSH authentication attempt.
pub fn log_auth_failure(host: &str, port: u16, username: &str, method: &str, reason: &str) {
    warn!(
        target: "security",
        event = "auth_failure",
        host = %host,
        port = port,
        username = %username,
        method = %method,
        reason = %reason,
        "SSH authentication failed"
    );
}

/// Log an SFTP subsystem being opened on an authenticated connection.
pub fn log_sftp_connect(host: &str, port: u16, username: &str) {
    info!(
        target: "security",
        event = "sftp_connect",
        host = %host,
        port = port,
        username = %username,
        "SFTP connection established"
    );
}

/// Log a host key trusted on first contact.
pub fn log_host_key_learned(host: &str, port: u16, fingerprint: &str, persisted: bool) {
    warn!(
        target: "security",
        event = "host_key_learned",
        host = %host,
        port = port,
        fingerprint = %fingerprint,
        persisted = persisted,
        "Trusting unknown host key"
    );
}

/// Log a host key that was refused.
pub fn log_host_key_rejected(host: &str, port: u16, fingerprint: &str, reason: &str) {
    warn!(
        target: "security",
        event = "host_key_rejected",
        host = %host,
        port = port,
        fingerprint = %fingerprint,
        reason = %reason,
        "Host key rejected"
    );
}
