//! SSH connection, host key and command execution support

pub mod client;
pub mod exec;
pub mod handler;
pub mod known_hosts;

pub use client::SshClient;
pub use exec::{CommandOutput, ExecOptions};
