//! SFTP sub-channel and its [`RemoteFs`] implementation

use std::path::Path;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use russh::client::Handle;
use russh_sftp::client::SftpSession as RusshSftpSession;
use russh_sftp::protocol::{FileAttributes, OpenFlags};
use tokio::io::{self, AsyncWriteExt};

use crate::error::SftpError;
use crate::security_log;
use crate::ssh::handler::ClientHandler;

use super::fs::{DEFAULT_DIR_MODE, EntryKind, RemoteEntry, RemoteFs, RemoteMetadata, join_remote};

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;
const S_IFREG: u32 = 0o100000;
const S_IFLNK: u32 = 0o120000;

/// SFTP session wrapper for file operations
pub struct SftpSession {
    sftp: RusshSftpSession,
}

impl std::fmt::Debug for SftpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpSession").finish_non_exhaustive()
    }
}

impl SftpSession {
    /// Open the SFTP subsystem on a new channel of an authenticated connection
    pub async fn open(
        handle: &Handle<ClientHandler>,
        host: &str,
        port: u16,
        username: &str,
    ) -> Result<Self, SftpError> {
        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| SftpError::ConnectionFailed(format!("Failed to open channel: {}", e)))?;

        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| {
                SftpError::ConnectionFailed(format!("Failed to request SFTP subsystem: {}", e))
            })?;

        let sftp = RusshSftpSession::new(channel.into_stream())
            .await
            .map_err(|e| {
                SftpError::ConnectionFailed(format!("Failed to initialize SFTP session: {}", e))
            })?;

        security_log::log_sftp_connect(host, port, username);

        Ok(Self { sftp })
    }

    /// Close the SFTP sub-channel
    pub async fn close(&self) -> Result<(), SftpError> {
        self.sftp
            .close()
            .await
            .map_err(|e| SftpError::from_sftp("close", "", e))
    }
}

fn kind_of(attrs: &FileAttributes) -> EntryKind {
    match attrs.permissions.map(|mode| mode & S_IFMT) {
        Some(S_IFDIR) => EntryKind::Directory,
        Some(S_IFREG) => EntryKind::File,
        Some(S_IFLNK) => EntryKind::Symlink,
        _ => EntryKind::Other,
    }
}

fn to_metadata(attrs: &FileAttributes) -> RemoteMetadata {
    RemoteMetadata {
        kind: kind_of(attrs),
        size: attrs.size.unwrap_or(0),
        permissions: attrs.permissions,
        modified: attrs
            .mtime
            .and_then(|mtime| Utc.timestamp_opt(mtime as i64, 0).single()),
    }
}

#[async_trait]
impl RemoteFs for SftpSession {
    async fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, SftpError> {
        let read_dir = self
            .sftp
            .read_dir(path)
            .await
            .map_err(|e| SftpError::from_sftp("readdir", path, e))?;

        let entries = read_dir
            .filter_map(|entry| {
                let name = entry.file_name();
                if name == "." || name == ".." {
                    return None;
                }
                let metadata = to_metadata(&entry.metadata());
                Some(RemoteEntry {
                    path: join_remote(path, &name),
                    name,
                    metadata,
                })
            })
            .collect();

        Ok(entries)
    }

    async fn stat(&self, path: &str) -> Result<RemoteMetadata, SftpError> {
        let attrs = self
            .sftp
            .symlink_metadata(path)
            .await
            .map_err(|e| SftpError::from_sftp("lstat", path, e))?;
        Ok(to_metadata(&attrs))
    }

    async fn stat_target(&self, path: &str) -> Result<RemoteMetadata, SftpError> {
        let attrs = self
            .sftp
            .metadata(path)
            .await
            .map_err(|e| SftpError::from_sftp("stat", path, e))?;
        Ok(to_metadata(&attrs))
    }

    async fn create_dir(&self, path: &str, mode: u32) -> Result<(), SftpError> {
        self.sftp
            .create_dir(path)
            .await
            .map_err(|e| SftpError::from_sftp("mkdir", path, e))?;

        // The server applies its own default; only override an explicit mode
        if mode != DEFAULT_DIR_MODE {
            let attrs = FileAttributes {
                permissions: Some(mode),
                ..Default::default()
            };
            self.sftp
                .set_metadata(path, attrs)
                .await
                .map_err(|e| SftpError::from_sftp("chmod", path, e))?;
        }
        Ok(())
    }

    async fn remove_dir(&self, path: &str) -> Result<(), SftpError> {
        self.sftp
            .remove_dir(path)
            .await
            .map_err(|e| SftpError::from_sftp("rmdir", path, e))
    }

    async fn remove_file(&self, path: &str) -> Result<(), SftpError> {
        self.sftp
            .remove_file(path)
            .await
            .map_err(|e| SftpError::from_sftp("remove", path, e))
    }

    async fn put(&self, local: &Path, remote: &str) -> Result<u64, SftpError> {
        let mut local_file = tokio::fs::File::open(local).await.map_err(|e| {
            SftpError::LocalIo(format!(
                "Failed to read local file {}: {}",
                local.display(),
                e
            ))
        })?;

        let mut remote_file = self
            .sftp
            .open_with_flags(
                remote,
                OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
            )
            .await
            .map_err(|e| SftpError::from_sftp("open", remote, e))?;

        let bytes = io::copy(&mut local_file, &mut remote_file)
            .await
            .map_err(|e| {
                SftpError::Transfer(format!(
                    "Failed to upload {} to {}: {}",
                    local.display(),
                    remote,
                    e
                ))
            })?;

        remote_file.shutdown().await.map_err(|e| {
            SftpError::Transfer(format!("Failed to close remote file {}: {}", remote, e))
        })?;

        Ok(bytes)
    }

    async fn get(&self, remote: &str, local: &Path) -> Result<u64, SftpError> {
        let mut remote_file = self
            .sftp
            .open(remote)
            .await
            .map_err(|e| SftpError::from_sftp("open", remote, e))?;

        let mut local_file = tokio::fs::File::create(local).await.map_err(|e| {
            SftpError::LocalIo(format!(
                "Failed to write local file {}: {}",
                local.display(),
                e
            ))
        })?;

        let bytes = io::copy(&mut remote_file, &mut local_file)
            .await
            .map_err(|e| {
                SftpError::Transfer(format!(
                    "Failed to download {} to {}: {}",
                    remote,
                    local.display(),
                    e
                ))
            })?;

        local_file.flush().await.map_err(|e| {
            SftpError::LocalIo(format!(
                "Failed to flush local file {}: {}",
                local.display(),
                e
            ))
        })?;

        Ok(bytes)
    }
}
