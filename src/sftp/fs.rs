//! Remote file-system capability used by [`super::DirectoryTransfer`]

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SftpError;

/// Default permission bits for new directories (before the server's umask)
pub const DEFAULT_DIR_MODE: u32 = 0o777;

/// What a remote path points at, without following symlinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteMetadata {
    pub kind: EntryKind,
    pub size: u64,
    pub permissions: Option<u32>,
    pub modified: Option<DateTime<Utc>>,
}

impl RemoteMetadata {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// One child of a listed remote directory
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    pub metadata: RemoteMetadata,
}

/// Join a remote directory and a child name with `/`, whatever the local OS
pub fn join_remote(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Operations the transfer helpers need from an SFTP session.
///
/// Listings are fetched fresh on every call; nothing is cached.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Children of `path`, excluding `.` and `..`
    async fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, SftpError>;

    /// Attributes of `path` itself (symlinks are not followed)
    async fn stat(&self, path: &str) -> Result<RemoteMetadata, SftpError>;

    /// Attributes of whatever `path` resolves to, following symlinks
    async fn stat_target(&self, path: &str) -> Result<RemoteMetadata, SftpError>;

    async fn create_dir(&self, path: &str, mode: u32) -> Result<(), SftpError>;

    /// Remove an empty directory
    async fn remove_dir(&self, path: &str) -> Result<(), SftpError>;

    async fn remove_file(&self, path: &str) -> Result<(), SftpError>;

    /// Copy a local file to `remote`, replacing it. Returns bytes written.
    async fn put(&self, local: &Path, remote: &str) -> Result<u64, SftpError>;

    /// Copy `remote` to a local file, replacing it. Returns bytes read.
    async fn get(&self, remote: &str, local: &Path) -> Result<u64, SftpError>;
}
