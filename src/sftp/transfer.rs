//! Recursive uploads, downloads and removals on top of a [`RemoteFs`]

use std::io::ErrorKind;
use std::path::Path;

use crate::error::TransferError;

use super::fs::{DEFAULT_DIR_MODE, EntryKind, RemoteFs, join_remote};

/// Tree-walking file transfers over a remote file-system capability.
///
/// Both directions follow the same policy: the target is a directory that
/// is created if missing, a directory source has its contents mirrored
/// into it, and a file source is copied into it under its own name.
pub struct DirectoryTransfer<F> {
    fs: F,
}

impl<F: RemoteFs> DirectoryTransfer<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Create a remote directory.
    ///
    /// When creation fails and the path turns out to be an existing
    /// directory, the failure is swallowed if `ignore_existing` is set.
    pub async fn make_directory(
        &self,
        path: &str,
        mode: u32,
        ignore_existing: bool,
    ) -> Result<(), TransferError> {
        let create_err = match self.fs.create_dir(path, mode).await {
            Ok(()) => {
                tracing::debug!("Created remote directory {}", path);
                return Ok(());
            }
            Err(e) => e,
        };

        // SFTP v3 reports "exists" as a generic failure; look before deciding
        match self.fs.stat(path).await {
            Ok(metadata) if !ignore_existing => {
                tracing::debug!("{} already exists ({:?})", path, metadata.kind);
                Err(TransferError::AlreadyExists {
                    path: path.to_string(),
                })
            }
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(TransferError::NotADirectory {
                path: path.to_string(),
            }),
            Err(_) => Err(create_err.into()),
        }
    }

    /// Copy the contents of local `source_dir` into existing remote `target_dir`
    pub async fn upload_tree(
        &self,
        source_dir: &Path,
        target_dir: &str,
    ) -> Result<usize, TransferError> {
        let mut entries = tokio::fs::read_dir(source_dir)
            .await
            .map_err(|e| TransferError::local_io(source_dir, e))?;
        let mut count = 0;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| TransferError::local_io(source_dir, e))?
        {
            let local_path = entry.path();
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!("Skipping {}: name is not UTF-8", local_path.display());
                continue;
            };
            let remote_path = join_remote(target_dir, &name);

            let file_type = entry
                .file_type()
                .await
                .map_err(|e| TransferError::local_io(&local_path, e))?;

            if file_type.is_file() {
                let bytes = self.fs.put(&local_path, &remote_path).await?;
                tracing::debug!("Uploaded {} ({} bytes)", remote_path, bytes);
                count += 1;
            } else if file_type.is_dir() {
                self.make_directory(&remote_path, DEFAULT_DIR_MODE, true)
                    .await?;
                count += Box::pin(self.upload_tree(&local_path, &remote_path)).await?;
            } else {
                tracing::warn!("Skipping {}: not a file or directory", local_path.display());
            }
        }

        Ok(count)
    }

    /// Copy the contents of `remote_dir` into existing local `local_dir`
    pub async fn download_tree(
        &self,
        remote_dir: &str,
        local_dir: &Path,
    ) -> Result<usize, TransferError> {
        let mut count = 0;

        for entry in self.fs.list_dir(remote_dir).await? {
            let local_path = local_dir.join(&entry.name);

            match entry.metadata.kind {
                EntryKind::File => {
                    let bytes = self.fs.get(&entry.path, &local_path).await?;
                    tracing::debug!("Downloaded {} ({} bytes)", entry.path, bytes);
                    count += 1;
                }
                EntryKind::Directory => {
                    make_local_directory(&local_path, true).await?;
                    count += Box::pin(self.download_tree(&entry.path, &local_path)).await?;
                }
                EntryKind::Symlink | EntryKind::Other => {
                    tracing::warn!("Skipping {}: not a file or directory", entry.path);
                }
            }
        }

        Ok(count)
    }

    /// Remove a remote directory and everything under it
    pub async fn remove_tree(&self, path: &str) -> Result<(), TransferError> {
        for entry in self.fs.list_dir(path).await? {
            if entry.metadata.is_dir() {
                Box::pin(self.remove_tree(&entry.path)).await?;
            } else {
                // Symlinks are removed, never followed
                self.fs.remove_file(&entry.path).await?;
            }
        }

        self.fs.remove_dir(path).await?;
        tracing::debug!("Removed remote directory {}", path);
        Ok(())
    }

    /// Upload a local file or directory into remote directory `dst`.
    /// Returns the number of files copied.
    pub async fn upload(&self, src: &Path, dst: &str) -> Result<usize, TransferError> {
        // Follows symlinks, so a linked source is uploaded as its target
        let metadata = match tokio::fs::metadata(src).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TransferError::LocalNotFound(src.to_path_buf()));
            }
            Err(e) => return Err(TransferError::local_io(src, e)),
        };

        if !metadata.is_dir() && !metadata.is_file() {
            return Err(TransferError::Unsupported {
                path: src.display().to_string(),
            });
        }

        self.make_directory(dst, DEFAULT_DIR_MODE, true).await?;

        if metadata.is_dir() {
            return self.upload_tree(src, dst).await;
        }

        let name = src
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TransferError::Unsupported {
                path: src.display().to_string(),
            })?;
        let remote_path = join_remote(dst, name);
        let bytes = self.fs.put(src, &remote_path).await?;
        tracing::debug!("Uploaded {} ({} bytes)", remote_path, bytes);
        Ok(1)
    }

    /// Download a remote file or directory into local directory `dst`.
    /// Returns the number of files copied.
    ///
    /// A symlinked source is resolved first, so a link to a directory is
    /// downloaded as a tree and a dangling link is reported as missing.
    pub async fn download(&self, src: &str, dst: &Path) -> Result<usize, TransferError> {
        let metadata = match self.fs.stat_target(src).await {
            Ok(metadata) => metadata,
            Err(e) if e.is_not_found() => {
                return Err(TransferError::RemoteNotFound(src.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        match metadata.kind {
            EntryKind::Directory => {
                make_local_directory(dst, true).await?;
                self.download_tree(src, dst).await
            }
            EntryKind::File => {
                let name = remote_file_name(src).ok_or_else(|| TransferError::Unsupported {
                    path: src.to_string(),
                })?;
                make_local_directory(dst, true).await?;
                let bytes = self.fs.get(src, &dst.join(name)).await?;
                tracing::debug!("Downloaded {} ({} bytes)", src, bytes);
                Ok(1)
            }
            EntryKind::Symlink | EntryKind::Other => Err(TransferError::Unsupported {
                path: src.to_string(),
            }),
        }
    }

    /// Remove a remote file, symlink or directory tree.
    ///
    /// The entry is stat'ed first so the matching removal is used; a failed
    /// file removal is never retried as a directory removal.
    pub async fn delete(&self, path: &str) -> Result<(), TransferError> {
        let metadata = match self.fs.stat(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.is_not_found() => {
                return Err(TransferError::RemoteNotFound(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            self.remove_tree(path).await
        } else {
            self.fs.remove_file(path).await?;
            tracing::debug!("Removed remote file {}", path);
            Ok(())
        }
    }
}

/// Local counterpart of [`DirectoryTransfer::make_directory`]
pub async fn make_local_directory(path: &Path, ignore_existing: bool) -> Result<(), TransferError> {
    match tokio::fs::create_dir(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let is_dir = tokio::fs::metadata(path)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if !ignore_existing {
                Err(TransferError::AlreadyExists {
                    path: path.display().to_string(),
                })
            } else if is_dir {
                Ok(())
            } else {
                Err(TransferError::NotADirectory {
                    path: path.display().to_string(),
                })
            }
        }
        Err(e) => Err(TransferError::local_io(path, e)),
    }
}

fn remote_file_name(path: &str) -> Option<&str> {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
}
