//! In-memory [`RemoteFs`] used by the transfer tests

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use russh_sftp::protocol::StatusCode;

use crate::error::SftpError;

use super::fs::{EntryKind, RemoteEntry, RemoteFs, RemoteMetadata, join_remote};

#[derive(Debug, Clone)]
enum Node {
    Dir { mode: u32 },
    File(Vec<u8>),
    /// Absolute target, or `None` for a dangling link
    Symlink(Option<String>),
}

/// Hops followed before a path is treated as a link loop
const MAX_LINK_HOPS: usize = 8;

/// Absolute `/`-separated paths mapped to nodes; `/` always exists
#[derive(Debug)]
pub(crate) struct MemoryFs {
    nodes: Mutex<BTreeMap<String, Node>>,
    calls: Mutex<Vec<String>>,
}

fn parent_of(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

fn status(op: &'static str, path: &str, code: StatusCode) -> SftpError {
    SftpError::Status {
        op,
        path: path.to_string(),
        code,
        message: String::new(),
    }
}

fn metadata_of(node: &Node) -> RemoteMetadata {
    let (kind, size, permissions) = match node {
        Node::Dir { mode } => (EntryKind::Directory, 0, 0o040000 | mode),
        Node::File(data) => (EntryKind::File, data.len() as u64, 0o100644),
        Node::Symlink(_) => (EntryKind::Symlink, 0, 0o120777),
    };
    RemoteMetadata {
        kind,
        size,
        permissions: Some(permissions),
        modified: None,
    }
}

impl MemoryFs {
    pub(crate) fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir { mode: 0o755 });
        Self {
            nodes: Mutex::new(nodes),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, op: &str, path: &str) {
        self.calls.lock().unwrap().push(format!("{} {}", op, path));
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn mkdir_all(&self, path: &str) {
        let mut nodes = self.nodes.lock().unwrap();
        let mut current = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            nodes
                .entry(current.clone())
                .or_insert(Node::Dir { mode: 0o755 });
        }
    }

    pub(crate) fn insert_file(&self, path: &str, data: &[u8]) {
        self.mkdir_all(parent_of(path));
        self.nodes
            .lock()
            .unwrap()
            .insert(path.to_string(), Node::File(data.to_vec()));
    }

    /// A link whose target does not exist
    pub(crate) fn insert_symlink(&self, path: &str) {
        self.mkdir_all(parent_of(path));
        self.nodes
            .lock()
            .unwrap()
            .insert(path.to_string(), Node::Symlink(None));
    }

    pub(crate) fn insert_symlink_to(&self, path: &str, target: &str) {
        self.mkdir_all(parent_of(path));
        self.nodes
            .lock()
            .unwrap()
            .insert(path.to_string(), Node::Symlink(Some(target.to_string())));
    }

    pub(crate) fn exists(&self, path: &str) -> bool {
        self.nodes.lock().unwrap().contains_key(path)
    }

    pub(crate) fn is_dir(&self, path: &str) -> bool {
        matches!(self.nodes.lock().unwrap().get(path), Some(Node::Dir { .. }))
    }

    pub(crate) fn file(&self, path: &str) -> Option<Vec<u8>> {
        match self.nodes.lock().unwrap().get(path) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    pub(crate) fn mode_of(&self, path: &str) -> Option<u32> {
        match self.nodes.lock().unwrap().get(path) {
            Some(Node::Dir { mode }) => Some(*mode),
            _ => None,
        }
    }

    /// Every path strictly below `path`, sorted
    pub(crate) fn paths_under(&self, path: &str) -> Vec<String> {
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", path)
        };
        self.nodes
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.as_str() != "/" && k.starts_with(&prefix))
            .cloned()
            .collect()
    }

    /// Canonical key for `path`, following links in every component
    fn resolve(nodes: &BTreeMap<String, Node>, path: &str) -> Option<String> {
        let mut current = "/".to_string();
        let mut hops = 0;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current = if current == "/" {
                format!("/{}", part)
            } else {
                format!("{}/{}", current, part)
            };
            while let Some(Node::Symlink(target)) = nodes.get(&current) {
                hops += 1;
                if hops > MAX_LINK_HOPS {
                    return None;
                }
                current = target.clone()?;
            }
            if !nodes.contains_key(&current) {
                return None;
            }
        }
        Some(current)
    }

    fn children(nodes: &BTreeMap<String, Node>, path: &str) -> Vec<String> {
        nodes
            .keys()
            .filter(|k| k.as_str() != "/" && parent_of(k) == path)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RemoteFs for MemoryFs {
    async fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, SftpError> {
        self.record("list_dir", path);
        let nodes = self.nodes.lock().unwrap();
        let Some(dir) = Self::resolve(&nodes, path) else {
            return Err(status("readdir", path, StatusCode::NoSuchFile));
        };
        if !matches!(nodes.get(&dir), Some(Node::Dir { .. })) {
            return Err(status("readdir", path, StatusCode::Failure));
        }

        Ok(Self::children(&nodes, &dir)
            .into_iter()
            .map(|child| {
                let metadata = metadata_of(&nodes[&child]);
                let name = child.rsplit('/').next().unwrap_or_default().to_string();
                RemoteEntry {
                    path: join_remote(path, &name),
                    name,
                    metadata,
                }
            })
            .collect())
    }

    async fn stat(&self, path: &str) -> Result<RemoteMetadata, SftpError> {
        self.record("stat", path);
        self.nodes
            .lock()
            .unwrap()
            .get(path)
            .map(metadata_of)
            .ok_or_else(|| status("lstat", path, StatusCode::NoSuchFile))
    }

    async fn stat_target(&self, path: &str) -> Result<RemoteMetadata, SftpError> {
        self.record("stat_target", path);
        let nodes = self.nodes.lock().unwrap();
        Self::resolve(&nodes, path)
            .and_then(|target| nodes.get(&target).map(metadata_of))
            .ok_or_else(|| status("stat", path, StatusCode::NoSuchFile))
    }

    async fn create_dir(&self, path: &str, mode: u32) -> Result<(), SftpError> {
        self.record("create_dir", path);
        let mut nodes = self.nodes.lock().unwrap();
        if nodes.contains_key(path) {
            return Err(status("mkdir", path, StatusCode::Failure));
        }
        if !matches!(nodes.get(parent_of(path)), Some(Node::Dir { .. })) {
            return Err(status("mkdir", path, StatusCode::NoSuchFile));
        }
        nodes.insert(path.to_string(), Node::Dir { mode });
        Ok(())
    }

    async fn remove_dir(&self, path: &str) -> Result<(), SftpError> {
        self.record("remove_dir", path);
        let mut nodes = self.nodes.lock().unwrap();
        match nodes.get(path) {
            Some(Node::Dir { .. }) => {}
            Some(_) => return Err(status("rmdir", path, StatusCode::Failure)),
            None => return Err(status("rmdir", path, StatusCode::NoSuchFile)),
        }
        if !Self::children(&nodes, path).is_empty() {
            return Err(status("rmdir", path, StatusCode::Failure));
        }
        nodes.remove(path);
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<(), SftpError> {
        self.record("remove_file", path);
        let mut nodes = self.nodes.lock().unwrap();
        match nodes.get(path) {
            Some(Node::Dir { .. }) => Err(status("remove", path, StatusCode::Failure)),
            Some(_) => {
                nodes.remove(path);
                Ok(())
            }
            None => Err(status("remove", path, StatusCode::NoSuchFile)),
        }
    }

    async fn put(&self, local: &Path, remote: &str) -> Result<u64, SftpError> {
        self.record("put", remote);
        let data = std::fs::read(local).map_err(|e| SftpError::LocalIo(e.to_string()))?;
        let mut nodes = self.nodes.lock().unwrap();
        if !matches!(nodes.get(parent_of(remote)), Some(Node::Dir { .. })) {
            return Err(status("open", remote, StatusCode::NoSuchFile));
        }
        if matches!(nodes.get(remote), Some(Node::Dir { .. })) {
            return Err(status("open", remote, StatusCode::Failure));
        }
        let len = data.len() as u64;
        nodes.insert(remote.to_string(), Node::File(data));
        Ok(len)
    }

    async fn get(&self, remote: &str, local: &Path) -> Result<u64, SftpError> {
        self.record("get", remote);
        let data = {
            let nodes = self.nodes.lock().unwrap();
            match Self::resolve(&nodes, remote).and_then(|key| nodes.get(&key)) {
                Some(Node::File(data)) => data.clone(),
                Some(_) => return Err(status("open", remote, StatusCode::Failure)),
                None => return Err(status("open", remote, StatusCode::NoSuchFile)),
            }
        };
        std::fs::write(local, &data).map_err(|e| SftpError::LocalIo(e.to_string()))?;
        Ok(data.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_of_handles_root_children() {
        assert_eq!(parent_of("/a"), "/");
        assert_eq!(parent_of("/a/b"), "/a");
    }

    #[tokio::test]
    async fn remove_dir_refuses_non_empty() {
        let fs = MemoryFs::new();
        fs.insert_file("/d/f", b"");
        let err = fs.remove_dir("/d").await.unwrap_err();
        assert!(matches!(
            err,
            SftpError::Status {
                code: StatusCode::Failure,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn links_are_followed_by_list_and_get() {
        let fs = MemoryFs::new();
        fs.insert_file("/real/sub/f", b"data");
        fs.insert_symlink_to("/link", "/real");

        let entries = fs.list_dir("/link").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "/link/sub");

        let local = tempfile::tempdir().unwrap();
        let out = local.path().join("f");
        assert_eq!(fs.get("/link/sub/f", &out).await.unwrap(), 4);

        assert_eq!(fs.stat("/link").await.unwrap().kind, EntryKind::Symlink);
        assert!(fs.stat_target("/link").await.unwrap().is_dir());
    }

    #[tokio::test]
    async fn dangling_and_looping_links_do_not_resolve() {
        let fs = MemoryFs::new();
        fs.insert_symlink("/dangling");
        fs.insert_symlink_to("/a", "/b");
        fs.insert_symlink_to("/b", "/a");

        for path in ["/dangling", "/a"] {
            let err = fs.stat_target(path).await.unwrap_err();
            assert!(err.is_not_found(), "{} should not resolve", path);
        }
    }
}
