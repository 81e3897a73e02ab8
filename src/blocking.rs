//! Blocking wrapper around [`crate::session::RemoteSession`]
//!
//! Each call blocks the current thread until the remote side is done.
//! Must not be used from inside an async runtime.

use std::path::Path;

use tokio::runtime::{Builder, Runtime};

use crate::config::SessionConfig;
use crate::error::Error;
use crate::session::RemoteSession as AsyncRemoteSession;
use crate::ssh::exec::{CommandOutput, ExecOptions};

pub struct RemoteSession {
    inner: AsyncRemoteSession,
    runtime: Runtime,
}

impl std::fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

fn runtime() -> Result<Runtime, Error> {
    // One worker keeps keepalives and window updates flowing between calls
    Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("sshclient-io")
        .enable_all()
        .build()
        .map_err(Error::Runtime)
}

impl RemoteSession {
    pub fn connect(host: &str, port: u16, username: &str, password: &str) -> Result<Self, Error> {
        Self::connect_with(SessionConfig::new(host, port, username, password))
    }

    pub fn connect_with(settings: SessionConfig) -> Result<Self, Error> {
        let runtime = runtime()?;
        let inner = runtime.block_on(AsyncRemoteSession::connect_with(settings))?;
        Ok(Self { inner, runtime })
    }

    pub fn upload(&self, src: impl AsRef<Path>, dst: &str) -> Result<usize, Error> {
        self.runtime.block_on(self.inner.upload(src, dst))
    }

    pub fn download(&self, src: &str, dst: impl AsRef<Path>) -> Result<usize, Error> {
        self.runtime.block_on(self.inner.download(src, dst))
    }

    pub fn delete(&self, path: &str) -> Result<(), Error> {
        self.runtime.block_on(self.inner.delete(path))
    }

    pub fn exec(&mut self, command: &str) -> Result<CommandOutput, Error> {
        self.runtime.block_on(self.inner.exec(command))
    }

    pub fn exec_with(&mut self, command: &str, options: &ExecOptions) -> Result<CommandOutput, Error> {
        self.runtime.block_on(self.inner.exec_with(command, options))
    }

    pub fn output(&self) -> &str {
        self.inner.output()
    }

    pub fn last_output(&self) -> &str {
        self.inner.last_output()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub fn close(&mut self) {
        self.runtime.block_on(self.inner.close());
    }
}

impl Drop for RemoteSession {
    fn drop(&mut self) {
        if !self.inner.is_closed() {
            self.close();
        }
    }
}
