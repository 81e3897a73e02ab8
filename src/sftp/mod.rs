//! SFTP file-system access and recursive transfers

pub mod fs;
#[cfg(test)]
pub(crate) mod memory;
pub mod session;
pub mod transfer;

pub use fs::{DEFAULT_DIR_MODE, EntryKind, RemoteEntry, RemoteFs, RemoteMetadata, join_remote};
pub use session::SftpSession;
pub use transfer::{DirectoryTransfer, make_local_directory};
