pub mod ftp;

use crate::error::DeployResult;
use async_trait::async_trait;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Anything else the server reports (symlinks, devices...), keyed by its
    /// type character in the listing.
    Other(char),
}

/// One row of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }
}

/// A single authenticated FTP connection.
///
/// `connect` must succeed before any other operation. Paths are relative to
/// the working folder selected while connecting.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FtpSession: Send + Sync {
    async fn connect(&mut self) -> DeployResult<()>;
    async fn list(&mut self, path: &str) -> DeployResult<Vec<RemoteEntry>>;
    async fn delete_file(&mut self, path: &str) -> DeployResult<()>;
    /// Fails when the directory still has children.
    async fn remove_directory(&mut self, path: &str) -> DeployResult<()>;
    async fn create_directory(&mut self, path: &str) -> DeployResult<()>;
    /// Returns the number of bytes sent.
    async fn upload_file(&mut self, local_path: &Path, remote_path: &str) -> DeployResult<u64>;
    async fn disconnect(&mut self) -> DeployResult<()>;
}
