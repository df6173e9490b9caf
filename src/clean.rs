use crate::client::{EntryKind, RemoteEntry};
use crate::connection::SharedSession;
use crate::error::{DeployError, DeployResult};
use crate::utils::join_remote;
use futures::future::{join_all, BoxFuture, FutureExt};
use std::ops::AddAssign;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub files_deleted: usize,
    pub directories_removed: usize,
}

impl AddAssign for CleanStats {
    fn add_assign(&mut self, other: Self) {
        self.files_deleted += other.files_deleted;
        self.directories_removed += other.directories_removed;
    }
}

/// Empties a remote tree, deepest entries first.
///
/// FTP servers refuse to remove a directory that still has children, so a
/// subdirectory is removed only once its own walk has returned. The root given
/// to [`RemoteCleaner::clean`] is emptied but kept.
pub struct RemoteCleaner {
    client: SharedSession,
}

impl RemoteCleaner {
    pub fn new(client: SharedSession) -> Self {
        Self { client }
    }

    pub async fn clean(&self, root: &str) -> DeployResult<CleanStats> {
        self.empty_directory(root.to_string()).await
    }

    fn empty_directory(&self, dir: String) -> BoxFuture<'_, DeployResult<CleanStats>> {
        async move {
            let entries = self.client.lock().await.list(&dir).await?;

            let results = join_all(entries.into_iter().map(|entry| self.remove_entry(&dir, entry))).await;

            let mut stats = CleanStats::default();
            for result in results {
                stats += result?;
            }
            Ok(stats)
        }
        .boxed()
    }

    async fn remove_entry(&self, parent: &str, entry: RemoteEntry) -> DeployResult<CleanStats> {
        let path = join_remote(parent, &entry.name);

        match entry.kind {
            EntryKind::File => {
                self.client.lock().await.delete_file(&path).await?;
                Ok(CleanStats {
                    files_deleted: 1,
                    directories_removed: 0,
                })
            }
            EntryKind::Directory => {
                let mut stats = self.empty_directory(path.clone()).await?;
                self.client.lock().await.remove_directory(&path).await?;
                debug!("Removed remote folder : {}", path);
                stats.directories_removed += 1;
                Ok(stats)
            }
            EntryKind::Other(kind) => Err(DeployError::UnsupportedEntry { path, kind }),
        }
    }
}
