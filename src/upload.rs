use crate::connection::SharedSession;
use crate::error::{DeployError, DeployResult};
use crate::utils::{join_remote, IgnoreSet};
use futures::future::{join_all, BoxFuture, FutureExt};
use indicatif::ProgressBar;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    pub files_uploaded: usize,
    pub directories_created: usize,
    pub bytes_sent: u64,
    pub ignored: usize,
}

impl AddAssign for UploadStats {
    fn add_assign(&mut self, other: Self) {
        self.files_uploaded += other.files_uploaded;
        self.directories_created += other.directories_created;
        self.bytes_sent += other.bytes_sent;
        self.ignored += other.ignored;
    }
}

/// Mirrors a local directory onto the server.
///
/// Each remote directory is created before anything is sent into it. Siblings
/// are walked together; the first failure among them is returned once all of
/// them have finished.
pub struct RemoteUploader {
    client: SharedSession,
    ignore: IgnoreSet,
    progress: ProgressBar,
}

impl RemoteUploader {
    pub fn new(client: SharedSession, ignore: IgnoreSet) -> Self {
        Self {
            client,
            ignore,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub async fn upload(&self, local_root: &Path, remote_root: &str) -> DeployResult<UploadStats> {
        self.upload_directory(local_root.to_path_buf(), remote_root.to_string())
            .await
    }

    fn upload_directory(&self, local: PathBuf, remote: String) -> BoxFuture<'_, DeployResult<UploadStats>> {
        async move {
            let names = read_names(&local).await?;

            let results = join_all(
                names
                    .into_iter()
                    .map(|name| self.copy_entry(&local, &remote, name)),
            )
            .await;

            let mut stats = UploadStats::default();
            for result in results {
                stats += result?;
            }
            Ok(stats)
        }
        .boxed()
    }

    async fn copy_entry(&self, local_parent: &Path, remote_parent: &str, name: String) -> DeployResult<UploadStats> {
        if self.ignore.is_ignored(&name) {
            debug!("Ignore : {:?}", local_parent.join(&name));
            return Ok(UploadStats {
                ignored: 1,
                ..UploadStats::default()
            });
        }

        let from = local_parent.join(&name);
        let to = join_remote(remote_parent, &name);
        let metadata = tokio::fs::metadata(&from)
            .await
            .map_err(|source| DeployError::LocalRead {
                path: from.clone(),
                source,
            })?;

        if metadata.is_file() {
            let bytes_sent = self.client.lock().await.upload_file(&from, &to).await?;
            self.progress.inc(1);
            self.progress.set_message(to);
            Ok(UploadStats {
                files_uploaded: 1,
                bytes_sent,
                ..UploadStats::default()
            })
        } else if metadata.is_dir() {
            self.client.lock().await.create_directory(&to).await?;
            let mut stats = self.upload_directory(from, to).await?;
            stats.directories_created += 1;
            Ok(stats)
        } else {
            debug!("Ignore {:?}: neither a file nor a directory", from);
            Ok(UploadStats {
                ignored: 1,
                ..UploadStats::default()
            })
        }
    }
}

/// Entry names of a local directory, sorted for a stable upload order.
async fn read_names(dir: &Path) -> DeployResult<Vec<String>> {
    let read_error = |source: std::io::Error| DeployError::LocalRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_error)?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let name = entry
            .file_name()
            .into_string()
            .map_err(|_| DeployError::InvalidFileName(entry.path()))?;
        names.push(name);
    }
    names.sort();
    Ok(names)
}
