use crate::clean::{CleanStats, RemoteCleaner};
use crate::client::ftp::FtpClient;
use crate::client::FtpSession;
use crate::config::{Config, FtpConfig};
use crate::connection::{ConnectionManager, SharedSession};
use crate::error::{DeployError, DeployResult};
use crate::upload::{RemoteUploader, UploadStats};
use crate::utils::{join_remote, IgnoreSet};
use chrono::{DateTime, Local};
use futures::FutureExt;
use indicatif::ProgressBar;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Remote directory receiving the site, relative to the configured folder.
pub const REMOTE_ROOT: &str = ".";

/// Access-control file sent on its own, since dotfiles are never mirrored.
pub const HTACCESS_FILE: &str = ".htaccess";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtaccessOutcome {
    Deployed,
    /// Upload attempted and failed, usually because the site has no such file.
    Ignored,
    Disabled,
}

impl fmt::Display for HtaccessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deployed => write!(f, "deployed"),
            Self::Ignored => write!(f, "ignored"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeploymentReport {
    pub address: String,
    pub folder: Option<String>,
    /// `None` when existing files were kept
    pub cleaned: Option<CleanStats>,
    pub uploaded: UploadStats,
    pub htaccess: HtaccessOutcome,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl DeploymentReport {
    /// `host:port`, followed by the remote folder when there is one.
    pub fn server_info(&self) -> String {
        match &self.folder {
            Some(folder) => format!("{}/{}", self.address, folder.trim_start_matches('/')),
            None => self.address.clone(),
        }
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} files uploaded ({}), {} folders created, {} entries ignored",
            self.uploaded.files_uploaded,
            human_bytes::human_bytes(self.uploaded.bytes_sent as f64),
            self.uploaded.directories_created,
            self.uploaded.ignored,
        );
        if let Some(cleaned) = &self.cleaned {
            summary.push_str(&format!(
                ", {} files and {} folders deleted",
                cleaned.files_deleted, cleaned.directories_removed
            ));
        }
        let elapsed = self.finished_at - self.started_at;
        summary.push_str(&format!(
            ", {} {}, done in {:.1}s",
            HTACCESS_FILE,
            self.htaccess,
            elapsed.num_milliseconds() as f64 / 1000.0
        ));
        summary
    }
}

/// Runs connect, clean, upload and disconnect for one site.
pub struct Deployer {
    site_dir: PathBuf,
    config: Config,
    progress: ProgressBar,
}

impl Deployer {
    pub fn new(site_dir: &Path, config: Config) -> Self {
        Self {
            site_dir: site_dir.to_path_buf(),
            config,
            progress: ProgressBar::hidden(),
        }
    }

    /// Loads `cocoons.json` from the site directory and checks it has an
    /// `ftp` section.
    pub fn load(site_dir: &Path) -> DeployResult<Self> {
        let config = Config::load(site_dir)?;
        config.ftp_section()?;
        Ok(Self::new(site_dir, config))
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn needs_password(&self) -> bool {
        self.config
            .ftp
            .as_ref()
            .is_some_and(|ftp| ftp.password.is_none())
    }

    pub fn set_password(&mut self, password: String) {
        if let Some(ftp) = self.config.ftp.as_mut() {
            ftp.password = Some(password);
        }
    }

    pub async fn deploy(&self) -> DeployResult<DeploymentReport> {
        self.deploy_with(|ftp| Box::new(FtpClient::from_config(ftp)))
            .await
    }

    /// Same as [`Deployer::deploy`] over a session built by `open_session`.
    ///
    /// The session is disconnected on every path once `connect` succeeded.
    pub async fn deploy_with<F>(&self, open_session: F) -> DeployResult<DeploymentReport>
    where
        F: FnOnce(&FtpConfig) -> Box<dyn FtpSession>,
    {
        let ftp = self.config.ftp_section()?;
        let ignore = IgnoreSet::new(&ftp.ignore)?;
        let target = self.config.target_dir(&self.site_dir);
        check_target(&target).await?;
        let started_at = Local::now();

        let mut connection = ConnectionManager::new(ftp.address(), open_session(ftp));
        let client = connection.connect().await?;

        // publish must not short-circuit past the QUIT below, a panic included
        let outcome = AssertUnwindSafe(self.publish(client, ftp, ignore, &target))
            .catch_unwind()
            .await;
        connection.disconnect().await;
        self.progress.finish_and_clear();

        let outcome = outcome.unwrap_or_else(|payload| panic::resume_unwind(payload));
        let (cleaned, uploaded, htaccess) = outcome.map_err(|e| {
            debug!("Deployment on {} failed : {}", ftp.address(), e);
            e
        })?;

        Ok(DeploymentReport {
            address: ftp.address(),
            folder: ftp.folder.clone().filter(|f| !f.is_empty()),
            cleaned,
            uploaded,
            htaccess,
            started_at,
            finished_at: Local::now(),
        })
    }

    async fn publish(
        &self,
        client: SharedSession,
        ftp: &FtpConfig,
        ignore: IgnoreSet,
        target: &Path,
    ) -> DeployResult<(Option<CleanStats>, UploadStats, HtaccessOutcome)> {
        let cleaned = if ftp.delete_existing_files {
            info!("Deleting the existing files on {}", ftp.address());
            let stats = RemoteCleaner::new(client.clone()).clean(REMOTE_ROOT).await?;
            info!(
                "Deleted {} files and {} folders",
                stats.files_deleted, stats.directories_removed
            );
            Some(stats)
        } else {
            None
        };

        info!("Uploading {:?}", target);
        let uploader = RemoteUploader::new(client.clone(), ignore).with_progress(self.progress.clone());
        let uploaded = uploader.upload(target, REMOTE_ROOT).await?;

        let htaccess = if self.config.htaccess.generate {
            deploy_htaccess(&client, target).await
        } else {
            HtaccessOutcome::Disabled
        };

        Ok((cleaned, uploaded, htaccess))
    }
}

/// The remote site is only touched once the local one is known to exist.
async fn check_target(target: &Path) -> DeployResult<()> {
    let read_error = |source: io::Error| DeployError::LocalRead {
        path: target.to_path_buf(),
        source,
    };
    let metadata = tokio::fs::metadata(target).await.map_err(read_error)?;
    if !metadata.is_dir() {
        return Err(read_error(io::Error::new(
            io::ErrorKind::Other,
            "not a directory",
        )));
    }
    Ok(())
}

/// Never fails: a site without an access-control file is deployed anyway.
async fn deploy_htaccess(client: &SharedSession, target: &Path) -> HtaccessOutcome {
    let from = target.join(HTACCESS_FILE);
    let to = join_remote(REMOTE_ROOT, HTACCESS_FILE);

    match client.lock().await.upload_file(&from, &to).await {
        Ok(_) => {
            info!("{} deployed", HTACCESS_FILE);
            HtaccessOutcome::Deployed
        }
        Err(e) => {
            warn!("{} ignored : {}", HTACCESS_FILE, e);
            HtaccessOutcome::Ignored
        }
    }
}

/// Deploys the site found in `site_dir` with the credentials of its
/// `cocoons.json`.
pub async fn deploy_site(site_dir: &Path) -> DeployResult<DeploymentReport> {
    Deployer::load(site_dir)?.deploy().await
}

/// [`deploy_site`] over a session built by `open_session`, which is only
/// called once the configuration is known to be valid.
pub async fn deploy_site_with<F>(site_dir: &Path, open_session: F) -> DeployResult<DeploymentReport>
where
    F: FnOnce(&FtpConfig) -> Box<dyn FtpSession>,
{
    Deployer::load(site_dir)?.deploy_with(open_session).await
}
