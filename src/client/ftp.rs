use super::{EntryKind, FtpSession, RemoteEntry};
use crate::config::FtpConfig;
use crate::error::{DeployError, DeployResult};
use async_trait::async_trait;
use std::fs::File;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::str::FromStr;
use suppaftp::list::{File as ListedFile, ParseError};
use suppaftp::types::FileType;
use suppaftp::FtpStream;
use tracing::{debug, info};

/// `FtpSession` backed by a blocking suppaftp stream.
///
/// The stream is moved into a blocking task for every command and handed back
/// once the server answered, so at most one command is in flight.
pub struct FtpClient {
    host: String,
    port: u16,
    username: String,
    password: String,
    folder: Option<String>,
    stream: Option<FtpStream>,
}

impl FtpClient {
    pub fn new(host: String, port: u16, username: String, password: String) -> Self {
        Self {
            host,
            port,
            username,
            password,
            folder: None,
            stream: None,
        }
    }

    pub fn with_folder(mut self, folder: Option<String>) -> Self {
        self.folder = folder.filter(|f| !f.is_empty());
        self
    }

    pub fn from_config(config: &FtpConfig) -> Self {
        Self::new(
            config.host.clone(),
            config.port,
            config.user.clone(),
            config.password.clone().unwrap_or_default(),
        )
        .with_folder(config.folder.clone())
    }

    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn connect_ftp(
        address: &str,
        username: &str,
        password: &str,
        folder: Option<&str>,
    ) -> DeployResult<FtpStream> {
        let connection_error = |e: suppaftp::FtpError| DeployError::Connection {
            address: address.to_string(),
            reason: e.to_string(),
        };

        let mut ftp = FtpStream::connect(address).map_err(connection_error)?;
        if let Some(welcome) = ftp.get_welcome_msg() {
            info!("Connected to the FTP server : {}", welcome.trim());
        }
        if let Err(e) = ftp.login(username, password) {
            let _ = ftp.quit();
            return Err(connection_error(e));
        }
        if let Err(e) = ftp.transfer_type(FileType::Binary) {
            let _ = ftp.quit();
            return Err(connection_error(e));
        }
        if let Some(folder) = folder {
            info!("Change current directory : {}", folder);
            if let Err(e) = ftp.cwd(folder) {
                let _ = ftp.quit();
                return Err(DeployError::ChangeFolder {
                    folder: folder.to_string(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(ftp)
    }

    /// Runs one command on the blocking pool and puts the stream back, even
    /// when the command panics.
    async fn with_stream<T, F>(&mut self, op: F) -> DeployResult<T>
    where
        F: FnOnce(&mut FtpStream) -> DeployResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut ftp = self.stream.take().ok_or(DeployError::NotConnected)?;
        let (ftp, result) = tokio::task::spawn_blocking(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| op(&mut ftp)));
            (ftp, result)
        })
        .await
        .map_err(|e| DeployError::Interrupted(e.to_string()))?;
        self.stream = Some(ftp);

        result.unwrap_or_else(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "FTP worker panicked".to_string());
            Err(DeployError::Interrupted(reason))
        })
    }

    /// Parses one line of a `LIST` answer, POSIX or DOS style.
    ///
    /// `Ok(None)` for the `total N` header and the `.`/`..` entries.
    fn parse_list_line(line: &str) -> Result<Option<RemoteEntry>, ParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() || line.starts_with("total ") {
            return Ok(None);
        }

        let listed = ListedFile::from_str(line)?;
        let kind = if listed.is_directory() {
            EntryKind::Directory
        } else if listed.is_symlink() {
            EntryKind::Other('l')
        } else if listed.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other('?')
        };

        let name = listed.name();
        if name == "." || name == ".." {
            return Ok(None);
        }
        Ok(Some(RemoteEntry {
            name: name.to_string(),
            kind,
        }))
    }
}

#[async_trait]
impl FtpSession for FtpClient {
    async fn connect(&mut self) -> DeployResult<()> {
        let address = self.address();
        let username = self.username.clone();
        let password = self.password.clone();
        let folder = self.folder.clone();

        info!("Connecting to the FTP server : {}", address);
        let ftp = tokio::task::spawn_blocking(move || {
            Self::connect_ftp(&address, &username, &password, folder.as_deref())
        })
        .await
        .map_err(|e| DeployError::Interrupted(e.to_string()))??;

        self.stream = Some(ftp);
        info!("Successfully connected to the FTP server");
        Ok(())
    }

    async fn list(&mut self, path: &str) -> DeployResult<Vec<RemoteEntry>> {
        let path = path.to_string();
        debug!("List remote directory : {}", path);

        self.with_stream(move |ftp| {
            let lines = ftp.list(Some(path.as_str())).map_err(|e| DeployError::List {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            lines
                .iter()
                .filter_map(|line| {
                    Self::parse_list_line(line)
                        .map_err(|e| DeployError::List {
                            path: path.clone(),
                            reason: format!("unrecognized listing line {:?}: {}", line, e),
                        })
                        .transpose()
                })
                .collect()
        })
        .await
    }

    async fn delete_file(&mut self, path: &str) -> DeployResult<()> {
        let path = path.to_string();
        debug!("Delete remote file : {}", path);

        self.with_stream(move |ftp| {
            ftp.rm(&path)
                .map_err(|e| DeployError::Delete {
                    path,
                    reason: e.to_string(),
                })
        })
        .await
    }

    async fn remove_directory(&mut self, path: &str) -> DeployResult<()> {
        let path = path.to_string();
        debug!("Delete remote folder : {}", path);

        self.with_stream(move |ftp| {
            ftp.rmdir(&path)
                .map_err(|e| DeployError::RemoveDirectory {
                    path,
                    reason: e.to_string(),
                })
        })
        .await
    }

    async fn create_directory(&mut self, path: &str) -> DeployResult<()> {
        let path = path.to_string();
        debug!("Create remote folder : {}", path);

        self.with_stream(move |ftp| {
            ftp.mkdir(&path)
                .map_err(|e| DeployError::CreateDirectory {
                    path,
                    reason: e.to_string(),
                })
        })
        .await
    }

    async fn upload_file(&mut self, local_path: &Path, remote_path: &str) -> DeployResult<u64> {
        let from = local_path.to_path_buf();
        let to = remote_path.to_string();
        debug!("Send file : {:?} -> {}", from, to);

        self.with_stream(move |ftp| {
            let mut file = File::open(&from).map_err(|e| DeployError::Upload {
                from: from.clone(),
                to: to.clone(),
                reason: e.to_string(),
            })?;
            ftp.put_file(&to, &mut file)
                .map_err(|e| DeployError::Upload {
                    from,
                    to: to.clone(),
                    reason: e.to_string(),
                })
        })
        .await
    }

    async fn disconnect(&mut self) -> DeployResult<()> {
        let result = self
            .with_stream(|ftp| {
                ftp.quit()
                    .map_err(|e| DeployError::Disconnect(e.to_string()))
            })
            .await;
        // the control connection is gone whatever QUIT answered
        self.stream = None;
        result?;
        debug!("FTP server logout");
        Ok(())
    }
}
