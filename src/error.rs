use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a deployment.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("cannot read the configuration file {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed configuration file {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("there is no ftp config into the {0} file")]
    MissingFtpSection(String),

    #[error("invalid ignore pattern {pattern:?}: {source}")]
    InvalidIgnorePattern {
        pattern: String,
        source: regex::Error,
    },

    /// TCP or authentication failure
    #[error("error during FTP authentication on {address}: {reason}")]
    Connection { address: String, reason: String },

    #[error("cannot change the remote directory to {folder}: {reason}")]
    ChangeFolder { folder: String, reason: String },

    #[error("cannot list the remote directory {path}: {reason}")]
    List { path: String, reason: String },

    #[error("impossible to delete the file {path}: {reason}")]
    Delete { path: String, reason: String },

    #[error("impossible to delete the folder {path}: {reason}")]
    RemoveDirectory { path: String, reason: String },

    #[error("impossible to create the remote directory {path}: {reason}")]
    CreateDirectory { path: String, reason: String },

    #[error("impossible to send the file {from:?} to {to}: {reason}")]
    Upload {
        from: PathBuf,
        to: String,
        reason: String,
    },

    #[error("unsupported remote entry type '{kind}' for {path}")]
    UnsupportedEntry { path: String, kind: char },

    #[error("cannot read the local entry {path:?}: {source}")]
    LocalRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("local file name is not valid UTF-8: {0:?}")]
    InvalidFileName(PathBuf),

    #[error("the FTP session is not connected")]
    NotConnected,

    /// The blocking FTP worker died before answering
    #[error("FTP command interrupted: {0}")]
    Interrupted(String),

    #[error("FTP logout error: {0}")]
    Disconnect(String),
}

pub type DeployResult<T> = Result<T, DeployError>;
