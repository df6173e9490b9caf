use crate::error::{DeployError, DeployResult};
use crate::utils::DEFAULT_IGNORE_PATTERN;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "cocoons.json";

/// Site configuration, read from `cocoons.json` at the root of the site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub ftp: Option<FtpConfig>,
    /// Local subdirectory holding the generated site
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default)]
    pub htaccess: HtaccessConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Remote working directory, entered right after login
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub delete_existing_files: bool,
    /// Regular expressions matched against local entry names
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HtaccessConfig {
    #[serde(default)]
    pub generate: bool,
}

fn default_target() -> String {
    "target".to_string()
}

fn default_port() -> u16 {
    21
}

fn default_ignore() -> Vec<String> {
    vec![DEFAULT_IGNORE_PATTERN.to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ftp: None,
            target: default_target(),
            htaccess: HtaccessConfig::default(),
        }
    }
}

impl FtpConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    /// Reads `cocoons.json` from the site directory.
    pub fn load(site_dir: &Path) -> DeployResult<Self> {
        let path = Self::config_path(site_dir);
        let content = fs::read_to_string(&path).map_err(|source| DeployError::ConfigRead {
            path: path.clone(),
            source,
        })?;
        Self::parse(&content).map_err(|source| DeployError::ConfigParse { path, source })
    }

    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn config_path(site_dir: &Path) -> PathBuf {
        site_dir.join(CONFIG_FILE)
    }

    pub fn ftp_section(&self) -> DeployResult<&FtpConfig> {
        self.ftp
            .as_ref()
            .ok_or_else(|| DeployError::MissingFtpSection(CONFIG_FILE.to_string()))
    }

    pub fn target_dir(&self, site_dir: &Path) -> PathBuf {
        site_dir.join(&self.target)
    }
}
