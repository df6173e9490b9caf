use crate::error::{DeployError, DeployResult};
use regex::Regex;

/// Hidden files and folders are never deployed.
pub const DEFAULT_IGNORE_PATTERN: &str = "^[.]";

/// Name based exclusion rules for the local tree.
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    patterns: Vec<Regex>,
}

impl IgnoreSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> DeployResult<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|source| DeployError::InvalidIgnorePattern {
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<DeployResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Matches against the entry name only, never the full path.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(name))
    }
}

pub fn join_remote(parent: &str, name: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), name)
}
