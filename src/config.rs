//! Remote sync configuration.
//!
//! Values are resolved in priority order:
//! 1. `--remote-*` CLI flags
//! 2. `CLAB_GITHUB_*` environment variables
//! 3. `GITHUB_TOKEN` for the credential only
//!
//! The credential is never accepted on the command line. Anything missing
//! means "no remote": callers degrade to the local dataset file.
use std::fmt;
use thiserror::Error;

pub const TOKEN_ENV: &str = "CLAB_GITHUB_TOKEN";
pub const FALLBACK_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const REPO_ENV: &str = "CLAB_GITHUB_REPO";
pub const PATH_ENV: &str = "CLAB_GITHUB_PATH";
pub const BRANCH_ENV: &str = "CLAB_GITHUB_BRANCH";
pub const API_ENV: &str = "CLAB_GITHUB_API";

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Remote target is not (fully) configured.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("ConfigMissing: remote sync needs {}", .missing.join(", "))]
pub struct ConfigMissing {
    pub missing: Vec<&'static str>,
    /// At least one remote setting was given, so the user likely meant to sync.
    pub partial: bool,
}

/// Remote settings passed on the command line.
#[derive(Debug, Clone, Default)]
pub struct RemoteOverrides {
    pub repo: Option<String>,
    pub path: Option<String>,
    pub branch: Option<String>,
}

/// Fully resolved remote target.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub token: String,
    /// `owner/name`.
    pub repo: String,
    pub path: String,
    pub branch: Option<String>,
    pub api_base: String,
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("token", &"<redacted>")
            .field("repo", &self.repo)
            .field("path", &self.path)
            .field("branch", &self.branch)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl RemoteConfig {
    /// Resolve from CLI overrides and the process environment.
    pub fn resolve(overrides: &RemoteOverrides) -> Result<Self, ConfigMissing> {
        Self::resolve_with(overrides, |name| std::env::var(name).ok())
    }

    /// Resolve with an injectable environment lookup.
    pub fn resolve_with(
        overrides: &RemoteOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigMissing> {
        let lookup = |value: Option<&String>, name: &str| {
            value
                .cloned()
                .or_else(|| env(name))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let token = lookup(None, TOKEN_ENV).or_else(|| lookup(None, FALLBACK_TOKEN_ENV));
        let repo = lookup(overrides.repo.as_ref(), REPO_ENV);
        let path = lookup(overrides.path.as_ref(), PATH_ENV);
        let branch = lookup(overrides.branch.as_ref(), BRANCH_ENV);
        let api_base = lookup(None, API_ENV).unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        match (token, repo, path) {
            (Some(token), Some(repo), Some(path)) => Ok(Self {
                token,
                repo,
                path: path.trim_start_matches('/').to_string(),
                branch,
                api_base: api_base.trim_end_matches('/').to_string(),
            }),
            (token, repo, path) => {
                let mut missing = Vec::new();
                if token.is_none() {
                    missing.push(TOKEN_ENV);
                }
                if repo.is_none() {
                    missing.push(REPO_ENV);
                }
                if path.is_none() {
                    missing.push(PATH_ENV);
                }
                let partial = token.is_some() || repo.is_some() || path.is_some();
                Err(ConfigMissing { missing, partial })
            }
        }
    }

    /// Human-readable target used in logs and errors.
    pub fn describe(&self) -> String {
        match &self.branch {
            Some(branch) => format!("{}:{}@{}", self.repo, self.path, branch),
            None => format!("{}:{}", self.repo, self.path),
        }
    }
}
