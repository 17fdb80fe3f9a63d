//! Configuration types, built from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::mailbox::GraphConfig;
use crate::worker::PollerConfig;

/// Default Microsoft Graph API base.
pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";
/// Default identity platform authority.
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";
/// Default folder scanned for unread mail.
pub const DEFAULT_FOLDER: &str = "inbox";
/// Folder messages are moved to once inspected.
pub const DEFAULT_ARCHIVE_FOLDER: &str = "Processed";
/// Inter-cycle sleep: 5 minutes.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

/// Complete process configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct HarvesterConfig {
    pub graph: GraphConfig,
    pub poller: PollerConfig,
    /// Optional directory for daily-rolling log files.
    pub log_dir: Option<PathBuf>,
}

impl HarvesterConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.into()));

        let tenant_id = require("HARVESTER_TENANT_ID")?;
        let client_id = require("HARVESTER_CLIENT_ID")?;
        let client_secret = SecretString::from(require("HARVESTER_CLIENT_SECRET")?);
        let mailbox = require("HARVESTER_MAILBOX")?;

        let folder = get("HARVESTER_FOLDER").unwrap_or_else(|| DEFAULT_FOLDER.to_string());
        let graph_url = get("HARVESTER_GRAPH_URL")
            .unwrap_or_else(|| DEFAULT_GRAPH_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let authority_url = get("HARVESTER_AUTHORITY_URL")
            .unwrap_or_else(|| DEFAULT_AUTHORITY_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let scratch_dir = get("HARVESTER_SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        let download_dir = get("HARVESTER_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./downloads"));

        let keywords = get("HARVESTER_KEYWORDS")
            .map(|raw| parse_list(&raw))
            .unwrap_or_default();

        let archive_folder =
            get("HARVESTER_ARCHIVE_FOLDER").unwrap_or_else(|| DEFAULT_ARCHIVE_FOLDER.to_string());

        let poll_interval_secs = match get("HARVESTER_POLL_INTERVAL_SECS") {
            Some(raw) => parse_interval("HARVESTER_POLL_INTERVAL_SECS", &raw)?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };

        Ok(Self {
            graph: GraphConfig {
                tenant_id,
                client_id,
                client_secret,
                mailbox,
                folder,
                graph_url,
                authority_url,
                scratch_dir,
            },
            poller: PollerConfig {
                download_dir,
                keywords,
                archive_folder,
                poll_interval: Duration::from_secs(poll_interval_secs),
            },
            log_dir: get("HARVESTER_LOG_DIR").map(PathBuf::from),
        })
    }
}

/// Split a comma-separated list, trimming entries and dropping blanks.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_interval(key: &str, raw: &str) -> Result<u64, ConfigError> {
    let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: key.into(),
        message: format!("{raw:?} is not a whole number of seconds: {e}"),
    })?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.into(),
            message: "must be greater than zero".into(),
        });
    }
    Ok(secs)
}
