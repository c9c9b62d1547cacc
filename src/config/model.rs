use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// Storage configuration entries as written in the file. Every field is
// optional here so the loader can name the exact key that is missing.

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct StorageEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub threads: Option<u32>,
    #[serde(default)]
    pub vss: Option<bool>,
    #[serde(default)]
    pub vss_timeout: Option<u32>,
    #[serde(default)]
    pub quote: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CopyEntry {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub threads: Option<u32>,
    #[serde(default)]
    pub quote: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PruneEntry {
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub keep: Option<String>,
    #[serde(default)]
    pub threads: Option<u32>,
    #[serde(default)]
    pub all: Option<bool>,
    #[serde(default)]
    pub quote: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CheckEntry {
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub all: Option<bool>,
    #[serde(default)]
    pub quote: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTarget {
    pub name: String,
    pub threads: Option<u32>,
    pub vss: bool,
    pub vss_timeout: Option<u32>,
    pub extra_flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTarget {
    pub from: String,
    pub to: String,
    pub threads: Option<u32>,
    pub extra_flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneTarget {
    pub storage: String,
    pub keep: Vec<String>,
    pub threads: Option<u32>,
    pub all: bool,
    pub extra_flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTarget {
    pub storage: String,
    pub all: bool,
    pub extra_flags: Vec<String>,
}

/// Validated storage configuration for one named configuration file.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub repository: PathBuf,
    pub storage: Vec<StorageTarget>,
    pub copy: Vec<CopyTarget>,
    pub prune: Vec<PruneTarget>,
    pub check: Vec<CheckTarget>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct GlobalConfigFile {
    #[serde(default, rename = "duplicacyPath", alias = "duplicacypath")]
    pub duplicacy_path: Option<String>,
    #[serde(default, rename = "lockDirectory", alias = "lockdirectory")]
    pub lock_directory: Option<PathBuf>,
    #[serde(default, rename = "logDirectory", alias = "logdirectory")]
    pub log_directory: Option<PathBuf>,
    #[serde(default, rename = "logFileCount", alias = "logfilecount")]
    pub log_file_count: Option<usize>,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub email: Option<EmailConfig>,
    #[serde(default)]
    pub http: Option<HttpConfig>,
}

/// Channel names ("email", "http") subscribed to each lifecycle event.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct NotificationsConfig {
    #[serde(default, rename = "onStart")]
    pub on_start: Vec<String>,
    #[serde(default, rename = "onSkip", alias = "onSkipped")]
    pub on_skip: Vec<String>,
    #[serde(default, rename = "onSuccess")]
    pub on_success: Vec<String>,
    #[serde(default, rename = "onFailure")]
    pub on_failure: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfig {
    #[serde(default)]
    pub from_address: String,
    #[serde(default)]
    pub to_address: String,
    #[serde(default)]
    pub server_hostname: String,
    #[serde(default)]
    pub server_port: u16,
    #[serde(default)]
    pub auth_username: String,
    #[serde(default)]
    pub auth_password: String,
    #[serde(default)]
    pub accept_insecure_certs: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    #[serde(default)]
    pub method: String,
    /// Event name (`onStart`, ...) to URL.
    #[serde(default)]
    pub urls: BTreeMap<String, String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub accept_insecure_certs: bool,
}

#[derive(Debug, Clone)]
pub struct GlobalConfig {
    pub duplicacy_path: PathBuf,
    pub lock_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_file_count: usize,
    pub notifications: NotificationsConfig,
    pub email: Option<EmailConfig>,
    pub http: Option<HttpConfig>,
}
