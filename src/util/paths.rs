use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

pub const DEFAULT_STORAGE_DIR: &str = ".duplicacy-util";

pub fn is_safe_name(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    !name.contains(['/', '\\', '\0'])
}

/// Base directory holding configuration files: `-sd` when given, else
/// `$HOME/.duplicacy-util`. Either way it has to exist.
pub fn resolve_storage_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    let dir = match explicit {
        Some(dir) => dir.to_path_buf(),
        None => default_storage_dir(env::var_os("HOME"))?,
    };
    if !dir.is_dir() {
        return Err(ConfigError::Global(format!(
            "storage directory {} does not exist",
            dir.display()
        ))
        .into());
    }
    Ok(dir)
}

fn default_storage_dir(home: Option<OsString>) -> Result<PathBuf> {
    let home = home.filter(|h| !h.is_empty()).ok_or_else(|| {
        ConfigError::MissingParameter("-sd <dir> (HOME is not set)".to_string())
    })?;
    Ok(PathBuf::from(home).join(DEFAULT_STORAGE_DIR))
}

/// Finds the storage configuration for `-f <name>`: the name itself if it
/// is a file, else `<base>/<name>.yaml`, else `<base>/<name>.yml`.
pub fn resolve_config_file(base_dir: &Path, name: &str) -> Result<PathBuf> {
    let direct = PathBuf::from(name);
    if direct.is_file() {
        return Ok(direct);
    }
    for ext in ["yaml", "yml"] {
        let candidate = base_dir.join(format!("{}.{}", name, ext));
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(ConfigError::Invalid(format!(
        "configuration {} not found in {}",
        name,
        base_dir.display()
    ))
    .into())
}

/// Name used for lock and log files and in notifications.
pub fn config_name(config_file: &Path) -> Result<String> {
    let name = config_file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    if !is_safe_name(&name) {
        return Err(ConfigError::Invalid(format!(
            "configuration name {:?} cannot be used as a file name",
            name
        ))
        .into());
    }
    Ok(name)
}

pub fn lock_path(lock_dir: &Path, name: &str) -> PathBuf {
    lock_dir.join(format!("{}.lock", name))
}

pub fn log_path(log_dir: &Path, name: &str) -> PathBuf {
    log_dir.join(format!("{}.log", name))
}
