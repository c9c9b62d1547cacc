use std::env;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{GlobalConfig, GlobalConfigFile};
use crate::error::{ConfigError, Result};

pub const GLOBAL_CONFIG_FILE: &str = "duplicacy-util.yaml";
pub const EMAIL_PASSWORD_ENV: &str = "DU_EMAIL_AUTH_PASSWORD";

const DEFAULT_DUPLICACY_PATH: &str = "duplicacy";
const DEFAULT_LOG_FILE_COUNT: usize = 5;

/// Reads the global configuration. With no explicit path the file under
/// `base_dir` is optional and defaults apply when it is absent.
pub fn load_global_config(base_dir: &Path, explicit: Option<&Path>) -> Result<GlobalConfig> {
    let file = match explicit {
        Some(path) => read_global_file(path)?,
        None => {
            let default = base_dir.join(GLOBAL_CONFIG_FILE);
            if default.exists() {
                read_global_file(&default)?
            } else {
                GlobalConfigFile::default()
            }
        }
    };
    let mut cfg = resolve_global(file, base_dir);
    apply_password_override(&mut cfg, env::var(EMAIL_PASSWORD_ENV).ok());
    validate_global(&cfg)?;
    Ok(cfg)
}

fn read_global_file(path: &Path) -> Result<GlobalConfigFile> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::Global(format!("read {}: {}", path.display(), e)))?;
    info!("using global config: {}", path.display());
    parse_global_file(&contents, path)
}

pub fn parse_global_file(contents: &str, path: &Path) -> Result<GlobalConfigFile> {
    if contents.trim().is_empty() {
        return Ok(GlobalConfigFile::default());
    }
    serde_yaml::from_str(contents)
        .map_err(|e| ConfigError::Global(format!("parse {}: {}", path.display(), e)).into())
}

pub fn resolve_global(file: GlobalConfigFile, base_dir: &Path) -> GlobalConfig {
    GlobalConfig {
        duplicacy_path: PathBuf::from(
            file.duplicacy_path
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DUPLICACY_PATH.to_string()),
        ),
        lock_dir: file
            .lock_directory
            .unwrap_or_else(|| base_dir.to_path_buf()),
        log_dir: file
            .log_directory
            .unwrap_or_else(|| base_dir.join("log")),
        log_file_count: file
            .log_file_count
            .filter(|c| *c != 0)
            .unwrap_or(DEFAULT_LOG_FILE_COUNT),
        notifications: file.notifications,
        email: file.email,
        http: file.http,
    }
}

pub fn apply_password_override(cfg: &mut GlobalConfig, password: Option<String>) {
    if let (Some(email), Some(password)) = (cfg.email.as_mut(), password) {
        if !password.is_empty() {
            email.auth_password = password;
        }
    }
}

/// Checks the binary, lock and log directories and the log retention.
/// Creates the log directory when it is missing.
pub fn validate_global(cfg: &GlobalConfig) -> Result<()> {
    if find_executable(&cfg.duplicacy_path).is_none() {
        return Err(ConfigError::Global(format!(
            "duplicacy binary {} not found",
            cfg.duplicacy_path.display()
        ))
        .into());
    }
    if !cfg.lock_dir.is_dir() {
        return Err(ConfigError::Global(format!(
            "lock directory {} does not exist",
            cfg.lock_dir.display()
        ))
        .into());
    }
    if !cfg.log_dir.exists() {
        fs::create_dir_all(&cfg.log_dir).map_err(|e| {
            ConfigError::Global(format!("create {}: {}", cfg.log_dir.display(), e))
        })?;
    }
    if !cfg.log_dir.is_dir() {
        return Err(ConfigError::Global(format!(
            "log directory {} is not a directory",
            cfg.log_dir.display()
        ))
        .into());
    }
    if cfg.log_file_count < 2 {
        return Err(ConfigError::Global(
            "logFileCount must keep at least two log files".to_string(),
        )
        .into());
    }
    Ok(())
}

/// Resolves a program the way a shell would: paths with a separator are
/// taken as-is, bare names are searched on `PATH`.
pub fn find_executable(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return is_executable(program).then(|| program.to_path_buf());
    }
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL: &str = r#"
duplicacypath: /bin/sh
lockdirectory: /tmp
logfilecount: 7
notifications:
  onStart: []
  onSkip: ["email"]
  onSuccess: ["email", "http"]
  onFailure: ["email", "http"]
email:
  fromAddress: "backup@example.com"
  toAddress: "admin@example.com"
  serverHostname: "smtp.example.com"
  serverPort: 587
  authUsername: "backup"
  authPassword: "secret"
http:
  method: POST
  urls:
    onSuccess: "http://localhost/some_guid"
    onFailure: "http://localhost/some_guid/fail"
  username: basicusername
  password: basicpassword
  acceptInsecureCerts: true
"#;

    #[test]
    fn full_config_parses() {
        let file = parse_global_file(FULL, Path::new("g.yaml")).expect("parse");
        let cfg = resolve_global(file, Path::new("/base"));
        assert_eq!(cfg.duplicacy_path, PathBuf::from("/bin/sh"));
        assert_eq!(cfg.lock_dir, PathBuf::from("/tmp"));
        assert_eq!(cfg.log_dir, PathBuf::from("/base/log"));
        assert_eq!(cfg.log_file_count, 7);
        assert_eq!(cfg.notifications.on_success, ["email", "http"]);
        let email = cfg.email.expect("email");
        assert_eq!(email.server_port, 587);
        let http = cfg.http.expect("http");
        assert_eq!(http.urls["onFailure"], "http://localhost/some_guid/fail");
        assert!(http.accept_insecure_certs);
    }

    #[test]
    fn defaults_when_absent() {
        let cfg = resolve_global(GlobalConfigFile::default(), Path::new("/base"));
        assert_eq!(cfg.duplicacy_path, PathBuf::from("duplicacy"));
        assert_eq!(cfg.lock_dir, PathBuf::from("/base"));
        assert_eq!(cfg.log_file_count, 5);
        assert!(cfg.email.is_none());
    }

    #[test]
    fn corrupted_config_is_rejected() {
        assert!(parse_global_file("notifications: [: nope", Path::new("g.yaml")).is_err());
    }

    #[test]
    fn password_override_replaces_configured_password() {
        let file = parse_global_file(FULL, Path::new("g.yaml")).expect("parse");
        let mut cfg = resolve_global(file, Path::new("/base"));
        apply_password_override(&mut cfg, Some("from-env".to_string()));
        assert_eq!(cfg.email.expect("email").auth_password, "from-env");
    }

    #[test]
    fn validation_creates_log_dir() {
        let dir = TempDir::new().expect("tempdir");
        let mut cfg = resolve_global(GlobalConfigFile::default(), dir.path());
        cfg.duplicacy_path = PathBuf::from("/bin/sh");
        validate_global(&cfg).expect("valid");
        assert!(dir.path().join("log").is_dir());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let dir = TempDir::new().expect("tempdir");
        let mut cfg = resolve_global(GlobalConfigFile::default(), dir.path());
        cfg.duplicacy_path = PathBuf::from("/no/such/duplicacy");
        assert!(validate_global(&cfg).is_err());

        cfg.duplicacy_path = PathBuf::from("/bin/sh");
        cfg.lock_dir = dir.path().join("missing");
        assert!(validate_global(&cfg).is_err());

        cfg.lock_dir = dir.path().to_path_buf();
        cfg.log_file_count = 1;
        assert!(validate_global(&cfg).is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        assert!(load_global_config(dir.path(), Some(&dir.path().join("nope.yaml"))).is_err());
    }

    #[test]
    fn bare_program_names_search_path() {
        assert!(find_executable(Path::new("sh")).is_some());
        assert!(find_executable(Path::new("definitely-not-a-real-program")).is_none());
    }
}
