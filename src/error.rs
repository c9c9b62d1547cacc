use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DupctlError {
    #[error("{0}")]
    Message(String),
    #[error("{0}")]
    Config(ConfigError),
    #[error("{0}")]
    Lock(LockError),
    #[error("{0}")]
    Exec(ExecError),
    #[error("{0}")]
    Notify(NotifyError),
    #[error("{0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parse config {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("{0}")]
    Invalid(String),
    /// A parameter the run cannot do without, such as `-f`.
    #[error("missing mandatory parameter: {0}")]
    MissingParameter(String),
    /// Problems with the global configuration (binary, directories, channels).
    #[error("global config: {0}")]
    Global(String),
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("open lock file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("lock {path}: {errno}")]
    Flock { path: PathBuf, errno: nix::errno::Errno },
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("start {program}: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("read output of {program}: {source}")]
    Read { program: String, source: io::Error },
    #[error("{program} exited with {}", describe_code(.code))]
    Status { program: String, code: Option<i32> },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid notification channel {0:?}")]
    UnknownChannel(String),
    #[error("email: {0}")]
    EmailConfig(String),
    #[error("email delivery: {0}")]
    EmailSend(String),
    #[error("http: {0}")]
    HttpConfig(String),
    #[error("body template: {0}")]
    Template(String),
    #[error("http request to {url}: {reason}")]
    HttpSend { url: String, reason: String },
    #[error("http notification to {url} returned {status}")]
    HttpStatus { url: String, status: u16 },
}

pub type Result<T> = std::result::Result<T, DupctlError>;

impl DupctlError {
    pub fn message(msg: impl Into<String>) -> Self {
        DupctlError::Message(msg.into())
    }
}

impl From<ConfigError> for DupctlError {
    fn from(err: ConfigError) -> Self {
        DupctlError::Config(err)
    }
}

impl From<LockError> for DupctlError {
    fn from(err: LockError) -> Self {
        DupctlError::Lock(err)
    }
}

impl From<ExecError> for DupctlError {
    fn from(err: ExecError) -> Self {
        DupctlError::Exec(err)
    }
}

impl From<NotifyError> for DupctlError {
    fn from(err: NotifyError) -> Self {
        DupctlError::Notify(err)
    }
}
