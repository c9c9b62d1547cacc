pub mod notify;
pub mod run;

use crate::error::{ConfigError, DupctlError, LockError};

pub const EXIT_OK: i32 = 0;
pub const EXIT_CONFIG: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_LOCK_OPEN: i32 = 200;
pub const EXIT_LOCK: i32 = 201;
pub const EXIT_RUN_FAILED: i32 = 500;
pub const EXIT_SKIPPED: i32 = 6200;

pub fn exit_code_for(err: &DupctlError) -> i32 {
    match err {
        DupctlError::Config(ConfigError::MissingParameter(_) | ConfigError::Global(_)) => EXIT_USAGE,
        DupctlError::Config(_) | DupctlError::Message(_) => EXIT_CONFIG,
        DupctlError::Notify(_) => EXIT_USAGE,
        DupctlError::Lock(LockError::Open { .. }) => EXIT_LOCK_OPEN,
        DupctlError::Lock(LockError::Flock { .. }) => EXIT_LOCK,
        DupctlError::Exec(_) | DupctlError::Io(_) => EXIT_RUN_FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExecError, NotifyError};
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(
            exit_code_for(&ConfigError::MissingParameter("-f".into()).into()),
            2
        );
        assert_eq!(exit_code_for(&ConfigError::Global("lock dir".into()).into()), 2);
        assert_eq!(exit_code_for(&ConfigError::Invalid("storage".into()).into()), 1);
        assert_eq!(
            exit_code_for(&NotifyError::UnknownChannel("pager".into()).into()),
            2
        );
        assert_eq!(
            exit_code_for(
                &LockError::Open {
                    path: PathBuf::from("/l"),
                    source: io::Error::from(io::ErrorKind::PermissionDenied),
                }
                .into()
            ),
            200
        );
        assert_eq!(
            exit_code_for(
                &LockError::Flock {
                    path: PathBuf::from("/l"),
                    errno: nix::errno::Errno::EBADF,
                }
                .into()
            ),
            201
        );
        assert_eq!(
            exit_code_for(
                &ExecError::Status {
                    program: "duplicacy".into(),
                    code: Some(1),
                }
                .into()
            ),
            500
        );
    }
}
