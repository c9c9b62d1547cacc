use std::path::PathBuf;

use clap::Parser;

use crate::types::{Operations, Verbosity};

#[derive(Parser, Debug, Default)]
#[command(name = "dupctl", disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Storage configuration name or path.
    #[arg(short = 'f', long = "config")]
    pub config: Option<String>,
    #[arg(short = 'g', long = "global-config")]
    pub global_config: Option<PathBuf>,
    #[arg(long = "storage-dir")]
    pub storage_dir: Option<PathBuf>,

    #[arg(short = 'a', long = "all")]
    pub all: bool,
    #[arg(short = 'b', long = "backup")]
    pub backup: bool,
    #[arg(short = 'p', long = "prune")]
    pub prune: bool,
    #[arg(short = 'c', long = "check")]
    pub check: bool,

    #[arg(long = "test-notifications")]
    pub test_notifications: bool,

    #[arg(short = 'd', long)]
    pub debug: bool,
    #[arg(short = 'v', long)]
    pub verbose: bool,
    #[arg(short = 'q', long)]
    pub quiet: bool,

    #[arg(long, short = 'h')]
    pub help: bool,
    #[arg(long)]
    pub version: bool,
}

impl Cli {
    /// `-b` covers backup and copy; `-a` covers everything.
    pub fn operations(&self) -> Operations {
        if self.all {
            return Operations::all();
        }
        Operations {
            backup: self.backup,
            copy: self.backup,
            prune: self.prune,
            check: self.check,
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        Verbosity {
            debug: self.debug,
            verbose: self.verbose || self.debug,
            quiet: self.quiet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_flag_includes_copy() {
        let cli = Cli {
            backup: true,
            ..Cli::default()
        };
        let ops = cli.operations();
        assert!(ops.backup && ops.copy);
        assert!(!ops.prune && !ops.check);
    }

    #[test]
    fn all_flag_selects_everything() {
        let cli = Cli {
            all: true,
            ..Cli::default()
        };
        assert_eq!(cli.operations(), Operations::all());
        assert!(Cli::default().operations().is_empty());
    }

    #[test]
    fn debug_implies_verbose() {
        let cli = Cli {
            debug: true,
            ..Cli::default()
        };
        assert!(cli.verbosity().verbose);
    }
}
