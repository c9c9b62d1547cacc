use std::io;
use std::path::Path;

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::backup::args::{backup_args, check_args, copy_args, effective_threads, prune_args};
use crate::backup::classify::{
    classify_backup_line, classify_copy_line, BackupStats, CopyStats, LineKind,
};
use crate::config::model::{BackupConfig, CheckTarget, CopyTarget, PruneTarget, StorageTarget};
use crate::error::ExecError;
use crate::logs::{rotate_logs, RunLog};
use crate::report::Report;
use crate::types::Operations;
use crate::util::command::Execute;
use crate::util::elapsed::format_elapsed;

pub mod args;
pub mod classify;

const PASSWORD_WARNING: &str = "  Error: Duplicacy appears to be prompting for a password";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Idle,
    RotatingLogs,
    RunningBackups,
    RunningCopies,
    RunningPrunes,
    RunningChecks,
    Completed,
    Aborted,
}

/// Drives the external tool through backup, copy, prune and check, one
/// target at a time, stopping at the first failure.
pub struct Runner<'a, E> {
    executor: E,
    duplicacy_path: &'a Path,
    config: &'a BackupConfig,
    operations: Operations,
    debug: bool,
    stage: RunStage,
}

impl<'a, E: Execute> Runner<'a, E> {
    pub fn new(
        executor: E,
        duplicacy_path: &'a Path,
        config: &'a BackupConfig,
        operations: Operations,
    ) -> Self {
        Self {
            executor,
            duplicacy_path,
            config,
            operations,
            debug: false,
            stage: RunStage::Idle,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    fn enter(&mut self, stage: RunStage) {
        debug!("run stage {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    /// Rotates the previous run's log out of the way. Has to happen before
    /// the new run log is created.
    pub fn rotate_logs(&mut self, log_path: &Path, keep: usize) -> io::Result<()> {
        self.enter(RunStage::RotatingLogs);
        info!("Rotating log files");
        rotate_logs(log_path, keep)
    }

    pub fn run(&mut self, log: &mut RunLog, report: &mut Report) -> Result<(), ExecError> {
        let started = Local::now();
        if let Err(err) = self.run_stages(log, report) {
            log.error(&format!("Error executing command: {}", err));
            self.enter(RunStage::Aborted);
            return Err(err);
        }
        self.enter(RunStage::Completed);
        log.separator();
        log.message(&format!(
            "Operations completed in {}",
            elapsed_since(started)
        ));
        Ok(())
    }

    fn run_stages(&mut self, log: &mut RunLog, report: &mut Report) -> Result<(), ExecError> {
        let config = self.config;
        if self.operations.backup {
            self.enter(RunStage::RunningBackups);
            for target in &config.storage {
                let row = self.backup(target, log)?;
                report.backup_rows.push(row);
            }
        }
        if self.operations.copy {
            self.enter(RunStage::RunningCopies);
            for target in &config.copy {
                let row = self.copy(target, log)?;
                report.copy_rows.push(row);
            }
        }
        if self.operations.prune {
            self.enter(RunStage::RunningPrunes);
            for target in &config.prune {
                self.prune(target, log)?;
            }
        }
        if self.operations.check {
            self.enter(RunStage::RunningChecks);
            for target in &config.check {
                self.check(target, log)?;
            }
        }
        Ok(())
    }

    fn backup(&mut self, target: &StorageTarget, log: &mut RunLog) -> Result<BackupStats, ExecError> {
        let started = Local::now();
        log.separator();
        let mut vss = String::new();
        if target.vss {
            vss.push_str(" -vss");
            if let Some(timeout) = target.vss_timeout {
                vss.push_str(&format!(" -vss-timeout {}", timeout));
            }
        }
        log.message(&format!(
            "Backing up to storage {}{} with {} threads{}",
            target.name,
            vss,
            effective_threads(target.threads),
            quote_suffix(&target.extra_flags)
        ));

        let mut stats = BackupStats::default();
        self.execute(&backup_args(target), log, &mut |line, log| {
            match classify_backup_line(line, &mut stats) {
                LineKind::Statistics => {
                    log.raw(line);
                    log.message(&format!("  {}", line));
                }
                LineKind::CredentialPrompt => {
                    log.error(PASSWORD_WARNING);
                    log.raw(line);
                    log.message(&format!("  {}", line));
                }
                LineKind::Other => log.raw(line),
            }
        })?;

        stats.storage = target.name.clone();
        stats.duration = elapsed_since(started);
        log.message(&format!("  Duration: {}", stats.duration));
        Ok(stats)
    }

    fn copy(&mut self, target: &CopyTarget, log: &mut RunLog) -> Result<CopyStats, ExecError> {
        let started = Local::now();
        log.separator();
        log.message(&format!(
            "Copying from storage {} to storage {} with {} threads{}",
            target.from,
            target.to,
            effective_threads(target.threads),
            quote_suffix(&target.extra_flags)
        ));

        let mut stats = CopyStats::default();
        self.execute(&copy_args(target), log, &mut |line, log| {
            match classify_copy_line(line, &mut stats) {
                LineKind::Statistics => {
                    log.raw(line);
                    log.message(&format!("  {}", line));
                }
                _ => log.raw(line),
            }
        })?;

        stats.storage_from = target.from.clone();
        stats.storage_to = target.to.clone();
        stats.duration = elapsed_since(started);
        log.message(&format!("  Duration: {}", stats.duration));
        Ok(stats)
    }

    fn prune(&mut self, target: &PruneTarget, log: &mut RunLog) -> Result<(), ExecError> {
        log.separator();
        log.message(&format!(
            "Pruning storage {} using {} thread(s){}{}",
            target.storage,
            effective_threads(target.threads),
            if target.all { " -all" } else { "" },
            quote_suffix(&target.extra_flags)
        ));
        self.execute(&prune_args(target), log, &mut |line, log| log.raw(line))
    }

    fn check(&mut self, target: &CheckTarget, log: &mut RunLog) -> Result<(), ExecError> {
        log.separator();
        log.message(&format!(
            "Checking storage {}{}{}",
            target.storage,
            if target.all { " with -all" } else { "" },
            quote_suffix(&target.extra_flags)
        ));
        self.execute(&check_args(target), log, &mut |line, log| log.raw(line))
    }

    fn execute(
        &mut self,
        args: &[String],
        log: &mut RunLog,
        sink: &mut dyn FnMut(&str, &mut RunLog),
    ) -> Result<(), ExecError> {
        if self.debug {
            log.message(&format!(
                "Executing: {} {}",
                self.duplicacy_path.display(),
                args.join(" ")
            ));
        }
        self.executor.run(
            self.duplicacy_path,
            args,
            &self.config.repository,
            &mut |line| sink(line, &mut *log),
        )
    }
}

fn quote_suffix(flags: &[String]) -> String {
    if flags.is_empty() {
        String::new()
    } else {
        format!(" {}", flags.join(" "))
    }
}

fn elapsed_since(started: DateTime<Local>) -> String {
    format_elapsed(started.naive_local(), Local::now().naive_local())
}

/// Human-readable tables of what a configuration will run, for `-v`.
pub fn config_summary(config: &BackupConfig) -> Vec<String> {
    let mut lines = vec![
        format!("Repository: {}", config.repository.display()),
        String::new(),
        "Backup Information:".to_string(),
        format!("  Num  {:<20}{}", "Storage", "Threads"),
    ];
    for (i, target) in config.storage.iter().enumerate() {
        lines.push(format!(
            "  {:>3}  {:<20}{}",
            i + 1,
            target.name,
            effective_threads(target.threads)
        ));
    }
    if !config.copy.is_empty() {
        lines.push("Copy Information:".to_string());
        lines.push(format!("  Num  {:<20}{:<20}{}", "From", "To", "Threads"));
        for (i, target) in config.copy.iter().enumerate() {
            lines.push(format!(
                "  {:>3}  {:<20}{:<20}{}",
                i + 1,
                target.from,
                target.to,
                effective_threads(target.threads)
            ));
        }
    }
    lines.push(String::new());
    lines.push("Prune Information:".to_string());
    for (i, target) in config.prune.iter().enumerate() {
        lines.push(format!("  {:>3}: Storage {}", i + 1, target.storage));
        lines.push(format!("       Keep: {}", target.keep.join(" ")));
    }
    if !config.check.is_empty() {
        lines.push(String::new());
        lines.push("Check Information:".to_string());
        lines.push(format!("  Num  {:<20}{}", "Storage", "All Snapshots"));
        for (i, target) in config.check.iter().enumerate() {
            lines.push(format!("  {:>3}  {:<20}{}", i + 1, target.storage, target.all));
        }
    }
    lines
}
