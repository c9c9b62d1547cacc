use chrono::Local;
use tracing::{info, warn};

use crate::backup::{config_summary, Runner};
use crate::cli::args::Cli;
use crate::cli::commands::{EXIT_OK, EXIT_RUN_FAILED, EXIT_SKIPPED};
use crate::cli::Console;
use crate::config::global::load_global_config;
use crate::config::load::load_backup_config;
use crate::config::model::{BackupConfig, GlobalConfig};
use crate::error::{ConfigError, DupctlError, Result};
use crate::lock;
use crate::logs::RunLog;
use crate::notify::NotifierSet;
use crate::report::Report;
use crate::types::{Event, Operations, Verbosity};
use crate::util::command::{Execute, ProcessExecutor};
use crate::util::paths::{
    config_name, lock_path, log_path, resolve_config_file, resolve_storage_dir,
};

/// Everything one run needs, loaded up front.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config_name: String,
    pub global: GlobalConfig,
    pub backup: BackupConfig,
    pub operations: Operations,
    pub verbosity: Verbosity,
}

pub fn run_configuration(cli: &Cli, console: &Console) -> Result<i32> {
    let requested = cli
        .config
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingParameter("-f <configuration>".to_string()))?;

    let storage_dir = resolve_storage_dir(cli.storage_dir.as_deref())?;
    let global = load_global_config(&storage_dir, cli.global_config.as_deref())?;
    let notifiers = NotifierSet::build(&global)?;

    let config_file = resolve_config_file(&storage_dir, requested)?;
    info!("using config file: {}", config_file.display());
    let name = config_name(&config_file)?;
    let backup = load_backup_config(&config_file)?;

    let operations = cli.operations();
    if operations.is_empty() {
        return Err(ConfigError::Invalid(
            "no operations to perform (specify -b, -p, -c, or -a)".to_string(),
        )
        .into());
    }

    let mut verbosity = cli.verbosity();
    if verbosity.verbose {
        for line in config_summary(&backup) {
            info!("{}", line);
        }
    }
    if verbosity.quiet && !effective_quiet(verbosity, &notifiers) {
        console.unquiet();
        warn!("quiet mode needs an onFailure notifier; ignoring -q");
        verbosity.quiet = false;
    }

    let ctx = RunContext {
        config_name: name,
        global,
        backup,
        operations,
        verbosity,
    };
    execute_run(&ctx, &notifiers, ProcessExecutor)
}

/// Quiet mode only holds when failures still reach someone.
pub fn effective_quiet(verbosity: Verbosity, notifiers: &NotifierSet) -> bool {
    verbosity.quiet && notifiers.has_failure_notifiers()
}

/// Takes the configuration's lock and runs the selected operations.
/// Returns the process exit code for outcomes that are not configuration
/// or lock errors.
pub fn execute_run<E: Execute>(
    ctx: &RunContext,
    notifiers: &NotifierSet,
    executor: E,
) -> Result<i32> {
    let mut report = Report::new(ctx.config_name.clone());
    let lock_file = lock_path(&ctx.global.lock_dir, &ctx.config_name);
    let _guard = match lock::try_acquire(&lock_file)? {
        Some(guard) => guard,
        None => {
            let text = format!(
                "Skipping backup of {}: another run holds {}",
                ctx.config_name,
                lock_file.display()
            );
            warn!("{}", text);
            report.transcript.push(text);
            announce(notifiers, Event::Skip, &report);
            return Ok(EXIT_SKIPPED);
        }
    };

    let mut runner = Runner::new(
        executor,
        &ctx.global.duplicacy_path,
        &ctx.backup,
        ctx.operations,
    )
    .with_debug(ctx.verbosity.debug);
    let mut log = RunLog::in_memory();
    let outcome = perform(ctx, notifiers, &mut runner, &mut log, &mut report);
    if let Err(err) = &outcome {
        if !matches!(err, DupctlError::Exec(_)) {
            log.error(&format!("Error: {}", err));
        }
    }
    report.transcript = log.transcript().to_vec();

    match outcome {
        Ok(()) => {
            announce(notifiers, Event::Success, &report);
            Ok(EXIT_OK)
        }
        Err(_) => {
            announce(notifiers, Event::Failure, &report);
            Ok(EXIT_RUN_FAILED)
        }
    }
}

fn perform<E: Execute>(
    ctx: &RunContext,
    notifiers: &NotifierSet,
    runner: &mut Runner<'_, E>,
    log: &mut RunLog,
    report: &mut Report,
) -> Result<()> {
    let log_file = log_path(&ctx.global.log_dir, &ctx.config_name);
    runner.rotate_logs(&log_file, ctx.global.log_file_count)?;
    *log = RunLog::create(&log_file)?;
    log.message(&format!(
        "Beginning backup on {}",
        Local::now().format("%m-%d-%Y %H:%M:%S")
    ));

    report.transcript = log.transcript().to_vec();
    announce(notifiers, Event::Start, report);

    runner.run(log, report)?;
    Ok(())
}

fn announce(notifiers: &NotifierSet, event: Event, report: &Report) {
    if let Err(err) = notifiers.fire(event, report) {
        warn!("not every {} notification was delivered: {}", event, err);
    }
}
