use anyhow::{bail, Result};
use chrono::Local;
use tracing::info;

use crate::backup::classify::{BackupStats, CopyStats};
use crate::cli::args::Cli;
use crate::config::global::load_global_config;
use crate::error::DupctlError;
use crate::notify::NotifierSet;
use crate::report::Report;
use crate::types::Event;
use crate::util::paths::resolve_storage_dir;

/// Sends every configured notification once with made-up results, so a
/// channel can be checked without running a backup.
pub fn run_test_notifications(cli: &Cli) -> Result<i32> {
    let storage_dir = resolve_storage_dir(cli.storage_dir.as_deref())?;
    let global = load_global_config(&storage_dir, cli.global_config.as_deref())?;
    let notifiers = NotifierSet::build(&global).map_err(DupctlError::from)?;

    let name = cli
        .config
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or("test");
    let report = sample_report(name);

    let mut failed = Vec::new();
    for event in Event::ALL {
        let count = notifiers.for_event(event).len();
        if count == 0 {
            info!("no notifiers configured for {}", event);
            continue;
        }
        info!("sending test {} notification to {} notifier(s)", event, count);
        if notifiers.fire(event, &report).is_err() {
            failed.push(event.as_str());
        }
    }
    if !failed.is_empty() {
        bail!("test notifications failed for {}", failed.join(", "));
    }
    info!("all test notifications sent");
    Ok(0)
}

fn sample_report(name: &str) -> Report {
    let mut report = Report::new(name);
    let stamp = Local::now().format("%H:%M:%S");
    report.transcript = vec![
        format!("{} This is a test notification from dupctl", stamp),
        format!("{} Backing up to storage b2 with 5 threads", stamp),
        format!(
            "{}   Files: 161318 total, 1666G bytes; 373 new, 15,951M bytes",
            stamp
        ),
    ];
    report.backup_rows.push(BackupStats {
        storage: "b2".to_string(),
        duration: "3:05".to_string(),
        files_total_count: "161318".to_string(),
        files_total_size: "1666G".to_string(),
        files_new_count: "373".to_string(),
        files_new_size: "15,951M".to_string(),
        chunk_total_count: "348444".to_string(),
        chunk_total_size: "1668G".to_string(),
        chunk_new_count: "2415".to_string(),
        chunk_new_size: "12,391M".to_string(),
        chunk_new_uploaded: "12,255M".to_string(),
    });
    report.copy_rows.push(CopyStats {
        storage_from: "b2".to_string(),
        storage_to: "offsite".to_string(),
        duration: "42 seconds".to_string(),
        chunk_total_count: "107".to_string(),
        chunk_copy_count: "3".to_string(),
        chunk_skip_count: "104".to_string(),
    });
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn sample_report_fills_both_tables() {
        let report = sample_report("home");
        let html = report.html_body();
        assert!(html.contains("Backup Summary"));
        assert!(html.contains("Copy Summary"));
        assert!(report.text_body().contains("test notification"));
    }

    #[test]
    fn no_channels_is_a_successful_test() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(
            dir.path().join("duplicacy-util.yaml"),
            "duplicacyPath: /bin/sh\n",
        )
        .expect("write");
        let cli = Cli {
            storage_dir: Some(dir.path().to_path_buf()),
            test_notifications: true,
            ..Cli::default()
        };
        assert_eq!(run_test_notifications(&cli).expect("test"), 0);
    }

    #[test]
    fn unknown_channel_keeps_its_exit_code() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(
            dir.path().join("duplicacy-util.yaml"),
            "duplicacyPath: /bin/sh\nnotifications:\n  onStart: [\"pager\"]\n",
        )
        .expect("write");
        let cli = Cli {
            storage_dir: Some(dir.path().to_path_buf()),
            ..Cli::default()
        };
        let err = run_test_notifications(&cli).expect_err("pager");
        assert!(err.downcast_ref::<DupctlError>().is_some());
    }
}
