use crate::config::model::{CheckTarget, CopyTarget, PruneTarget, StorageTarget};

fn push_threads(args: &mut Vec<String>, threads: Option<u32>) {
    if let Some(threads) = threads {
        args.push("-threads".to_string());
        args.push(threads.to_string());
    }
}

pub fn backup_args(target: &StorageTarget) -> Vec<String> {
    let mut args = vec![
        "backup".to_string(),
        "-storage".to_string(),
        target.name.clone(),
        "-stats".to_string(),
    ];
    push_threads(&mut args, target.threads);
    if target.vss {
        args.push("-vss".to_string());
        if let Some(timeout) = target.vss_timeout {
            args.push("-vss-timeout".to_string());
            args.push(timeout.to_string());
        }
    }
    args.extend(target.extra_flags.iter().cloned());
    args
}

pub fn copy_args(target: &CopyTarget) -> Vec<String> {
    let mut args = vec![
        "copy".to_string(),
        "-from".to_string(),
        target.from.clone(),
        "-to".to_string(),
        target.to.clone(),
    ];
    push_threads(&mut args, target.threads);
    args.extend(target.extra_flags.iter().cloned());
    args
}

pub fn prune_args(target: &PruneTarget) -> Vec<String> {
    let mut args = vec![
        "prune".to_string(),
        "-storage".to_string(),
        target.storage.clone(),
    ];
    for rule in &target.keep {
        args.push("-keep".to_string());
        args.push(rule.clone());
    }
    push_threads(&mut args, target.threads);
    if target.all {
        args.push("-all".to_string());
    }
    args.extend(target.extra_flags.iter().cloned());
    args
}

pub fn check_args(target: &CheckTarget) -> Vec<String> {
    let mut args = vec![
        "check".to_string(),
        "-storage".to_string(),
        target.storage.clone(),
    ];
    if target.all {
        args.push("-all".to_string());
    }
    args.extend(target.extra_flags.iter().cloned());
    args
}

/// Thread count as the external tool will use it.
pub fn effective_threads(threads: Option<u32>) -> u32 {
    threads.unwrap_or(1)
}
