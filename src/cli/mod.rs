use std::env;

use clap::error::ErrorKind;
use clap::Parser;
use tracing::error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use crate::cli::args::Cli;
use crate::cli::commands::{exit_code_for, notify, run, EXIT_CONFIG, EXIT_OK, EXIT_USAGE};
use crate::error::DupctlError;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const PROJECT_URL: &str = "https://github.com/dupctl/dupctl";

pub mod args;
pub mod commands;

/// Handle on the console log filter, so quiet mode can be withdrawn after
/// the notification setup is known.
#[derive(Default)]
pub struct Console {
    handle: Option<reload::Handle<EnvFilter, Registry>>,
}

impl Console {
    pub fn unquiet(&self) {
        if let Some(handle) = &self.handle {
            let _ = handle.reload(EnvFilter::new("info"));
        }
    }
}

pub fn run() -> i32 {
    let cli = match parse_cli(env::args().collect()) {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    if cli.help {
        print_help();
        return EXIT_OK;
    }
    if cli.version {
        print_version();
        return EXIT_OK;
    }

    let console = init_tracing(cli.verbosity().filter());
    if cli.test_notifications {
        return match notify::run_test_notifications(&cli) {
            Ok(code) => code,
            Err(err) => {
                error!("{:#}", err);
                err.downcast_ref::<DupctlError>()
                    .map(exit_code_for)
                    .unwrap_or(EXIT_CONFIG)
            }
        };
    }
    match run::run_configuration(&cli, &console) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err);
            exit_code_for(&err)
        }
    }
}

fn parse_cli(raw: Vec<String>) -> Result<Cli, i32> {
    match Cli::try_parse_from(preprocess_args(raw)) {
        Ok(cli) => Ok(cli),
        Err(err) => {
            if err.kind() == ErrorKind::DisplayHelp {
                print_help();
                return Err(EXIT_OK);
            }
            if err.kind() == ErrorKind::UnknownArgument {
                if let Some(arg) = err.context().find_map(|c| {
                    if let clap::error::ContextKind::InvalidArg = c.0 {
                        Some(c.1.to_string())
                    } else {
                        None
                    }
                }) {
                    eprintln!("Error: unrecognized argument {}", arg);
                    return Err(EXIT_USAGE);
                }
            }
            eprintln!("{}", err);
            Err(EXIT_USAGE)
        }
    }
}

/// Accepts single-dash long flags (`-sd`, `-tn`, `-version`) and their
/// `--` spellings alongside the clap names.
fn preprocess_args(raw: Vec<String>) -> Vec<String> {
    let mut out = Vec::new();
    let mut iter = raw.into_iter();
    if let Some(bin) = iter.next() {
        out.push(bin);
    }
    for arg in iter {
        let (flag, value) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg.clone(), None),
        };
        let long = match flag.trim_start_matches('-') {
            "sd" if flag.starts_with('-') => Some("--storage-dir"),
            "tn" if flag.starts_with('-') => Some("--test-notifications"),
            "version" if flag.starts_with('-') => Some("--version"),
            "help" if flag.starts_with('-') => Some("--help"),
            _ => None,
        };
        match (long, value) {
            (Some(long), Some(value)) => out.push(format!("{}={}", long, value)),
            (Some(long), None) => out.push(long.to_string()),
            (None, _) => out.push(arg),
        }
    }
    out
}

fn print_version() {
    println!("dupctl {}", VERSION);
    println!("Project: {}", PROJECT_URL);
}

fn print_help() {
    println!("dupctl {}", VERSION);
    println!("Usage:");
    println!("  dupctl -f <config> [-a | -b | -p | -c] [options]");
    println!("  dupctl -tn [options]");
    println!("  dupctl -version");
    println!();
    println!("Options:");
    println!("  -f <config>       Storage configuration (name under the storage dir, or a path)");
    println!("  -g <file>         Global configuration file");
    println!("  -sd <dir>         Storage directory (default $HOME/.duplicacy-util)");
    println!("  -a                Run all operations (backup/copy, prune, check)");
    println!("  -b                Run backup and copy");
    println!("  -p                Run prune");
    println!("  -c                Run check");
    println!("  -tn               Send test notifications and exit");
    println!("  -d                Debug output (implies -v)");
    println!("  -v                Verbose output");
    println!("  -q                Quiet; only errors (needs an onFailure notifier)");
    println!("  -version          Print version and exit");
}

fn init_tracing(level: &str) -> Console {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let (filter, handle) = reload::Layer::new(filter);
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .is_ok();
    Console {
        handle: installed.then_some(handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn single_dash_long_flags_are_rewritten() {
        let out = preprocess_args(args(&["dupctl", "-sd", "/srv", "-tn", "-version", "-f", "home"]));
        assert_eq!(
            out,
            ["dupctl", "--storage-dir", "/srv", "--test-notifications", "--version", "-f", "home"]
        );
    }

    #[test]
    fn inline_values_are_kept() {
        let out = preprocess_args(args(&["dupctl", "-sd=/srv", "--tn"]));
        assert_eq!(out, ["dupctl", "--storage-dir=/srv", "--test-notifications"]);
    }

    #[test]
    fn parses_go_style_command_line() {
        let cli = parse_cli(args(&[
            "dupctl", "-f", "home", "-g", "/etc/g.yaml", "-sd", "/srv", "-b", "-p", "-q",
        ]))
        .expect("parse");
        assert_eq!(cli.config.as_deref(), Some("home"));
        assert_eq!(cli.global_config, Some(std::path::PathBuf::from("/etc/g.yaml")));
        assert_eq!(cli.storage_dir, Some(std::path::PathBuf::from("/srv")));
        assert!(cli.backup && cli.prune && cli.quiet);
        assert!(!cli.check && !cli.all);
    }

    #[test]
    fn stray_arguments_are_usage_errors() {
        assert_eq!(parse_cli(args(&["dupctl", "-f", "home", "extra"])).err(), Some(EXIT_USAGE));
        assert_eq!(parse_cli(args(&["dupctl", "-x"])).err(), Some(EXIT_USAGE));
    }

    #[test]
    fn missing_config_is_exit_two() {
        let cli = parse_cli(args(&["dupctl", "-b"])).expect("parse");
        let err = run::run_configuration(&cli, &Console::default()).expect_err("missing -f");
        assert_eq!(exit_code_for(&err), 2);
    }
}
