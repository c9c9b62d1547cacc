use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::ExecError;

/// Runs an external program and hands each stdout line to a sink.
pub trait Execute {
    fn run(
        &mut self,
        program: &Path,
        args: &[String],
        working_dir: &Path,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<(), ExecError>;
}

/// Spawns real processes. Lines are delivered in order, one at a time, as
/// they are read from the pipe; stderr is discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl Execute for ProcessExecutor {
    fn run(
        &mut self,
        program: &Path,
        args: &[String],
        working_dir: &Path,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<(), ExecError> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        debug!("executing: {}", describe_command(&cmd));
        run_streaming(&mut cmd, on_line)
    }
}

pub fn describe_command(cmd: &Command) -> String {
    let program = cmd.get_program().to_string_lossy();
    let args: Vec<String> = cmd
        .get_args()
        .map(|a| a.to_string_lossy().to_string())
        .collect();
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

pub fn run_streaming(cmd: &mut Command, on_line: &mut dyn FnMut(&str)) -> Result<(), ExecError> {
    let program = cmd.get_program().to_string_lossy().to_string();
    let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
        program: program.clone(),
        source,
    })?;

    let mut read_error = None;
    if let Some(stdout) = child.stdout.take() {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    on_line(line.trim_end_matches(['\n', '\r']));
                }
                Err(source) => {
                    read_error = Some(source);
                    break;
                }
            }
        }
    }

    if read_error.is_some() {
        let _ = child.kill();
    }
    let status = child.wait().map_err(|source| ExecError::Read {
        program: program.clone(),
        source,
    })?;
    if let Some(source) = read_error {
        return Err(ExecError::Read { program, source });
    }
    if !status.success() {
        return Err(ExecError::Status {
            program,
            code: status.code(),
        });
    }
    Ok(())
}
