use std::fs::{File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::Path;

use chrono::Local;
use tracing::{error, info, warn};

/// Per-run log. Messages go to the run's log file with a time prefix, to
/// the tracing output, and into an in-memory transcript that ends up in
/// the run report. Raw tool output only goes to the file.
#[derive(Debug)]
pub struct RunLog {
    file: Option<LineWriter<File>>,
    transcript: Vec<String>,
}

impl RunLog {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            file: Some(LineWriter::new(file)),
            transcript: Vec::new(),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            file: None,
            transcript: Vec::new(),
        }
    }

    pub fn message(&mut self, text: &str) {
        info!("{}", text);
        self.record(text);
    }

    pub fn error(&mut self, text: &str) {
        error!("{}", text);
        self.record(text);
    }

    pub fn raw(&mut self, line: &str) {
        self.write_file(line);
    }

    pub fn separator(&mut self) {
        self.write_file("######################################################################");
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    fn record(&mut self, text: &str) {
        let stamped = format!("{} {}", Local::now().format("%H:%M:%S"), text);
        self.write_file(&stamped);
        self.transcript.push(stamped);
    }

    fn write_file(&mut self, line: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        if let Err(err) = writeln!(file, "{}", line) {
            warn!("failed to write run log: {}", err);
            self.file = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn strip_time(line: &str) -> &str {
        line.split_once(' ').map(|(_, rest)| rest).unwrap_or(line)
    }

    #[test]
    fn messages_are_stamped_and_kept() {
        let mut log = RunLog::in_memory();
        log.message("Beginning backup on 2024-01-01");
        log.error("  Error: something broke");

        let lines = log.transcript();
        assert_eq!(lines.len(), 2);
        assert_eq!(strip_time(&lines[0]), "Beginning backup on 2024-01-01");
        assert_eq!(strip_time(&lines[1]), "  Error: something broke");
        let stamp = lines[0].split(' ').next().expect("stamp");
        assert_eq!(stamp.len(), 8);
        assert_eq!(stamp.matches(':').count(), 2);
    }

    #[test]
    fn raw_output_only_goes_to_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("home.log");
        let mut log = RunLog::create(&path).expect("create");
        log.separator();
        log.raw("Uploaded chunk 1");
        log.message("Backing up to storage b2");
        drop(log);

        let contents = fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("#####"));
        assert_eq!(lines[1], "Uploaded chunk 1");
        assert_eq!(strip_time(lines[2]), "Backing up to storage b2");
    }

    #[test]
    fn create_truncates_previous_run() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("home.log");
        fs::write(&path, "stale\n").expect("write");
        let mut log = RunLog::create(&path).expect("create");
        log.raw("fresh");
        drop(log);
        assert_eq!(fs::read_to_string(&path).expect("read"), "fresh\n");
    }
}
