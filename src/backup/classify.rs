use std::sync::OnceLock;

use regex::Regex;

// Statistics are kept as the external tool prints them ("15,951M"), since
// they only ever end up in reports.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupStats {
    pub storage: String,
    pub files_total_count: String,
    pub files_total_size: String,
    pub files_new_count: String,
    pub files_new_size: String,
    pub chunk_total_count: String,
    pub chunk_total_size: String,
    pub chunk_new_count: String,
    pub chunk_new_size: String,
    pub chunk_new_uploaded: String,
    pub duration: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub storage_from: String,
    pub storage_to: String,
    pub chunk_total_count: String,
    pub chunk_copy_count: String,
    pub chunk_skip_count: String,
    pub duration: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// A statistics line; fields are captured when the format matches.
    Statistics,
    /// The tool seems to be waiting for a password it will never get.
    CredentialPrompt,
    Other,
}

const FILES_PREFIX: &str = "Files:";
const CHUNKS_PREFIX: &str = "All chunks:";
const COPY_PREFIX: &str = "Copy complete, ";
const PASSWORD_PROMPT: &str = "Enter storage password:";
const AUTH_FAILURE: &str = "Authorization failure";

fn files_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r".*: (\S+) total, (\S+) bytes; (\S+) new, (\S+) bytes").expect("valid regex")
    })
}

fn chunks_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r".*: (\S+) total, (\S+) bytes; (\S+) new, (\S+) bytes, (\S+) bytes uploaded")
            .expect("valid regex")
    })
}

fn copy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Copy complete, (\S+) total chunks, (\S+) chunks copied, (\S+) skipped")
            .expect("valid regex")
    })
}

/// Classifies one line of `duplicacy backup -stats` output, filling in
/// whatever statistics it carries. Lines that do not match leave `stats`
/// untouched.
pub fn classify_backup_line(line: &str, stats: &mut BackupStats) -> LineKind {
    if line.starts_with(FILES_PREFIX) {
        if let Some(caps) = files_re().captures(line) {
            stats.files_total_count = caps[1].to_string();
            stats.files_total_size = caps[2].to_string();
            stats.files_new_count = caps[3].to_string();
            stats.files_new_size = caps[4].to_string();
        }
        return LineKind::Statistics;
    }
    if line.starts_with(CHUNKS_PREFIX) {
        if let Some(caps) = chunks_re().captures(line) {
            stats.chunk_total_count = caps[1].to_string();
            stats.chunk_total_size = caps[2].to_string();
            stats.chunk_new_count = caps[3].to_string();
            stats.chunk_new_size = caps[4].to_string();
            stats.chunk_new_uploaded = caps[5].to_string();
        }
        return LineKind::Statistics;
    }
    if line.starts_with(PASSWORD_PROMPT) || line.ends_with(AUTH_FAILURE) {
        return LineKind::CredentialPrompt;
    }
    LineKind::Other
}

pub fn classify_copy_line(line: &str, stats: &mut CopyStats) -> LineKind {
    if !line.starts_with(COPY_PREFIX) {
        return LineKind::Other;
    }
    if let Some(caps) = copy_re().captures(line) {
        stats.chunk_total_count = caps[1].to_string();
        stats.chunk_copy_count = caps[2].to_string();
        stats.chunk_skip_count = caps[3].to_string();
    }
    LineKind::Statistics
}
