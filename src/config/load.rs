use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Number, Value};
use tracing::warn;

use crate::config::model::{
    BackupConfig, CheckEntry, CheckTarget, CopyEntry, CopyTarget, PruneEntry, PruneTarget,
    StorageEntry, StorageTarget,
};
use crate::error::{ConfigError, DupctlError, Result};

pub fn load_backup_config(path: &Path) -> Result<BackupConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|e| DupctlError::message(format!("read config {}: {}", path.display(), e)))?;
    parse_backup_config(&contents, path)
}

pub fn parse_backup_config(contents: &str, path: &Path) -> Result<BackupConfig> {
    let doc: Value = serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let root = match doc {
        Value::Mapping(map) => map,
        Value::Null => Mapping::new(),
        _ => {
            return Err(ConfigError::Invalid(format!(
                "{}: top level must be a mapping",
                path.display()
            ))
            .into())
        }
    };

    let repository = match root.get("repository").and_then(Value::as_str) {
        Some(repo) if !repo.trim().is_empty() => PathBuf::from(repo.trim()),
        _ => return Err(ConfigError::Invalid("missing mandatory repository location".into()).into()),
    };
    if !repository.is_dir() {
        return Err(ConfigError::Invalid(format!(
            "repository {} is not a directory",
            repository.display()
        ))
        .into());
    }

    let mut reader = SectionReader::new(path);

    let storage = match reader.read::<StorageEntry>(&root, "storage")? {
        Some(entries) => entries
            .into_iter()
            .map(|(label, e)| storage_target(&label, e))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => return Err(no_locations("storage").into()),
    };
    let copy = match reader.read::<CopyEntry>(&root, "copy")? {
        Some(entries) => entries
            .into_iter()
            .map(|(label, e)| copy_target(&label, e))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    let prune = match reader.read::<PruneEntry>(&root, "prune")? {
        Some(entries) => entries
            .into_iter()
            .map(|(label, e)| prune_target(&label, e))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => return Err(no_locations("prune").into()),
    };
    let check = match reader.read::<CheckEntry>(&root, "check")? {
        Some(entries) => entries
            .into_iter()
            .map(|(label, e)| check_target(&label, e))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    Ok(BackupConfig {
        repository,
        storage,
        copy,
        prune,
        check,
    })
}

/// How a target section is laid out in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionLayout {
    /// `storage: [ {name: ..}, ... ]`
    Array,
    /// `storage: { 1: {name: ..}, 2: ... }`, deprecated.
    Numbered,
}

impl SectionLayout {
    fn probe(value: &Value) -> Option<Self> {
        match value {
            Value::Sequence(_) => Some(SectionLayout::Array),
            Value::Mapping(_) => Some(SectionLayout::Numbered),
            _ => None,
        }
    }

    fn entries<'v>(self, section: &str, value: &'v Value) -> Vec<(String, &'v Value)> {
        match (self, value) {
            (SectionLayout::Array, Value::Sequence(seq)) => seq
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("{}[{}]", section, i), v))
                .collect(),
            (SectionLayout::Numbered, Value::Mapping(map)) => {
                let mut out = Vec::new();
                for i in 1u64.. {
                    let entry = map
                        .get(Value::Number(Number::from(i)))
                        .or_else(|| map.get(i.to_string().as_str()));
                    match entry {
                        Some(v) => out.push((format!("{}.{}", section, i), v)),
                        None => break,
                    }
                }
                out
            }
            _ => Vec::new(),
        }
    }
}

struct SectionReader<'p> {
    path: &'p Path,
    warned: bool,
}

impl<'p> SectionReader<'p> {
    fn new(path: &'p Path) -> Self {
        Self { path, warned: false }
    }

    /// Returns `None` when the section is absent. A present section that
    /// yields no entries is an error.
    fn read<T: DeserializeOwned>(
        &mut self,
        root: &Mapping,
        section: &str,
    ) -> std::result::Result<Option<Vec<(String, T)>>, ConfigError> {
        let value = match root.get(section) {
            None | Some(Value::Null) => return Ok(None),
            Some(v) => v,
        };
        let layout = SectionLayout::probe(value).ok_or_else(|| {
            ConfigError::Invalid(format!("{} must be a list of entries", section))
        })?;
        if layout == SectionLayout::Numbered && !self.warned {
            warn!(
                "{}: numbered keys ({}.1, {}.2, ...) are deprecated; use a list instead",
                self.path.display(),
                section,
                section
            );
            self.warned = true;
        }
        let entries = layout.entries(section, value);
        if entries.is_empty() {
            return Err(no_locations(section));
        }
        entries
            .into_iter()
            .map(|(label, v)| {
                serde_yaml::from_value::<T>(v.clone())
                    .map(|entry| (label.clone(), entry))
                    .map_err(|e| ConfigError::Invalid(format!("{}: {}", label, e)))
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Some)
    }
}

fn no_locations(section: &str) -> ConfigError {
    ConfigError::Invalid(format!("no {} locations defined in configuration", section))
}

fn required(label: &str, field: &str, value: Option<String>) -> std::result::Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Invalid(format!(
            "missing mandatory field: {}.{}",
            label, field
        ))),
    }
}

fn split_flags(value: Option<String>) -> Vec<String> {
    value
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn threads(value: Option<u32>) -> Option<u32> {
    value.filter(|t| *t > 0)
}

fn storage_target(label: &str, e: StorageEntry) -> std::result::Result<StorageTarget, ConfigError> {
    Ok(StorageTarget {
        name: required(label, "name", e.name)?,
        threads: threads(e.threads),
        vss: e.vss.unwrap_or(false),
        vss_timeout: e.vss_timeout.filter(|t| *t > 0),
        extra_flags: split_flags(e.quote),
    })
}

fn copy_target(label: &str, e: CopyEntry) -> std::result::Result<CopyTarget, ConfigError> {
    Ok(CopyTarget {
        from: required(label, "from", e.from)?,
        to: required(label, "to", e.to)?,
        threads: threads(e.threads),
        extra_flags: split_flags(e.quote),
    })
}

fn prune_target(label: &str, e: PruneEntry) -> std::result::Result<PruneTarget, ConfigError> {
    let storage = required(label, "storage", e.storage)?;
    let keep = split_flags(Some(required(label, "keep", e.keep)?));
    Ok(PruneTarget {
        storage,
        keep,
        threads: threads(e.threads),
        all: e.all.unwrap_or(true),
        extra_flags: split_flags(e.quote),
    })
}

fn check_target(label: &str, e: CheckEntry) -> std::result::Result<CheckTarget, ConfigError> {
    Ok(CheckTarget {
        storage: required(label, "storage", e.storage)?,
        all: e.all.unwrap_or(false),
        extra_flags: split_flags(e.quote),
    })
}
