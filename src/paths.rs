use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const BASE_DIR_ENV: &str = "GIGAMESH_I18N_DIR";
const DEFAULT_DIR_NAME: &str = ".gigamesh-i18n";

/// Directory holding the user settings files.
pub(crate) fn settings_dir() -> Option<PathBuf> {
    if let Some(dir) = base_dir_override() {
        return Some(dir);
    }
    home_join(DEFAULT_DIR_NAME)
}

/// Expands `~` and normalizes a configured directory.
pub(crate) fn expand_dir(value: &str) -> PathBuf {
    normalize_dir(value).unwrap_or_else(|| PathBuf::from(value))
}

/// Replaces `path` through a temp file in the same directory, so the target is
/// either the old or the new content, never a partial write.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

fn base_dir_override() -> Option<PathBuf> {
    std::env::var(BASE_DIR_ENV)
        .ok()
        .and_then(|value| normalize_dir(&value))
}

fn home_join(suffix: &str) -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(suffix))
        }
    })
}

fn normalize_dir(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let expanded = expand_tilde(trimmed);
    Some(normalize_path(PathBuf::from(expanded)))
}

fn normalize_path(path: PathBuf) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        normalized.push(component.as_os_str());
    }
    normalized
}

fn expand_tilde(value: &str) -> String {
    if value == "~" || value.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            let home = home.trim();
            if home.is_empty() {
                return value.to_string();
            }
            if value == "~" {
                return home.to_string();
            }
            return format!("{}{}", home, &value[1..]);
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn settings_dir_defaults_under_home() {
        with_temp_home(|home| {
            assert_eq!(settings_dir(), Some(home.join(DEFAULT_DIR_NAME)));
        });
    }

    #[test]
    fn write_atomic_replaces_content_without_leftovers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("table.json");
        write_atomic(&path, b"old").expect("first write");
        write_atomic(&path, b"new").expect("second write");
        assert_eq!(fs::read_to_string(&path).expect("read back"), "new");
        let entries = fs::read_dir(path.parent().unwrap()).expect("list").count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn expand_dir_resolves_tilde() {
        with_temp_home(|home| {
            assert_eq!(expand_dir("~/ts//de"), home.join("ts").join("de"));
            assert_eq!(expand_dir("/opt/gigamesh"), PathBuf::from("/opt/gigamesh"));
        });
    }
}
