use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Preferred UI language; empty means "derive from the system locale".
    pub language: String,
    pub catalog_dir: Option<PathBuf>,
    pub include_unfinished: bool,
    pub checks: CheckSettings,
}

/// Optional validation checks. Placeholder set mismatches are always checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckSettings {
    pub accelerators: bool,
    pub punctuation: bool,
    pub whitespace: bool,
    pub placeholder_order: bool,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            accelerators: true,
            punctuation: true,
            whitespace: true,
            placeholder_order: true,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: String::new(),
            catalog_dir: None,
            include_unfinished: true,
            checks: CheckSettings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    system: Option<SystemSettings>,
    release: Option<ReleaseSettings>,
    check: Option<CheckSection>,
}

#[derive(Debug, Default, Deserialize)]
struct SystemSettings {
    language: Option<String>,
    catalog_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReleaseSettings {
    include_unfinished: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct CheckSection {
    accelerators: Option<bool>,
    punctuation: Option<bool>,
    whitespace: Option<bool>,
    placeholder_order: Option<bool>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = paths::settings_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed = parse_settings(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

fn parse_settings(content: &str) -> Result<SettingsFile> {
    Ok(toml::from_str(content)?)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(system) = incoming.system {
            if let Some(language) = system.language {
                self.language = language.trim().to_string();
            }
            if let Some(dir) = system.catalog_dir {
                let dir = dir.trim();
                self.catalog_dir = if dir.is_empty() {
                    None
                } else {
                    Some(paths::expand_dir(dir))
                };
            }
        }
        if let Some(release) = incoming.release {
            if let Some(include) = release.include_unfinished {
                self.include_unfinished = include;
            }
        }
        if let Some(check) = incoming.check {
            if let Some(value) = check.accelerators {
                self.checks.accelerators = value;
            }
            if let Some(value) = check.punctuation {
                self.checks.punctuation = value;
            }
            if let Some(value) = check.whitespace {
                self.checks.whitespace = value;
            }
            if let Some(value) = check.placeholder_order {
                self.checks.placeholder_order = value;
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = paths::settings_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if path.exists() {
        return Ok(());
    }
    paths::write_atomic(&path, DEFAULT_SETTINGS_TOML.as_bytes())
        .with_context(|| format!("failed to write settings: {}", path.display()))?;
    Ok(())
}
