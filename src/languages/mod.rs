use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::catalog::{Catalog, parse_ts};

pub mod plural;

include!(concat!(env!("OUT_DIR"), "/embedded_catalogs.rs"));

pub const CATALOG_PREFIX: &str = "GigaMesh_";
pub const CATALOG_EXTENSION: &str = "ts";

#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    codes: HashMap<String, String>,
}

impl LanguageRegistry {
    pub fn load() -> Result<Self> {
        let raw = include_str!("iso_639.json");
        let parsed: IsoData =
            serde_json::from_str(raw).with_context(|| "failed to parse ISO 639 language data")?;
        Ok(LanguageRegistry {
            codes: parsed.codes,
        })
    }

    pub fn is_valid_code(&self, code: &str) -> bool {
        self.codes.contains_key(&base_code(code))
    }

    pub fn iso_name(&self, code: &str) -> Option<String> {
        self.codes.get(&base_code(code)).cloned()
    }

    pub fn display_name(&self, locale: &str) -> String {
        self.iso_name(locale).unwrap_or_else(|| locale.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct IsoData {
    codes: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogOrigin {
    Embedded,
    File(PathBuf),
}

/// A catalog that can be loaded for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSource {
    pub locale: String,
    pub origin: CatalogOrigin,
}

impl CatalogSource {
    pub fn load(&self) -> Result<Catalog> {
        match &self.origin {
            CatalogOrigin::Embedded => {
                let raw = embedded_catalog(&self.locale)
                    .ok_or_else(|| anyhow!("no embedded catalog for '{}'", self.locale))?;
                parse_ts(raw)
                    .with_context(|| format!("failed to parse embedded catalog '{}'", self.locale))
            }
            CatalogOrigin::File(path) => load_catalog_file(path),
        }
    }

    pub fn describe(&self) -> String {
        match &self.origin {
            CatalogOrigin::Embedded => "embedded".to_string(),
            CatalogOrigin::File(path) => path.display().to_string(),
        }
    }
}

pub fn load_catalog_file(path: &Path) -> Result<Catalog> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog: {}", path.display()))?;
    parse_ts(&content).with_context(|| format!("failed to parse catalog: {}", path.display()))
}

/// Embedded catalogs plus every `GigaMesh_<locale>.ts` in `extra_dir`.
/// A file on disk shadows the embedded catalog of the same locale.
pub fn available_catalogs(extra_dir: Option<&Path>) -> Result<Vec<CatalogSource>> {
    let mut sources = BTreeMap::new();
    for locale in EMBEDDED_LOCALES {
        sources.insert(
            locale.to_string(),
            CatalogSource {
                locale: locale.to_string(),
                origin: CatalogOrigin::Embedded,
            },
        );
    }

    if let Some(dir) = extra_dir {
        if dir.is_dir() {
            let entries = fs::read_dir(dir)
                .with_context(|| format!("failed to list catalog directory: {}", dir.display()))?;
            for entry in entries {
                let entry = entry.with_context(|| "failed to read catalog directory entry")?;
                let path = entry.path();
                let Some(locale) = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .and_then(locale_from_file_name)
                else {
                    continue;
                };
                debug!("found catalog {} for '{}'", path.display(), locale);
                sources.insert(
                    locale.clone(),
                    CatalogSource {
                        locale,
                        origin: CatalogOrigin::File(path),
                    },
                );
            }
        } else {
            warn!("catalog directory does not exist: {}", dir.display());
        }
    }

    Ok(sources.into_values().collect())
}

/// `GigaMesh_de.ts` yields `de`.
pub fn locale_from_file_name(name: &str) -> Option<String> {
    let stem = name.strip_suffix(&format!(".{}", CATALOG_EXTENSION))?;
    let locale = stem.strip_prefix(CATALOG_PREFIX)?;
    if locale.is_empty() {
        None
    } else {
        Some(locale.to_string())
    }
}

pub fn catalog_file_name(locale: &str) -> String {
    format!("{}{}.{}", CATALOG_PREFIX, locale, CATALOG_EXTENSION)
}

/// Locale of the process environment (`LC_ALL`, `LC_MESSAGES`, `LANG`), without
/// encoding or modifier suffixes.
pub fn system_locale() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find_map(|value| normalize_locale(&value))
}

fn normalize_locale(value: &str) -> Option<String> {
    let value = value.trim();
    let value = value.split(['.', '@']).next().unwrap_or(value);
    if value.is_empty() || value == "C" || value == "POSIX" {
        return None;
    }
    Some(value.replace('-', "_"))
}

/// Picks the UI language: explicit request, then the configured language,
/// then the system locale with its territory dropped (`de_DE` becomes `de`).
pub fn resolve_language(requested: Option<&str>, configured: &str) -> Option<String> {
    if let Some(requested) = requested.and_then(normalize_locale) {
        return Some(requested);
    }
    if let Some(configured) = normalize_locale(configured) {
        return Some(configured);
    }
    let system = system_locale()?;
    let truncated = match system.rfind('_') {
        Some(index) => system[..index].to_string(),
        None => system,
    };
    Some(truncated)
}

/// Lookup order for a locale: `de_DE_bavaria`, `de_DE`, `de`.
pub fn candidates(locale: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = locale.trim().replace('-', "_");
    while !current.is_empty() {
        out.push(current.clone());
        match current.rfind('_') {
            Some(index) => current.truncate(index),
            None => break,
        }
    }
    out
}

pub fn select_catalog<'a>(sources: &'a [CatalogSource], locale: &str) -> Option<&'a CatalogSource> {
    candidates(locale).into_iter().find_map(|candidate| {
        sources
            .iter()
            .find(|source| source.locale.eq_ignore_ascii_case(&candidate))
    })
}

fn base_code(code: &str) -> String {
    code.trim()
        .split(['_', '-'])
        .next()
        .unwrap_or("")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn german_catalog_is_embedded() {
        assert!(EMBEDDED_LOCALES.contains(&"de"));
        assert!(embedded_catalog("de").is_some());
        assert!(embedded_catalog("xx").is_none());
    }

    #[test]
    fn registry_resolves_display_names() {
        let registry = LanguageRegistry::load().expect("registry");
        assert_eq!(registry.display_name("de_DE"), "German");
        assert!(registry.is_valid_code("EN"));
        assert_eq!(registry.display_name("tlh"), "tlh");
    }

    #[test]
    fn file_names_map_to_locales() {
        assert_eq!(locale_from_file_name("GigaMesh_de.ts").as_deref(), Some("de"));
        assert_eq!(
            locale_from_file_name("GigaMesh_pt_BR.ts").as_deref(),
            Some("pt_BR")
        );
        assert_eq!(locale_from_file_name("GigaMesh_.ts"), None);
        assert_eq!(locale_from_file_name("GigaMesh_de.qm"), None);
        assert_eq!(catalog_file_name("fr"), "GigaMesh_fr.ts");
    }

    #[test]
    fn candidates_walk_up_the_locale() {
        assert_eq!(candidates("de-DE"), vec!["de_DE", "de"]);
        assert_eq!(candidates("de"), vec!["de"]);
        assert!(candidates("").is_empty());
    }

    #[test]
    fn explicit_and_configured_languages_win() {
        assert_eq!(resolve_language(Some("fr_FR.UTF-8"), "de").as_deref(), Some("fr_FR"));
        assert_eq!(resolve_language(None, "de").as_deref(), Some("de"));
    }

    #[test]
    fn directory_catalogs_shadow_embedded_ones() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("GigaMesh_de.ts"), "<TS/>").expect("write de");
        fs::write(dir.path().join("GigaMesh_fr.ts"), "<TS/>").expect("write fr");
        fs::write(dir.path().join("notes.txt"), "x").expect("write other");

        let sources = available_catalogs(Some(dir.path())).expect("discover");
        let locales = sources.iter().map(|s| s.locale.as_str()).collect::<Vec<_>>();
        assert_eq!(locales, vec!["de", "fr"]);
        assert!(matches!(sources[0].origin, CatalogOrigin::File(_)));

        let selected = select_catalog(&sources, "fr_CA").expect("fr fallback");
        assert_eq!(selected.locale, "fr");
        assert!(select_catalog(&sources, "ja").is_none());
    }
}
