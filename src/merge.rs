//! Brings a catalog in line with the strings the application currently uses.
//!
//! New strings are added unfinished. Strings that disappeared are marked
//! vanished and keep their translation; vanished strings that come back are
//! revived as unfinished. Only entries that never carried a translation are
//! dropped when they disappear.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::catalog::{Catalog, Location, Message, TranslationStatus, normalize_comment};
use crate::languages::plural;

/// One UI string currently referenced by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceString {
    pub context: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_comment: Option<String>,
    #[serde(default)]
    pub numerus: bool,
    #[serde(default)]
    pub locations: Vec<Location>,
}

pub fn load_source_strings(path: &Path) -> Result<Vec<SourceString>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read source strings: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse source strings: {}", path.display()))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// Drop vanished entries instead of keeping them as history.
    pub drop_vanished: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub added: usize,
    pub kept: usize,
    pub revived: usize,
    pub vanished: usize,
    pub removed: usize,
}

impl MergeSummary {
    pub fn render_text(&self) -> String {
        format!(
            "added {}, kept {}, revived {}, vanished {}, removed {}",
            self.added, self.kept, self.revived, self.vanished, self.removed
        )
    }
}

type Key = (String, String, String);

fn key(context: &str, source: &str, comment: Option<&str>) -> Key {
    (
        context.to_string(),
        source.to_string(),
        normalize_comment(comment).unwrap_or("").to_string(),
    )
}

pub fn merge(catalog: &mut Catalog, strings: &[SourceString], options: MergeOptions) -> MergeSummary {
    let incoming = collapse(strings);
    let mut index = HashMap::new();
    for (position, string) in incoming.iter().enumerate() {
        index.insert(
            key(&string.context, &string.source, string.comment.as_deref()),
            position,
        );
    }
    let mut matched = vec![false; incoming.len()];
    let mut summary = MergeSummary::default();
    let forms = catalog
        .language
        .as_deref()
        .map(plural::form_count)
        .unwrap_or(2);

    for context in &mut catalog.contexts {
        let name = context.name.clone();
        context.messages.retain_mut(|message| {
            let lookup = key(&name, &message.source, message.comment.as_deref());
            match index.get(&lookup) {
                Some(&position) if !matched[position] => {
                    matched[position] = true;
                    let string = &incoming[position];
                    message.locations = string.locations.clone();
                    if string.extra_comment.is_some() {
                        message.extra_comment = string.extra_comment.clone();
                    }
                    if message.numerus != string.numerus {
                        set_numerus(message, string.numerus, forms);
                        if string.numerus && message.status == TranslationStatus::Finished {
                            message.status = TranslationStatus::Unfinished;
                        }
                    }
                    if message.status == TranslationStatus::Vanished {
                        message.status = TranslationStatus::Unfinished;
                        summary.revived += 1;
                    } else {
                        summary.kept += 1;
                    }
                    true
                }
                _ => retire(message, options, &mut summary),
            }
        });
    }

    for (position, string) in incoming.iter().enumerate() {
        if matched[position] {
            continue;
        }
        let mut message = Message::new(string.source.as_str()).with_comment(string.comment.as_deref());
        message.extra_comment = string.extra_comment.clone();
        message.locations = string.locations.clone();
        if string.numerus {
            message.numerus = true;
            message.forms = vec![String::new(); forms];
        }
        debug!("new string in {}: {:?}", string.context, string.source);
        catalog
            .context_mut_or_insert(&string.context)
            .messages
            .push(message);
        summary.added += 1;
    }

    catalog.contexts.retain(|context| !context.messages.is_empty());
    catalog.sort_contexts();
    info!("merged catalog: {}", summary.render_text());
    summary
}

/// Switches an entry between singular and plural. The first form is kept as
/// the singular; plural entries get one form per plural category.
fn set_numerus(message: &mut Message, numerus: bool, forms: usize) {
    message.numerus = numerus;
    let len = if numerus { forms.max(1) } else { 1 };
    message.forms.resize(len, String::new());
}

/// Handles an entry whose string is gone. Returns whether it stays.
fn retire(message: &mut Message, options: MergeOptions, summary: &mut MergeSummary) -> bool {
    if message.status == TranslationStatus::Vanished {
        if options.drop_vanished {
            summary.removed += 1;
            return false;
        }
        return true;
    }
    if !message.has_translation() || options.drop_vanished {
        summary.removed += 1;
        return false;
    }
    message.status = TranslationStatus::Vanished;
    message.locations.clear();
    summary.vanished += 1;
    true
}

/// Joins repeated `(context, source, comment)` strings into one entry holding
/// every location.
fn collapse(strings: &[SourceString]) -> Vec<SourceString> {
    let mut out: Vec<SourceString> = Vec::new();
    let mut positions: HashMap<Key, usize> = HashMap::new();
    for string in strings {
        let lookup = key(&string.context, &string.source, string.comment.as_deref());
        match positions.get(&lookup) {
            Some(&position) => {
                let existing = &mut out[position];
                for location in &string.locations {
                    if !existing.locations.contains(location) {
                        existing.locations.push(location.clone());
                    }
                }
                existing.numerus |= string.numerus;
            }
            None => {
                positions.insert(lookup, out.len());
                out.push(string.clone());
            }
        }
    }
    out
}
