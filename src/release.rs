//! Compiled lookup table: the entries a running application may serve.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::catalog::{Catalog, Message, TranslationStatus};
use crate::paths;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseMessage {
    pub context: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub forms: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub messages: Vec<ReleaseMessage>,
}

/// Whether an entry is served at runtime. Vanished entries never are.
pub fn is_servable(message: &Message, include_unfinished: bool) -> bool {
    if !message.has_translation() {
        return false;
    }
    match message.status {
        TranslationStatus::Finished => true,
        TranslationStatus::Unfinished => include_unfinished,
        TranslationStatus::Vanished => false,
    }
}

impl ReleaseTable {
    pub fn compile(catalog: &Catalog, include_unfinished: bool) -> Self {
        let messages = catalog
            .messages()
            .filter(|(_, message)| is_servable(message, include_unfinished))
            .map(|(context, message)| ReleaseMessage {
                context: context.to_string(),
                source: message.source.clone(),
                comment: message.comment.clone(),
                forms: message.forms.clone(),
            })
            .collect();
        ReleaseTable {
            language: catalog.language.clone(),
            messages,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).with_context(|| "failed to serialize release table")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        paths::write_atomic(path, json.as_bytes())
            .with_context(|| format!("failed to write release table: {}", path.display()))?;
        info!(
            "wrote release table ({} messages) to {}",
            self.messages.len(),
            path.display()
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read release table: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse release table: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new(Some("de_DE"));
        let context = catalog.context_mut_or_insert("QGMDockInfo");
        for (source, translation, status) in [
            ("Move Camera", "Kamera bewegen", TranslationStatus::Finished),
            ("Selection", "Auswahl", TranslationStatus::Unfinished),
            ("Move Plane", "", TranslationStatus::Unfinished),
            ("Old", "Alt", TranslationStatus::Vanished),
        ] {
            let mut message = Message::new(source);
            message.set_translation(translation);
            message.status = status;
            context.messages.push(message);
        }
        catalog
    }

    fn sources(table: &ReleaseTable) -> Vec<&str> {
        table.messages.iter().map(|m| m.source.as_str()).collect()
    }

    #[test]
    fn compile_keeps_servable_entries_only() {
        let table = ReleaseTable::compile(&catalog(), true);
        assert_eq!(sources(&table), vec!["Move Camera", "Selection"]);
        assert_eq!(table.language.as_deref(), Some("de_DE"));

        let strict = ReleaseTable::compile(&catalog(), false);
        assert_eq!(sources(&strict), vec!["Move Camera"]);
    }

    #[test]
    fn save_and_load_preserve_the_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("GigaMesh_de.json");
        fs::write(&path, "{\"messages\": [").expect("seed truncated table");
        let table = ReleaseTable::compile(&catalog(), true);
        table.save(&path).expect("save");
        assert_eq!(ReleaseTable::load(&path).expect("load"), table);
        assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 1);
    }
}
