use std::collections::HashMap;

use crate::catalog::Catalog;
use crate::languages::plural;
use crate::placeholders;
use crate::release::ReleaseTable;

type Key = (String, String, String);

/// Immutable runtime lookup over a compiled catalog.
///
/// Misses fall back to the source text, so an untranslated string shows up in
/// English rather than empty.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    language: Option<String>,
    entries: HashMap<Key, Vec<String>>,
}

impl Translator {
    pub fn from_catalog(catalog: &Catalog, include_unfinished: bool) -> Self {
        Self::from_release(&ReleaseTable::compile(catalog, include_unfinished))
    }

    pub fn from_release(table: &ReleaseTable) -> Self {
        let mut entries = HashMap::with_capacity(table.messages.len());
        for message in &table.messages {
            entries.insert(
                (
                    message.context.clone(),
                    message.source.clone(),
                    message.comment.clone().unwrap_or_default(),
                ),
                message.forms.clone(),
            );
        }
        Self {
            language: table.language.clone(),
            entries,
        }
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn forms(&self, context: &str, source: &str, comment: Option<&str>) -> Option<&[String]> {
        let comment = comment.unwrap_or("");
        let exact = (context.to_string(), source.to_string(), comment.to_string());
        if let Some(forms) = self.entries.get(&exact) {
            return Some(forms.as_slice());
        }
        if comment.is_empty() {
            return None;
        }
        let fallback = (context.to_string(), source.to_string(), String::new());
        self.entries.get(&fallback).map(Vec::as_slice)
    }

    /// The stored translation, if any.
    pub fn lookup(&self, context: &str, source: &str, comment: Option<&str>) -> Option<&str> {
        self.forms(context, source, comment)?
            .first()
            .map(String::as_str)
            .filter(|text| !text.is_empty())
    }

    pub fn translate<'a>(&'a self, context: &str, source: &'a str, comment: Option<&str>) -> &'a str {
        self.lookup(context, source, comment).unwrap_or(source)
    }

    /// Translates and fills `%1`, `%2`, ... with `args`.
    pub fn translate_args(
        &self,
        context: &str,
        source: &str,
        comment: Option<&str>,
        args: &[&str],
    ) -> String {
        placeholders::substitute(self.translate(context, source, comment), args)
    }

    /// Picks the plural form for `count` and fills in `%n`.
    pub fn translate_plural(
        &self,
        context: &str,
        source: &str,
        comment: Option<&str>,
        count: i64,
    ) -> String {
        let language = self.language.as_deref().unwrap_or("en");
        let text = self
            .forms(context, source, comment)
            .and_then(|forms| {
                let index = plural::form_index(language, count).min(forms.len().saturating_sub(1));
                forms.get(index)
            })
            .map(String::as_str)
            .filter(|text| !text.is_empty())
            .unwrap_or(source);
        placeholders::replace_count(text, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Message, TranslationStatus};

    fn translator() -> Translator {
        let mut catalog = Catalog::new(Some("de_DE"));
        let context = catalog.context_mut_or_insert("MeshQt");

        let mut open = Message::new("Open");
        open.set_translation("Öffnen");
        open.status = TranslationStatus::Finished;
        context.messages.push(open);

        let mut verb = Message::new("Open").with_comment(Some("state"));
        verb.set_translation("Offen");
        verb.status = TranslationStatus::Finished;
        context.messages.push(verb);

        let mut matrix = Message::new("%1 of %2 elements were entered!");
        matrix.set_translation("%2 Elemente erwartet, %1 eingegeben!");
        matrix.status = TranslationStatus::Finished;
        context.messages.push(matrix);

        let mut faces = Message::new("%n faces");
        faces.numerus = true;
        faces.forms = vec!["%n Fläche".to_string(), "%n Flächen".to_string()];
        faces.status = TranslationStatus::Finished;
        context.messages.push(faces);

        let mut gone = Message::new("Gone");
        gone.set_translation("Weg");
        gone.status = TranslationStatus::Vanished;
        context.messages.push(gone);

        Translator::from_catalog(&catalog, true)
    }

    #[test]
    fn translator_can_be_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Translator>();
    }

    #[test]
    fn translate_uses_comment_then_falls_back() {
        let translator = translator();
        assert_eq!(translator.translate("MeshQt", "Open", None), "Öffnen");
        assert_eq!(translator.translate("MeshQt", "Open", Some("state")), "Offen");
        assert_eq!(translator.translate("MeshQt", "Open", Some("menu")), "Öffnen");
        assert_eq!(translator.translate("MainWindow", "Open", None), "Open");
    }

    #[test]
    fn vanished_entries_are_not_served() {
        let translator = translator();
        assert_eq!(translator.lookup("MeshQt", "Gone", None), None);
        assert_eq!(translator.translate("MeshQt", "Gone", None), "Gone");
        assert_eq!(translator.len(), 4);
    }

    #[test]
    fn translate_args_follows_marker_numbers() {
        let translator = translator();
        assert_eq!(
            translator.translate_args("MeshQt", "%1 of %2 elements were entered!", None, &["7", "16"]),
            "16 Elemente erwartet, 7 eingegeben!"
        );
    }

    #[test]
    fn translate_plural_picks_german_forms() {
        let translator = translator();
        assert_eq!(translator.translate_plural("MeshQt", "%n faces", None, 1), "1 Fläche");
        assert_eq!(translator.translate_plural("MeshQt", "%n faces", None, 3), "3 Flächen");
        assert_eq!(
            translator.translate_plural("MeshQt", "%n edges", None, 2),
            "2 edges"
        );
    }
}
