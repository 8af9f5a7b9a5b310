//! In-memory model of a Qt Linguist translation catalog.
//!
//! A [`Catalog`] holds [`Context`] blocks in document order; each context holds
//! its [`Message`] entries. Messages are keyed by `(context, source, comment)`.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

mod reader;
mod writer;

pub use reader::parse_ts;
pub use writer::{save_ts, write_ts};

pub const TS_VERSION: &str = "2.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationStatus {
    Finished,
    #[default]
    Unfinished,
    Vanished,
}

impl TranslationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationStatus::Finished => "finished",
            TranslationStatus::Unfinished => "unfinished",
            TranslationStatus::Vanished => "vanished",
        }
    }

    /// Parses a status name as accepted on the command line.
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "finished" | "done" => Ok(TranslationStatus::Finished),
            "unfinished" | "pending" => Ok(TranslationStatus::Unfinished),
            "vanished" | "obsolete" => Ok(TranslationStatus::Vanished),
            other => Err(anyhow!(
                "unknown translation status '{}' (expected finished, unfinished or vanished)",
                other
            )),
        }
    }

    /// Maps the `type` attribute of a `<translation>` element.
    pub(crate) fn from_type_attr(value: Option<&str>) -> Result<Self> {
        match value {
            None | Some("") => Ok(TranslationStatus::Finished),
            Some("unfinished") => Ok(TranslationStatus::Unfinished),
            Some("vanished") | Some("obsolete") => Ok(TranslationStatus::Vanished),
            Some(other) => Err(anyhow!("unknown translation type '{}'", other)),
        }
    }

    pub(crate) fn type_attr(&self) -> Option<&'static str> {
        match self {
            TranslationStatus::Finished => None,
            TranslationStatus::Unfinished => Some("unfinished"),
            TranslationStatus::Vanished => Some("vanished"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Location {
    pub fn new(filename: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            filename: filename.into(),
            line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Message {
    pub source: String,
    /// Disambiguation comment; part of the lookup key.
    pub comment: Option<String>,
    pub extra_comment: Option<String>,
    pub translator_comment: Option<String>,
    pub locations: Vec<Location>,
    pub numerus: bool,
    /// Translation text, one entry per plural form for numerus messages.
    pub forms: Vec<String>,
    pub status: TranslationStatus,
}

impl Message {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            forms: vec![String::new()],
            ..Self::default()
        }
    }

    pub fn with_comment(mut self, comment: Option<&str>) -> Self {
        self.comment = normalize_comment(comment).map(str::to_string);
        self
    }

    pub fn disambiguation(&self) -> &str {
        self.comment.as_deref().unwrap_or("")
    }

    /// The singular (or only) translation form.
    pub fn translation(&self) -> &str {
        self.forms.first().map(String::as_str).unwrap_or("")
    }

    pub fn has_translation(&self) -> bool {
        self.forms.iter().any(|form| !form.is_empty())
    }

    pub fn set_translation(&mut self, text: impl Into<String>) {
        let text = text.into();
        match self.forms.first_mut() {
            Some(first) => *first = text,
            None => self.forms.push(text),
        }
    }

    pub(crate) fn matches(&self, source: &str, comment: Option<&str>) -> bool {
        self.source == source && self.disambiguation() == normalize_comment(comment).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Context {
    pub name: String,
    pub messages: Vec<Message>,
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages: Vec::new(),
        }
    }

    pub fn find(&self, source: &str, comment: Option<&str>) -> Option<&Message> {
        self.messages
            .iter()
            .find(|message| message.matches(source, comment))
    }

    pub fn find_mut(&mut self, source: &str, comment: Option<&str>) -> Option<&mut Message> {
        self.messages
            .iter_mut()
            .find(|message| message.matches(source, comment))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    pub version: String,
    pub language: Option<String>,
    pub source_language: Option<String>,
    pub contexts: Vec<Context>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            version: TS_VERSION.to_string(),
            language: None,
            source_language: None,
            contexts: Vec::new(),
        }
    }
}

impl Catalog {
    pub fn new(language: Option<&str>) -> Self {
        Self {
            language: language.map(str::to_string),
            ..Self::default()
        }
    }

    /// Language part of the catalog locale: `de_DE` becomes `de`.
    pub fn language_code(&self) -> Option<String> {
        let language = self.language.as_deref()?.trim();
        let base = language.split(['_', '-']).next().unwrap_or(language);
        if base.is_empty() {
            None
        } else {
            Some(base.to_lowercase())
        }
    }

    pub fn context(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|context| context.name == name)
    }

    /// Returns the named context, appending an empty one when it is missing.
    pub fn context_mut_or_insert(&mut self, name: &str) -> &mut Context {
        let index = match self.contexts.iter().position(|context| context.name == name) {
            Some(index) => index,
            None => {
                self.contexts.push(Context::new(name));
                self.contexts.len() - 1
            }
        };
        &mut self.contexts[index]
    }

    pub fn find(&self, context: &str, source: &str, comment: Option<&str>) -> Option<&Message> {
        self.context(context)?.find(source, comment)
    }

    pub fn find_mut(
        &mut self,
        context: &str,
        source: &str,
        comment: Option<&str>,
    ) -> Option<&mut Message> {
        self.contexts
            .iter_mut()
            .find(|entry| entry.name == context)?
            .find_mut(source, comment)
    }

    /// Iterates `(context name, message)` pairs in document order.
    pub fn messages(&self) -> impl Iterator<Item = (&str, &Message)> {
        self.contexts.iter().flat_map(|context| {
            context
                .messages
                .iter()
                .map(move |message| (context.name.as_str(), message))
        })
    }

    pub fn message_count(&self) -> usize {
        self.contexts
            .iter()
            .map(|context| context.messages.len())
            .sum()
    }

    pub fn count_by_status(&self, status: TranslationStatus) -> usize {
        self.messages()
            .filter(|(_, message)| message.status == status)
            .count()
    }

    /// Sorts contexts by name, the order `lupdate` writes them in.
    pub fn sort_contexts(&mut self) {
        self.contexts.sort_by(|left, right| left.name.cmp(&right.name));
    }

    /// Records a translator's update of one entry.
    pub fn set_translation(
        &mut self,
        context: &str,
        source: &str,
        comment: Option<&str>,
        text: &str,
        status: TranslationStatus,
    ) -> Result<()> {
        if status == TranslationStatus::Vanished {
            return Err(anyhow!(
                "a translation cannot be set as vanished; vanished entries are produced by merge"
            ));
        }
        let message = self.find_mut(context, source, comment).ok_or_else(|| {
            anyhow!(
                "no entry for source '{}' in context '{}'",
                source,
                context
            )
        })?;
        if message.status == TranslationStatus::Vanished {
            return Err(anyhow!(
                "entry '{}' in context '{}' is vanished and can no longer be translated",
                source,
                context
            ));
        }
        message.set_translation(text);
        message.status = status;
        Ok(())
    }
}

pub(crate) fn normalize_comment(comment: Option<&str>) -> Option<&str> {
    comment.filter(|value| !value.is_empty())
}
