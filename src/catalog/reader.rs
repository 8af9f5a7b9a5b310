use anyhow::{Context as _, Result, anyhow};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use tracing::debug;

use super::{Catalog, Context, Location, Message, TranslationStatus};

/// Parses a TS document.
pub fn parse_ts(xml: &str) -> Result<Catalog> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut state = ParseState::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => state.start(&e)?,
            Ok(Event::Empty(e)) => {
                state.start(&e)?;
                state.end()?;
            }
            Ok(Event::End(_)) => state.end()?,
            Ok(Event::Text(e)) => {
                if state.capturing() {
                    let text = e
                        .unescape()
                        .with_context(|| "failed to unescape TS text")?;
                    state.push_text(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if state.capturing() {
                    let raw = e.into_inner();
                    state.push_text(&String::from_utf8_lossy(raw.as_ref()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(anyhow!(
                    "failed to parse TS xml at byte {}: {}",
                    reader.buffer_position(),
                    err
                ));
            }
        }
        buf.clear();
    }

    let catalog = state.finish()?;
    debug!(
        "parsed TS catalog: {} contexts, {} messages",
        catalog.contexts.len(),
        catalog.message_count()
    );
    Ok(catalog)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    ContextName,
    Source,
    Comment,
    ExtraComment,
    TranslatorComment,
    Translation,
    NumerusForm,
    Ignored,
}

#[derive(Default)]
struct ParseState {
    stack: Vec<String>,
    catalog: Option<Catalog>,
    context: Option<Context>,
    message: Option<Message>,
    /// Field being collected and the stack depth of the element that owns it.
    capture: Option<(Field, usize, String)>,
    saw_source: bool,
    /// Last absolute line per file, for relative `line="+N"` locations.
    last_lines: HashMap<String, i64>,
    last_file: Option<String>,
}

impl ParseState {
    fn capturing(&self) -> bool {
        self.capture.is_some()
    }

    fn push_text(&mut self, text: &str) {
        if let Some((_, _, buffer)) = self.capture.as_mut() {
            buffer.push_str(text);
        }
    }

    fn start(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let parent = self.stack.last().map(String::as_str);

        match (parent, name.as_str()) {
            (None, "TS") => {
                if self.catalog.is_some() {
                    return Err(anyhow!("TS document has more than one root element"));
                }
                let attrs = attributes(e)?;
                let mut catalog = Catalog::default();
                if let Some(version) = attrs.get("version") {
                    catalog.version = version.clone();
                }
                catalog.language = attrs.get("language").cloned().filter(|v| !v.is_empty());
                catalog.source_language = attrs
                    .get("sourcelanguage")
                    .cloned()
                    .filter(|v| !v.is_empty());
                self.catalog = Some(catalog);
            }
            (None, other) => {
                return Err(anyhow!(
                    "not a TS document (root element <{}>, expected <TS>)",
                    other
                ));
            }
            (Some("TS"), "context") => {
                self.context = Some(Context::new(""));
            }
            (Some("context"), "name") => self.begin_capture(Field::ContextName),
            (Some("context"), "message") => {
                let attrs = attributes(e)?;
                let mut message = Message::new("");
                message.numerus = attrs.get("numerus").map(String::as_str) == Some("yes");
                self.message = Some(message);
                self.saw_source = false;
            }
            (Some("message"), "location") => {
                let attrs = attributes(e)?;
                let location = self.resolve_location(&attrs)?;
                if let Some(message) = self.message.as_mut() {
                    message.locations.push(location);
                }
            }
            (Some("message"), "source") => {
                self.saw_source = true;
                self.begin_capture(Field::Source)
            }
            (Some("message"), "comment") => self.begin_capture(Field::Comment),
            (Some("message"), "extracomment") => self.begin_capture(Field::ExtraComment),
            (Some("message"), "translatorcomment") => {
                self.begin_capture(Field::TranslatorComment)
            }
            (Some("message"), "translation") => {
                let attrs = attributes(e)?;
                let status =
                    TranslationStatus::from_type_attr(attrs.get("type").map(String::as_str))?;
                let numerus = match self.message.as_mut() {
                    Some(message) => {
                        message.status = status;
                        message.forms.clear();
                        message.numerus
                    }
                    None => false,
                };
                if !numerus {
                    self.begin_capture(Field::Translation);
                }
            }
            (Some("translation"), "numerusform") => self.begin_capture(Field::NumerusForm),
            (Some(_), "byte") if self.capturing() => {
                let attrs = attributes(e)?;
                let value = attrs
                    .get("value")
                    .ok_or_else(|| anyhow!("<byte> element without a value"))?;
                self.push_text(&decode_byte(value)?.to_string());
            }
            _ => {
                // oldsource, oldcomment, userdata, ... carry nothing we keep.
                if !self.capturing() {
                    self.begin_capture(Field::Ignored);
                }
            }
        }

        self.stack.push(name);
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let Some(name) = self.stack.pop() else {
            return Err(anyhow!("unbalanced closing tag in TS document"));
        };

        let owns_capture = matches!(&self.capture, Some((_, depth, _)) if *depth == self.stack.len());
        if owns_capture {
            if let Some((field, _, text)) = self.capture.take() {
                self.store(field, text);
            }
        }

        match name.as_str() {
            "message" if self.stack.last().map(String::as_str) == Some("context") => {
                let message = self
                    .message
                    .take()
                    .ok_or_else(|| anyhow!("message closed without being opened"))?;
                if !self.saw_source {
                    return Err(anyhow!("message without a <source> element"));
                }
                let context = self
                    .context
                    .as_mut()
                    .ok_or_else(|| anyhow!("message outside of a context"))?;
                context.messages.push(message);
            }
            "context" if self.stack.last().map(String::as_str) == Some("TS") => {
                let context = self
                    .context
                    .take()
                    .ok_or_else(|| anyhow!("context closed without being opened"))?;
                if context.name.is_empty() {
                    return Err(anyhow!("context without a <name> element"));
                }
                if let Some(catalog) = self.catalog.as_mut() {
                    catalog.contexts.push(context);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<Catalog> {
        if let Some(open) = self.stack.last() {
            return Err(anyhow!("TS document ends inside <{}>", open));
        }
        self.catalog
            .ok_or_else(|| anyhow!("TS document has no <TS> root element"))
    }

    fn begin_capture(&mut self, field: Field) {
        self.capture = Some((field, self.stack.len(), String::new()));
    }

    fn store(&mut self, field: Field, text: String) {
        match field {
            Field::ContextName => {
                if let Some(context) = self.context.as_mut() {
                    context.name = text;
                }
            }
            Field::Ignored => {}
            _ => {
                let Some(message) = self.message.as_mut() else {
                    return;
                };
                match field {
                    Field::Source => message.source = text,
                    Field::Comment => message.comment = Some(text).filter(|v| !v.is_empty()),
                    Field::ExtraComment => {
                        message.extra_comment = Some(text).filter(|v| !v.is_empty())
                    }
                    Field::TranslatorComment => {
                        message.translator_comment = Some(text).filter(|v| !v.is_empty())
                    }
                    Field::Translation | Field::NumerusForm => message.forms.push(text),
                    Field::ContextName | Field::Ignored => {}
                }
            }
        }
    }

    fn resolve_location(&mut self, attrs: &HashMap<String, String>) -> Result<Location> {
        let filename = match attrs.get("filename").filter(|v| !v.is_empty()) {
            Some(filename) => filename.clone(),
            None => self
                .last_file
                .clone()
                .ok_or_else(|| anyhow!("location without filename and no previous file"))?,
        };
        self.last_file = Some(filename.clone());

        let line = match attrs.get("line").map(|v| v.trim()).filter(|v| !v.is_empty()) {
            None => None,
            Some(raw) => {
                let previous = self.last_lines.get(&filename).copied().unwrap_or(0);
                let absolute = if let Some(delta) = raw.strip_prefix('+') {
                    previous + parse_line(delta, raw)?
                } else if raw.starts_with('-') {
                    previous + parse_line(raw, raw)?
                } else {
                    parse_line(raw, raw)?
                };
                self.last_lines.insert(filename.clone(), absolute);
                Some(u32::try_from(absolute).map_err(|_| {
                    anyhow!("location line {} in {} is out of range", absolute, filename)
                })?)
            }
        };
        Ok(Location { filename, line })
    }
}

fn parse_line(value: &str, raw: &str) -> Result<i64> {
    value
        .parse::<i64>()
        .map_err(|_| anyhow!("invalid location line '{}'", raw))
}

/// `<byte value="x9"/>` is hexadecimal, `<byte value="9"/>` decimal.
fn decode_byte(value: &str) -> Result<char> {
    let value = value.trim();
    let code = match value.strip_prefix('x').or_else(|| value.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse::<u32>(),
    }
    .map_err(|_| anyhow!("invalid <byte> value '{}'", value))?;
    char::from_u32(code).ok_or_else(|| anyhow!("<byte> value '{}' is not a character", value))
}

fn attributes(e: &BytesStart<'_>) -> Result<HashMap<String, String>> {
    let mut out = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.with_context(|| "malformed attribute in TS document")?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .with_context(|| format!("failed to unescape attribute '{}'", key))?
            .into_owned();
        out.insert(key, value);
    }
    Ok(out)
}
