use anyhow::{Context as _, Result};
use quick_xml::escape::escape;
use std::path::Path;
use tracing::info;

use super::{Catalog, Message};
use crate::paths;

const INDENT: &str = "    ";

/// Serializes a catalog in the layout `lupdate` writes.
pub fn write_ts(catalog: &Catalog) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str("<!DOCTYPE TS>\n");
    out.push_str(&format!("<TS version=\"{}\"", escape(&catalog.version)));
    if let Some(language) = catalog.language.as_deref() {
        out.push_str(&format!(" language=\"{}\"", escape(language)));
    }
    if let Some(source_language) = catalog.source_language.as_deref() {
        out.push_str(&format!(" sourcelanguage=\"{}\"", escape(source_language)));
    }
    out.push_str(">\n");

    for context in &catalog.contexts {
        out.push_str("<context>\n");
        push_element(&mut out, 1, "name", &context.name);
        for message in &context.messages {
            write_message(&mut out, message);
        }
        out.push_str("</context>\n");
    }
    out.push_str("</TS>\n");
    out
}

fn write_message(out: &mut String, message: &Message) {
    out.push_str(INDENT);
    if message.numerus {
        out.push_str("<message numerus=\"yes\">\n");
    } else {
        out.push_str("<message>\n");
    }

    for location in &message.locations {
        out.push_str(&INDENT.repeat(2));
        out.push_str(&format!(
            "<location filename=\"{}\"",
            escape(&location.filename)
        ));
        if let Some(line) = location.line {
            out.push_str(&format!(" line=\"{}\"", line));
        }
        out.push_str("/>\n");
    }
    push_element(out, 2, "source", &message.source);
    if let Some(comment) = message.comment.as_deref() {
        push_element(out, 2, "comment", comment);
    }
    if let Some(extra) = message.extra_comment.as_deref() {
        push_element(out, 2, "extracomment", extra);
    }
    if let Some(note) = message.translator_comment.as_deref() {
        push_element(out, 2, "translatorcomment", note);
    }

    out.push_str(&INDENT.repeat(2));
    out.push_str("<translation");
    if let Some(kind) = message.status.type_attr() {
        out.push_str(&format!(" type=\"{}\"", kind));
    }
    out.push('>');
    if message.numerus {
        out.push('\n');
        for form in &message.forms {
            push_element(out, 3, "numerusform", form);
        }
        out.push_str(&INDENT.repeat(2));
    } else {
        out.push_str(&escape_text(message.translation()));
    }
    out.push_str("</translation>\n");

    out.push_str(INDENT);
    out.push_str("</message>\n");
}

fn push_element(out: &mut String, depth: usize, name: &str, text: &str) {
    out.push_str(&INDENT.repeat(depth));
    out.push_str(&format!("<{name}>{}</{name}>\n", escape_text(text)));
}

/// Escapes element text. Control characters other than tab, newline and
/// carriage return are not allowed in XML and become `<byte value="xN"/>`.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut start = 0;
    for (index, ch) in text.char_indices() {
        if (ch as u32) < 0x20 && !matches!(ch, '\t' | '\n' | '\r') {
            out.push_str(&escape(&text[start..index]));
            out.push_str(&format!("<byte value=\"x{:x}\"/>", ch as u32));
            start = index + ch.len_utf8();
        }
    }
    out.push_str(&escape(&text[start..]));
    out
}

/// Writes the catalog to `path` through a temporary file in the same directory.
pub fn save_ts(catalog: &Catalog, path: &Path) -> Result<()> {
    paths::write_atomic(path, write_ts(catalog).as_bytes())
        .with_context(|| format!("failed to save catalog: {}", path.display()))?;
    info!(
        "saved catalog ({} messages) to {}",
        catalog.message_count(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Location, TranslationStatus, parse_ts};
    use std::fs;

    #[test]
    fn writes_lupdate_layout() {
        let mut catalog = Catalog::new(Some("de_DE"));
        let context = catalog.context_mut_or_insert("QGMDialogRuler");
        let mut message = Message::new("Length: \"%1\" mm");
        message
            .locations
            .push(Location::new("../QGMDialogRuler.cpp", Some(42)));
        message.set_translation("Länge: \"%1\" mm");
        message.status = TranslationStatus::Finished;
        context.messages.push(message);
        context.messages.push(Message::new("Ruler"));

        let expected = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<!DOCTYPE TS>\n\
<TS version=\"2.1\" language=\"de_DE\">\n\
<context>\n    <name>QGMDialogRuler</name>\n    <message>\n        \
<location filename=\"../QGMDialogRuler.cpp\" line=\"42\"/>\n        \
<source>Length: &quot;%1&quot; mm</source>\n        \
<translation>Länge: &quot;%1&quot; mm</translation>\n    </message>\n    \
<message>\n        <source>Ruler</source>\n        \
<translation type=\"unfinished\"></translation>\n    </message>\n\
</context>\n</TS>\n";
        assert_eq!(write_ts(&catalog), expected);
    }

    #[test]
    fn numerus_messages_survive_a_round_trip() {
        let mut catalog = Catalog::new(Some("de_DE"));
        let mut message = Message::new("%n faces");
        message.numerus = true;
        message.forms = vec!["%n Fläche".to_string(), "%n Flächen".to_string()];
        message.status = TranslationStatus::Finished;
        message.comment = Some("status <bar>".to_string());
        catalog
            .context_mut_or_insert("MeshQt")
            .messages
            .push(message);

        let written = write_ts(&catalog);
        assert!(written.contains("<message numerus=\"yes\">"));
        assert!(written.contains("<comment>status &lt;bar&gt;</comment>"));
        assert_eq!(parse_ts(&written).expect("reparse"), catalog);
    }

    #[test]
    fn control_characters_round_trip_as_byte_elements() {
        let xml = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<!DOCTYPE TS>\n\
<TS version=\"2.1\" language=\"de_DE\">\n\
<context>\n    <name>MeshQt</name>\n    <message>\n        \
<source>Beep<byte value=\"x7\"/>\tdone &amp; gone</source>\n        \
<translation>Piep<byte value=\"x7\"/>\tfertig</translation>\n    </message>\n\
</context>\n</TS>\n";
        let catalog = parse_ts(xml).expect("parse");
        let message = &catalog.contexts[0].messages[0];
        assert_eq!(message.source, "Beep\u{7}\tdone & gone");
        assert_eq!(message.translation(), "Piep\u{7}\tfertig");
        assert_eq!(write_ts(&catalog), xml);
    }

    #[test]
    fn save_ts_replaces_the_target_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("GigaMesh_de.ts");
        fs::write(&path, "stale").expect("seed file");

        let catalog = Catalog::new(Some("de_DE"));
        save_ts(&catalog, &path).expect("save");
        let saved = fs::read_to_string(&path).expect("read back");
        assert!(saved.starts_with("<?xml"));
        assert!(saved.ends_with("</TS>\n"));
    }
}
