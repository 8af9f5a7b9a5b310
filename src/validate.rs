//! Consistency checks over a catalog.
//!
//! Placeholder set mismatches, duplicate keys and empty finished entries are
//! errors. Accelerator, punctuation, whitespace, marker order and plural form
//! count differences are warnings.

use serde::Serialize;
use std::collections::HashSet;

use crate::catalog::{Catalog, Location, Message, TranslationStatus};
use crate::languages::plural;
use crate::placeholders;
use crate::settings::CheckSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    DuplicateEntry,
    EmptyTranslation,
    MissingPlaceholder,
    ExtraPlaceholder,
    PlaceholderOrder,
    CountMarker,
    NumerusForms,
    Accelerator,
    Punctuation,
    Whitespace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub kind: FindingKind,
    pub context: String,
    pub source: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
    pub errors: usize,
    pub warnings: usize,
}

impl ValidationReport {
    fn push(&mut self, finding: Finding) {
        match finding.severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
        }
        self.findings.push(finding);
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn render_text(&self) -> String {
        let mut lines = Vec::new();
        for finding in &self.findings {
            let location = finding
                .location
                .as_ref()
                .map(|location| match location.line {
                    Some(line) => format!("{}:{}", location.filename, line),
                    None => location.filename.clone(),
                })
                .unwrap_or_else(|| "-".to_string());
            lines.push(format!(
                "{}\t{}\t{}\t{}\t{:?}\t{}",
                finding.severity.as_str(),
                location,
                finding.context,
                kind_label(finding.kind),
                truncate(&finding.source, 60),
                finding.detail
            ));
        }
        lines.push(format!(
            "{} error(s), {} warning(s)",
            self.errors, self.warnings
        ));
        lines.join("\n")
    }
}

fn kind_label(kind: FindingKind) -> &'static str {
    match kind {
        FindingKind::DuplicateEntry => "duplicate-entry",
        FindingKind::EmptyTranslation => "empty-translation",
        FindingKind::MissingPlaceholder => "missing-placeholder",
        FindingKind::ExtraPlaceholder => "extra-placeholder",
        FindingKind::PlaceholderOrder => "placeholder-order",
        FindingKind::CountMarker => "count-marker",
        FindingKind::NumerusForms => "numerus-forms",
        FindingKind::Accelerator => "accelerator",
        FindingKind::Punctuation => "punctuation",
        FindingKind::Whitespace => "whitespace",
    }
}

pub fn validate(catalog: &Catalog, checks: &CheckSettings) -> ValidationReport {
    let mut report = ValidationReport::default();
    let language = catalog.language.as_deref();

    for context in &catalog.contexts {
        let mut seen = HashSet::new();
        for message in &context.messages {
            let reporter = Reporter {
                context: &context.name,
                message,
            };
            if !seen.insert((message.source.as_str(), message.disambiguation())) {
                report.push(reporter.finding(
                    Severity::Error,
                    FindingKind::DuplicateEntry,
                    "source text appears more than once in this context".to_string(),
                ));
            }
            check_message(&mut report, &reporter, checks, language);
        }
    }
    report
}

struct Reporter<'a> {
    context: &'a str,
    message: &'a Message,
}

impl Reporter<'_> {
    fn finding(&self, severity: Severity, kind: FindingKind, detail: String) -> Finding {
        Finding {
            severity,
            kind,
            context: self.context.to_string(),
            source: self.message.source.clone(),
            detail,
            location: self.message.locations.first().cloned(),
        }
    }
}

fn check_message(
    report: &mut ValidationReport,
    reporter: &Reporter<'_>,
    checks: &CheckSettings,
    language: Option<&str>,
) {
    let message = reporter.message;
    if message.status == TranslationStatus::Unfinished {
        return;
    }
    if !message.has_translation() {
        if message.status == TranslationStatus::Finished {
            report.push(reporter.finding(
                Severity::Error,
                FindingKind::EmptyTranslation,
                "marked finished but has no translation".to_string(),
            ));
        }
        return;
    }

    if message.numerus {
        if let Some(language) = language {
            let expected = plural::form_count(language);
            if message.forms.len() != expected {
                report.push(reporter.finding(
                    Severity::Warning,
                    FindingKind::NumerusForms,
                    format!(
                        "{} plural form(s) given, {} expected for {}",
                        message.forms.len(),
                        expected,
                        language
                    ),
                ));
            }
        }
    }

    for (index, form) in message.forms.iter().enumerate() {
        if form.is_empty() {
            continue;
        }
        let prefix = if message.numerus {
            format!("form {}: ", index)
        } else {
            String::new()
        };
        check_form(report, reporter, checks, form, &prefix);
    }
}

fn check_form(
    report: &mut ValidationReport,
    reporter: &Reporter<'_>,
    checks: &CheckSettings,
    translation: &str,
    prefix: &str,
) {
    let source = reporter.message.source.as_str();

    let diff = placeholders::compare(source, translation);
    if !diff.missing.is_empty() {
        report.push(reporter.finding(
            Severity::Error,
            FindingKind::MissingPlaceholder,
            format!("{}translation lacks {}", prefix, markers(&diff.missing)),
        ));
    }
    if !diff.extra.is_empty() {
        report.push(reporter.finding(
            Severity::Error,
            FindingKind::ExtraPlaceholder,
            format!("{}translation adds {}", prefix, markers(&diff.extra)),
        ));
    }
    if diff.reordered && checks.placeholder_order {
        report.push(reporter.finding(
            Severity::Warning,
            FindingKind::PlaceholderOrder,
            format!("{}place markers appear in a different order", prefix),
        ));
    }
    if reporter.message.numerus
        && placeholders::has_count_marker(source)
        && !placeholders::has_count_marker(translation)
    {
        report.push(reporter.finding(
            Severity::Warning,
            FindingKind::CountMarker,
            format!("{}translation does not show the count (%n)", prefix),
        ));
    }

    if checks.accelerators && !is_rich_text(source) {
        let in_source = has_accelerator(source);
        if in_source != has_accelerator(translation) {
            let detail = if in_source {
                "accelerator (&) missing in translation"
            } else {
                "translation adds an accelerator (&)"
            };
            report.push(reporter.finding(
                Severity::Warning,
                FindingKind::Accelerator,
                format!("{}{}", prefix, detail),
            ));
        }
    }

    if checks.punctuation && !is_rich_text(source) {
        let expected = ending_punctuation(source);
        let actual = ending_punctuation(translation);
        if expected != actual {
            report.push(reporter.finding(
                Severity::Warning,
                FindingKind::Punctuation,
                format!(
                    "{}ends with {} instead of {}",
                    prefix,
                    describe_ending(actual),
                    describe_ending(expected)
                ),
            ));
        }
    }

    if checks.whitespace {
        let leading = |text: &str| text.starts_with(char::is_whitespace);
        let trailing = |text: &str| text.ends_with(char::is_whitespace);
        if leading(source) != leading(translation) || trailing(source) != trailing(translation) {
            report.push(reporter.finding(
                Severity::Warning,
                FindingKind::Whitespace,
                format!("{}surrounding whitespace differs from the source", prefix),
            ));
        }
    }
}

fn markers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|number| format!("%{}", number))
        .collect::<Vec<_>>()
        .join(", ")
}

/// True for a mnemonic `&x`; `&&` is a literal ampersand and `&name;` an entity.
pub fn has_accelerator(text: &str) -> bool {
    let chars = text.chars().collect::<Vec<_>>();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '&' {
            i += 1;
            continue;
        }
        match chars.get(i + 1) {
            Some('&') => i += 2,
            Some(next) if next.is_whitespace() => i += 1,
            Some(_) if is_entity(&chars[i..]) => i += 1,
            Some(_) => return true,
            None => i += 1,
        }
    }
    false
}

fn is_entity(chars: &[char]) -> bool {
    let body = chars
        .iter()
        .skip(1)
        .take_while(|c| c.is_ascii_alphanumeric() || **c == '#')
        .count();
    body > 0 && chars.get(body + 1) == Some(&';')
}

fn is_rich_text(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with("<!DOCTYPE") || trimmed.starts_with("<html") || trimmed.starts_with("<qt")
}

fn ending_punctuation(text: &str) -> Option<char> {
    let last = text.trim_end().chars().last()?;
    match last {
        '…' => Some('.'),
        '.' | '!' | '?' | ':' | ';' => Some(last),
        _ => None,
    }
}

fn describe_ending(ending: Option<char>) -> String {
    match ending {
        Some(c) => format!("'{}'", c),
        None => "no punctuation".to_string(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out = text.chars().take(max).collect::<String>();
    out.push('…');
    out
}
