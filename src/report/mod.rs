use anyhow::{Context as _, Result, anyhow};
use serde::Serialize;
use time::{OffsetDateTime, format_description};

use crate::catalog::{Catalog, Message, TranslationStatus};
use crate::context_filter::{self, ContextFilter};
use crate::languages::LanguageRegistry;
use crate::validate::ValidationReport;

const TEXT_TEMPLATE: &str = include_str!("templates/stats.txt.tera");
const HTML_TEMPLATE: &str = include_str!("templates/stats.html.tera");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
    Html,
}

impl ReportFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            "html" => Ok(ReportFormat::Html),
            other => Err(anyhow!(
                "unknown report format '{}' (expected text, json or html)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Counts {
    pub total: usize,
    pub finished: usize,
    pub unfinished: usize,
    pub vanished: usize,
    /// Finished share of the live (non-vanished) entries, in percent.
    pub completion: f64,
}

impl Counts {
    fn add(&mut self, message: &Message) {
        self.total += 1;
        match message.status {
            TranslationStatus::Finished => self.finished += 1,
            TranslationStatus::Unfinished => self.unfinished += 1,
            TranslationStatus::Vanished => self.vanished += 1,
        }
    }

    fn close(&mut self) {
        let live = self.finished + self.unfinished;
        self.completion = if live == 0 {
            100.0
        } else {
            (self.finished as f64 * 1000.0 / live as f64).round() / 10.0
        };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextRow {
    pub name: String,
    pub counts: Counts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogReport {
    pub generated_at: String,
    pub language: String,
    pub language_name: String,
    pub totals: Counts,
    pub contexts: Vec<ContextRow>,
    pub errors: usize,
    pub warnings: usize,
}

pub fn build_report(
    catalog: &Catalog,
    registry: &LanguageRegistry,
    validation: Option<&ValidationReport>,
    filter: Option<&ContextFilter>,
) -> CatalogReport {
    let generated_at = OffsetDateTime::now_utc()
        .format(&format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());
    let language = catalog
        .language
        .clone()
        .unwrap_or_else(|| "unknown".to_string());
    let language_name = registry.display_name(&language);

    let mut totals = Counts::default();
    let mut contexts = Vec::new();
    for context in &catalog.contexts {
        if !context_filter::allows(filter, &context.name) {
            continue;
        }
        let mut counts = Counts::default();
        for message in &context.messages {
            counts.add(message);
            totals.add(message);
        }
        counts.close();
        contexts.push(ContextRow {
            name: context.name.clone(),
            counts,
        });
    }
    totals.close();

    let (errors, warnings) = match validation {
        Some(report) => count_in_scope(report, filter),
        None => (0, 0),
    };

    CatalogReport {
        generated_at,
        language,
        language_name,
        totals,
        contexts,
        errors,
        warnings,
    }
}

fn count_in_scope(report: &ValidationReport, filter: Option<&ContextFilter>) -> (usize, usize) {
    report
        .findings
        .iter()
        .filter(|finding| context_filter::allows(filter, &finding.context))
        .fold((0, 0), |(errors, warnings), finding| match finding.severity {
            crate::validate::Severity::Error => (errors + 1, warnings),
            crate::validate::Severity::Warning => (errors, warnings + 1),
        })
}

pub fn render(report: &CatalogReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => {
            serde_json::to_string_pretty(report).with_context(|| "failed to serialize report")
        }
        ReportFormat::Text => render_template("stats.txt.tera", TEXT_TEMPLATE, report, false),
        ReportFormat::Html => render_template("stats.html.tera", HTML_TEMPLATE, report, true),
    }
}

fn render_template(
    name: &str,
    template: &str,
    report: &CatalogReport,
    autoescape: bool,
) -> Result<String> {
    let mut context = tera::Context::new();
    context.insert("report", report);
    tera::Tera::one_off(template, &context, autoescape)
        .with_context(|| format!("failed to render report template: {}", name))
}
