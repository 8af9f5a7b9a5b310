use anyhow::{Context as _, Result, anyhow};
use std::path::{Path, PathBuf};
use tracing::info;

pub mod catalog;
pub mod context_filter;
pub mod languages;
pub mod logging;
pub mod merge;
mod paths;
pub mod placeholders;
pub mod release;
pub mod report;
pub mod settings;
mod test_util;
pub mod translator;
pub mod validate;

pub use catalog::{Catalog, Context, Location, Message, TranslationStatus};
pub use translator::Translator;

use catalog::save_ts;
use context_filter::ContextFilter;
use languages::{CatalogOrigin, LanguageRegistry};
use release::ReleaseTable;
use report::ReportFormat;
use settings::Settings;

#[derive(Debug, Clone)]
pub struct Config {
    /// Explicit TS file; otherwise the catalog is chosen by language.
    pub catalog: Option<String>,
    pub lang: Option<String>,
    pub settings_path: Option<String>,
    pub command: Command,
}

#[derive(Debug, Clone)]
pub enum Command {
    Lookup {
        context: String,
        source: String,
        comment: Option<String>,
        args: Vec<String>,
        count: Option<i64>,
    },
    Check {
        format: String,
        contexts: Vec<String>,
    },
    Stats {
        format: String,
        contexts: Vec<String>,
    },
    List {
        contexts: Vec<String>,
        status: Option<String>,
    },
    Languages,
    Merge {
        strings: String,
        drop_vanished: bool,
        output: Option<String>,
        dry_run: bool,
    },
    Set {
        context: String,
        source: String,
        translation: String,
        comment: Option<String>,
        unfinished: bool,
        output: Option<String>,
    },
    Release {
        output: Option<String>,
        include_unfinished: Option<bool>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub text: String,
    /// False when the command found problems (e.g. `check` reported errors).
    pub success: bool,
}

impl RunOutput {
    fn ok(text: String) -> Self {
        Self {
            text,
            success: true,
        }
    }
}

/// A catalog together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub catalog: Catalog,
    pub path: Option<PathBuf>,
}

pub fn run(config: Config) -> Result<RunOutput> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let registry = LanguageRegistry::load()?;

    let Config {
        catalog,
        lang,
        command,
        ..
    } = config;
    let load = || load_catalog(catalog.as_deref(), lang.as_deref(), &settings);

    match command {
        Command::Languages => Ok(RunOutput::ok(format_languages(
            lang.as_deref(),
            &settings,
            &registry,
        )?)),
        Command::Lookup {
            context,
            source,
            comment,
            args,
            count,
        } => {
            let loaded = load()?;
            let translator = Translator::from_catalog(&loaded.catalog, settings.include_unfinished);
            let comment = comment.as_deref();
            let text = match count {
                Some(count) => translator.translate_plural(&context, &source, comment, count),
                None => {
                    let args = args.iter().map(String::as_str).collect::<Vec<_>>();
                    translator.translate_args(&context, &source, comment, &args)
                }
            };
            Ok(RunOutput::ok(text))
        }
        Command::Check { format, contexts } => {
            let loaded = load()?;
            let filter = ContextFilter::new(&contexts)?;
            let mut report = validate::validate(&loaded.catalog, &settings.checks);
            if let Some(filter) = &filter {
                report = restrict(report, filter);
            }
            let text = match ReportFormat::parse(&format)? {
                ReportFormat::Json => serde_json::to_string_pretty(&report)
                    .with_context(|| "failed to serialize findings")?,
                ReportFormat::Text => report.render_text(),
                ReportFormat::Html => return Err(anyhow!("check supports text and json output")),
            };
            Ok(RunOutput {
                text,
                success: !report.has_errors(),
            })
        }
        Command::Stats { format, contexts } => {
            let loaded = load()?;
            let filter = ContextFilter::new(&contexts)?;
            let validation = validate::validate(&loaded.catalog, &settings.checks);
            let report = report::build_report(
                &loaded.catalog,
                &registry,
                Some(&validation),
                filter.as_ref(),
            );
            Ok(RunOutput::ok(report::render(
                &report,
                ReportFormat::parse(&format)?,
            )?))
        }
        Command::List { contexts, status } => {
            let loaded = load()?;
            let filter = ContextFilter::new(&contexts)?;
            let status = status
                .as_deref()
                .map(TranslationStatus::parse)
                .transpose()?;
            Ok(RunOutput::ok(format_listing(
                &loaded.catalog,
                filter.as_ref(),
                status,
            )))
        }
        Command::Merge {
            strings,
            drop_vanished,
            output,
            dry_run,
        } => {
            let loaded = load()?;
            let strings = merge::load_source_strings(Path::new(&strings))?;
            let mut catalog = loaded.catalog;
            let summary = merge::merge(
                &mut catalog,
                &strings,
                merge::MergeOptions { drop_vanished },
            );
            if !dry_run {
                let target = output_path(output.as_deref(), loaded.path.as_deref())?;
                save_ts(&catalog, &target)?;
            }
            Ok(RunOutput::ok(summary.render_text()))
        }
        Command::Set {
            context,
            source,
            translation,
            comment,
            unfinished,
            output,
        } => {
            let loaded = load()?;
            let status = if unfinished {
                TranslationStatus::Unfinished
            } else {
                TranslationStatus::Finished
            };
            let mut catalog = loaded.catalog;
            catalog.set_translation(&context, &source, comment.as_deref(), &translation, status)?;
            let target = output_path(output.as_deref(), loaded.path.as_deref())?;
            save_ts(&catalog, &target)?;
            Ok(RunOutput::ok(format!(
                "{}\t{}\t{}",
                status.as_str(),
                context,
                escape_field(&translation)
            )))
        }
        Command::Release {
            output,
            include_unfinished,
        } => {
            let loaded = load()?;
            let include = include_unfinished.unwrap_or(settings.include_unfinished);
            let table = ReleaseTable::compile(&loaded.catalog, include);
            match output {
                Some(path) => {
                    table.save(Path::new(&path))?;
                    Ok(RunOutput::ok(format!(
                        "{} messages written to {}",
                        table.messages.len(),
                        path
                    )))
                }
                None => Ok(RunOutput::ok(table.to_json()?)),
            }
        }
    }
}

/// Loads `path`, or the catalog matching the resolved UI language.
pub fn load_catalog(
    path: Option<&str>,
    lang: Option<&str>,
    settings: &Settings,
) -> Result<LoadedCatalog> {
    if let Some(path) = path {
        let path = PathBuf::from(path);
        let catalog = languages::load_catalog_file(&path)?;
        info!("loaded catalog {}", path.display());
        return Ok(LoadedCatalog {
            catalog,
            path: Some(path),
        });
    }

    let language = languages::resolve_language(lang, &settings.language)
        .ok_or_else(|| anyhow!("could not determine the UI language; pass --lang or --catalog"))?;
    let sources = languages::available_catalogs(settings.catalog_dir.as_deref())?;
    let source = languages::select_catalog(&sources, &language).ok_or_else(|| {
        let available = sources
            .iter()
            .map(|source| source.locale.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        anyhow!(
            "no catalog for language '{}' (available: {})",
            language,
            available
        )
    })?;
    info!("using {} catalog ({})", source.locale, source.describe());
    let path = match &source.origin {
        CatalogOrigin::File(path) => Some(path.clone()),
        CatalogOrigin::Embedded => None,
    };
    Ok(LoadedCatalog {
        catalog: source.load()?,
        path,
    })
}

fn output_path(output: Option<&str>, loaded: Option<&Path>) -> Result<PathBuf> {
    if let Some(output) = output {
        return Ok(PathBuf::from(output));
    }
    loaded
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("the embedded catalog is read-only; pass --output"))
}

fn restrict(
    report: validate::ValidationReport,
    filter: &ContextFilter,
) -> validate::ValidationReport {
    let mut restricted = validate::ValidationReport::default();
    for finding in report.findings {
        if !filter.matches(&finding.context) {
            continue;
        }
        match finding.severity {
            validate::Severity::Error => restricted.errors += 1,
            validate::Severity::Warning => restricted.warnings += 1,
        }
        restricted.findings.push(finding);
    }
    restricted
}

fn format_languages(
    lang: Option<&str>,
    settings: &Settings,
    registry: &LanguageRegistry,
) -> Result<String> {
    let sources = languages::available_catalogs(settings.catalog_dir.as_deref())?;
    let current = languages::resolve_language(lang, &settings.language);
    let selected = current
        .as_deref()
        .and_then(|language| languages::select_catalog(&sources, language))
        .map(|source| source.locale.clone());

    let mut lines = Vec::new();
    for source in &sources {
        let marker = if selected.as_deref() == Some(source.locale.as_str()) {
            "*"
        } else {
            " "
        };
        lines.push(format!(
            "{} {}\t{}\t{}",
            marker,
            source.locale,
            registry.display_name(&source.locale),
            source.describe()
        ));
    }
    Ok(lines.join("\n"))
}

fn format_listing(
    catalog: &Catalog,
    filter: Option<&ContextFilter>,
    status: Option<TranslationStatus>,
) -> String {
    catalog
        .messages()
        .filter(|(context, _)| context_filter::allows(filter, context))
        .filter(|(_, message)| status.map(|s| s == message.status).unwrap_or(true))
        .map(|(context, message)| {
            format!(
                "{}\t{}\t{}\t{}",
                message.status.as_str(),
                context,
                escape_field(&message.source),
                escape_field(message.translation())
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_field(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}
