use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use gigamesh_i18n::catalog::{parse_ts, write_ts};
use gigamesh_i18n::merge::{MergeOptions, SourceString, merge};
use gigamesh_i18n::release::ReleaseTable;
use gigamesh_i18n::settings::CheckSettings;
use gigamesh_i18n::{Command, Config, TranslationStatus, Translator, validate};

const GERMAN: &str = include_str!("../languages/GigaMesh_de.ts");

const TEST_SETTINGS: &str = r#"[system]
language = "de"
catalog_dir = ""

[release]
include_unfinished = true

[check]
accelerators = true
punctuation = true
whitespace = true
placeholder_order = true
"#;

const SMALL: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE TS>
<TS version="2.1" language="de_DE">
<context>
    <name>A</name>
    <message>
        <location filename="../a.cpp" line="10"/>
        <source>%1 mm</source>
        <translation>mm</translation>
    </message>
    <message>
        <location filename="../a.cpp" line="12"/>
        <source>Width</source>
        <translation type="unfinished">Breite</translation>
    </message>
</context>
<context>
    <name>B</name>
    <message>
        <location filename="../b.cpp" line="3"/>
        <source>Ruler</source>
        <translation>Lineal</translation>
    </message>
</context>
</TS>
"#;

static SETTINGS_DIR: OnceLock<tempfile::TempDir> = OnceLock::new();

/// Keeps `run` away from the real home directory and any local settings: the
/// settings directory is a temp dir and the last settings layer pins every key.
fn settings_file() -> String {
    let dir = SETTINGS_DIR.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        // SAFETY: runs once, before the first `run` call of this test binary.
        unsafe { std::env::set_var("GIGAMESH_I18N_DIR", dir.path()) };
        fs::write(dir.path().join("test-settings.toml"), TEST_SETTINGS).unwrap();
        dir
    });
    dir.path().join("test-settings.toml").display().to_string()
}

fn config(catalog: Option<String>, command: Command) -> Config {
    Config {
        catalog,
        lang: Some("de".to_string()),
        settings_path: Some(settings_file()),
        command,
    }
}

fn small_catalog(dir: &Path) -> PathBuf {
    let path = dir.join("GigaMesh_de.ts");
    fs::write(&path, SMALL).unwrap();
    path
}

fn display(path: &Path) -> Option<String> {
    Some(path.display().to_string())
}

#[test]
fn german_catalog_has_the_expected_shape() {
    let catalog = parse_ts(GERMAN).unwrap();
    assert_eq!(catalog.version, "2.1");
    assert_eq!(catalog.language.as_deref(), Some("de_DE"));
    assert_eq!(catalog.contexts.len(), 25);
    assert_eq!(catalog.message_count(), 1087);
    assert_eq!(catalog.count_by_status(TranslationStatus::Unfinished), 921);
    assert_eq!(catalog.count_by_status(TranslationStatus::Vanished), 1);
    assert_eq!(catalog.count_by_status(TranslationStatus::Finished), 165);

    let vanished = catalog.find("QGMDialogSliderHD", "%1", None).unwrap();
    assert_eq!(vanished.status, TranslationStatus::Vanished);
    assert!(vanished.locations.is_empty());
}

#[test]
fn german_catalog_round_trips_byte_for_byte() {
    let catalog = parse_ts(GERMAN).unwrap();
    assert_eq!(write_ts(&catalog), GERMAN);
}

#[test]
fn german_catalog_has_no_errors() {
    let catalog = parse_ts(GERMAN).unwrap();
    let report = validate::validate(&catalog, &CheckSettings::default());
    assert!(!report.has_errors(), "{}", report.render_text());
}

#[test]
fn translator_serves_german_strings() {
    let catalog = parse_ts(GERMAN).unwrap();
    let translator = Translator::from_catalog(&catalog, true);
    assert_eq!(translator.language(), Some("de_DE"));
    assert_eq!(translator.translate("MainWindow", "&File", None), "&Datei");
    assert_eq!(
        translator.translate("ExternalProgramsDialog", "Default", None),
        "Standard"
    );
    assert_eq!(translator.translate("MainWindow", "Not in the catalog", None), "Not in the catalog");
    assert_eq!(translator.translate("QGMDialogSliderHD", "%1", None), "%1");
}

#[test]
fn lookup_command_translates() {
    let output = gigamesh_i18n::run(config(
        None,
        Command::Lookup {
            context: "MainWindow".to_string(),
            source: "&File".to_string(),
            comment: None,
            args: Vec::new(),
            count: None,
        },
    ))
    .unwrap();
    assert!(output.success);
    insta::assert_snapshot!(output.text, @"&Datei");
}

#[test]
fn set_command_updates_a_catalog_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("GigaMesh_de.ts");
    fs::write(&path, GERMAN).unwrap();

    let output = gigamesh_i18n::run(config(
        display(&path),
        Command::Set {
            context: "MainWindow".to_string(),
            source: "&File".to_string(),
            translation: "Da&tei".to_string(),
            comment: None,
            unfinished: true,
            output: None,
        },
    ))
    .unwrap();
    assert_eq!(output.text, "unfinished\tMainWindow\tDa&tei");

    let updated = parse_ts(&fs::read_to_string(&path).unwrap()).unwrap();
    let message = updated.find("MainWindow", "&File", None).unwrap();
    assert_eq!(message.translation(), "Da&tei");
    assert_eq!(message.status, TranslationStatus::Unfinished);
    assert_eq!(updated.message_count(), 1087);
}

#[test]
fn set_command_refuses_to_overwrite_the_embedded_catalog() {
    let result = gigamesh_i18n::run(config(
        None,
        Command::Set {
            context: "MainWindow".to_string(),
            source: "&File".to_string(),
            translation: "Datei".to_string(),
            comment: None,
            unfinished: false,
            output: None,
        },
    ));
    assert!(result.is_err());
}

#[test]
fn merge_against_the_german_catalog() {
    let mut catalog = parse_ts(GERMAN).unwrap();
    let file = catalog.find("MainWindow", "&File", None).unwrap().clone();
    let strings = vec![
        SourceString {
            context: "MainWindow".to_string(),
            source: "&File".to_string(),
            comment: None,
            extra_comment: None,
            numerus: false,
            locations: file.locations.clone(),
        },
        SourceString {
            context: "MainWindow".to_string(),
            source: "&Export".to_string(),
            comment: None,
            extra_comment: None,
            numerus: false,
            locations: Vec::new(),
        },
    ];
    let summary = merge(&mut catalog, &strings, MergeOptions::default());
    insta::assert_json_snapshot!(summary, @r###"
    {
      "added": 1,
      "kept": 1,
      "revived": 0,
      "vanished": 172,
      "removed": 913
    }
    "###);
    assert_eq!(
        catalog.find("MainWindow", "&File", None).unwrap().status,
        TranslationStatus::Finished
    );
}

#[test]
fn check_fails_on_errors_and_respects_the_context_filter() {
    let dir = tempfile::tempdir().unwrap();
    let path = small_catalog(dir.path());

    let output = gigamesh_i18n::run(config(
        display(&path),
        Command::Check {
            format: "text".to_string(),
            contexts: Vec::new(),
        },
    ))
    .unwrap();
    assert!(!output.success);
    assert!(output.text.contains("missing-placeholder"));
    assert!(output.text.ends_with("1 error(s), 0 warning(s)"));

    let filtered = gigamesh_i18n::run(config(
        display(&path),
        Command::Check {
            format: "text".to_string(),
            contexts: vec!["B".to_string()],
        },
    ))
    .unwrap();
    assert!(filtered.success);
    insta::assert_snapshot!(filtered.text, @"0 error(s), 0 warning(s)");
}

#[test]
fn list_and_stats_commands_filter_contexts() {
    let dir = tempfile::tempdir().unwrap();
    let path = small_catalog(dir.path());

    let listed = gigamesh_i18n::run(config(
        display(&path),
        Command::List {
            contexts: vec!["A".to_string()],
            status: Some("unfinished".to_string()),
        },
    ))
    .unwrap();
    assert_eq!(listed.text, "unfinished\tA\tWidth\tBreite");

    let stats = gigamesh_i18n::run(config(
        display(&path),
        Command::Stats {
            format: "json".to_string(),
            contexts: vec!["!A".to_string()],
        },
    ))
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&stats.text).unwrap();
    assert_eq!(value["totals"]["total"], 1);
    assert_eq!(value["contexts"][0]["name"], "B");
    assert_eq!(value["errors"], 0);
}

#[test]
fn merge_dry_run_leaves_the_catalog_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = small_catalog(dir.path());
    let strings = dir.path().join("strings.json");
    fs::write(&strings, r#"[{"context":"B","source":"Ruler","locations":[{"filename":"../b.cpp","line":3}]}]"#).unwrap();

    let merge_command = |dry_run: bool, output: Option<String>| Command::Merge {
        strings: strings.display().to_string(),
        drop_vanished: false,
        output,
        dry_run,
    };

    let output = gigamesh_i18n::run(config(display(&path), merge_command(true, None))).unwrap();
    assert_eq!(output.text, "added 0, kept 1, revived 0, vanished 2, removed 0");
    assert_eq!(fs::read_to_string(&path).unwrap(), SMALL);

    let merged_path = dir.path().join("merged.ts");
    gigamesh_i18n::run(config(display(&path), merge_command(false, display(&merged_path)))).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), SMALL);
    let merged = parse_ts(&fs::read_to_string(&merged_path).unwrap()).unwrap();
    let gone = merged.find("A", "%1 mm", None).unwrap();
    assert_eq!(gone.status, TranslationStatus::Vanished);
    assert!(gone.locations.is_empty());
}

#[test]
fn release_can_leave_out_unfinished_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = small_catalog(dir.path());
    let table_path = dir.path().join("GigaMesh_de.json");

    let output = gigamesh_i18n::run(config(
        display(&path),
        Command::Release {
            output: display(&table_path),
            include_unfinished: Some(false),
        },
    ))
    .unwrap();
    assert!(output.text.starts_with("2 messages written to"));
    let strict = ReleaseTable::load(&table_path).unwrap();
    let sources = strict
        .messages
        .iter()
        .map(|message| message.source.as_str())
        .collect::<Vec<_>>();
    assert_eq!(sources, vec!["%1 mm", "Ruler"]);

    let default = gigamesh_i18n::run(config(
        display(&path),
        Command::Release {
            output: None,
            include_unfinished: None,
        },
    ))
    .unwrap();
    let table: ReleaseTable = serde_json::from_str(&default.text).unwrap();
    assert_eq!(table.messages.len(), 3);
    assert_eq!(table.messages[1].forms, vec!["Breite".to_string()]);
}

#[test]
fn languages_command_marks_the_selected_catalog() {
    let output = gigamesh_i18n::run(config(None, Command::Languages)).unwrap();
    assert_eq!(output.text, "* de\tGerman\tembedded");
}
