use std::env;
use std::fs;
use std::path::PathBuf;

const CATALOG_PREFIX: &str = "GigaMesh_";

fn main() {
    let manifest_dir = PathBuf::from(
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is not set by cargo"),
    );
    let languages_dir = manifest_dir.join("languages");
    println!("cargo:rerun-if-changed={}", languages_dir.display());

    let mut locales = Vec::new();
    let entries = fs::read_dir(&languages_dir).expect("failed to list languages/");
    for entry in entries {
        let entry = entry.expect("failed to read languages/ entry");
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("ts") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|value| value.to_str()) else {
            continue;
        };
        let Some(locale) = stem.strip_prefix(CATALOG_PREFIX) else {
            continue;
        };
        if locale.is_empty() {
            continue;
        }
        locales.push(locale.to_string());
        println!("cargo:rerun-if-changed={}", path.display());
    }

    locales.sort();
    locales.dedup();

    let mut generated = String::new();
    generated.push_str("pub(crate) const EMBEDDED_LOCALES: &[&str] = &[");
    for locale in &locales {
        generated.push_str(&format!("\"{locale}\", "));
    }
    generated.push_str("];\n\n");
    generated
        .push_str("pub(crate) fn embedded_catalog(locale: &str) -> Option<&'static str> {\n");
    generated.push_str("    match locale {\n");
    for locale in &locales {
        generated.push_str(&format!(
            "        \"{locale}\" => Some(include_str!(concat!(env!(\"CARGO_MANIFEST_DIR\"), \"/languages/{CATALOG_PREFIX}{locale}.ts\"))),\n"
        ));
    }
    generated.push_str("        _ => None,\n");
    generated.push_str("    }\n");
    generated.push_str("}\n");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is not set by cargo"));
    let destination = out_dir.join("embedded_catalogs.rs");
    fs::write(&destination, generated).expect("failed to write embedded catalog index");
}
