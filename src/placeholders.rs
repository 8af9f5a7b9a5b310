//! `%1`-style place markers as understood by `QString::arg`.
//!
//! A marker is `%`, an optional `L`, then one or two digits forming a number
//! in `1..=99`. `%n` (and `%Ln`) is the count marker of plural messages.

use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub number: u8,
    pub localized: bool,
    /// Byte offset of the `%` in the scanned text.
    pub offset: usize,
    /// Byte length of the whole marker.
    pub len: usize,
}

/// Finds every numbered marker in `text`, in order of appearance.
pub fn scan(text: &str) -> Vec<Placeholder> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            i += 1;
            continue;
        }
        let mut j = i + 1;
        let localized = bytes.get(j) == Some(&b'L');
        if localized {
            j += 1;
        }
        let Some(first) = bytes.get(j).filter(|b| (b'1'..=b'9').contains(*b)) else {
            i += 1;
            continue;
        };
        let mut number = first - b'0';
        j += 1;
        if let Some(second) = bytes.get(j).filter(|b| b.is_ascii_digit()) {
            number = number * 10 + (second - b'0');
            j += 1;
        }
        out.push(Placeholder {
            number,
            localized,
            offset: i,
            len: j - i,
        });
        i = j;
    }
    out
}

/// Distinct marker numbers in order of first appearance.
pub fn sequence(text: &str) -> Vec<u8> {
    let mut seen = BTreeSet::new();
    scan(text)
        .into_iter()
        .filter_map(|marker| seen.insert(marker.number).then_some(marker.number))
        .collect()
}

pub fn has_count_marker(text: &str) -> bool {
    text.contains("%n") || text.contains("%Ln")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderDiff {
    /// In the source but not in the translation.
    pub missing: Vec<u8>,
    /// In the translation but not in the source.
    pub extra: Vec<u8>,
    /// Same set, different order of first appearance.
    pub reordered: bool,
}

impl PlaceholderDiff {
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

pub fn compare(source: &str, translation: &str) -> PlaceholderDiff {
    let source_seq = sequence(source);
    let translation_seq = sequence(translation);
    let source_set: BTreeSet<u8> = source_seq.iter().copied().collect();
    let translation_set: BTreeSet<u8> = translation_seq.iter().copied().collect();

    let missing = source_set.difference(&translation_set).copied().collect::<Vec<_>>();
    let extra = translation_set.difference(&source_set).copied().collect::<Vec<_>>();
    let reordered = missing.is_empty() && extra.is_empty() && source_seq != translation_seq;
    PlaceholderDiff {
        missing,
        extra,
        reordered,
    }
}

/// Multi-argument `arg`: the lowest-numbered marker receives `args[0]`, the
/// next lowest `args[1]`, and so on. Markers without an argument stay as is.
pub fn substitute(template: &str, args: &[&str]) -> String {
    let markers = scan(template);
    if markers.is_empty() || args.is_empty() {
        return template.to_string();
    }
    let ordered: Vec<u8> = markers
        .iter()
        .map(|marker| marker.number)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    for marker in &markers {
        let Some(index) = ordered.iter().position(|number| *number == marker.number) else {
            continue;
        };
        let Some(arg) = args.get(index) else {
            continue;
        };
        out.push_str(&template[cursor..marker.offset]);
        out.push_str(arg);
        cursor = marker.offset + marker.len;
    }
    out.push_str(&template[cursor..]);
    out
}

/// Replaces `%n` / `%Ln` with the count of a plural lookup.
pub fn replace_count(text: &str, count: i64) -> String {
    let value = count.to_string();
    text.replace("%Ln", &value).replace("%n", &value)
}
