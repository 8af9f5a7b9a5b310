//! Plural form selection for numerus messages.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    /// One form for every count.
    Single,
    /// `n == 1` singular, everything else plural.
    OneOther,
    /// `n <= 1` singular (French, Brazilian Portuguese).
    ZeroOneOther,
    /// Czech and Slovak: 1, 2-4, rest.
    CzechSlovak,
    Polish,
    /// Russian, Ukrainian, Serbian, Croatian.
    EastSlavic,
}

fn rule_for(language: &str) -> Rule {
    let code = language.trim().to_lowercase();
    let base = code.split(['_', '-']).next().unwrap_or("");
    match base {
        "ja" | "ko" | "zh" | "vi" | "tr" => Rule::Single,
        "fr" => Rule::ZeroOneOther,
        "pt" if code.ends_with("br") => Rule::ZeroOneOther,
        "cs" | "sk" => Rule::CzechSlovak,
        "pl" => Rule::Polish,
        "ru" | "uk" | "sr" | "hr" => Rule::EastSlavic,
        _ => Rule::OneOther,
    }
}

/// Number of translation forms a numerus message needs in `language`.
pub fn form_count(language: &str) -> usize {
    match rule_for(language) {
        Rule::Single => 1,
        Rule::OneOther | Rule::ZeroOneOther => 2,
        Rule::CzechSlovak | Rule::Polish | Rule::EastSlavic => 3,
    }
}

/// Index of the form to use for `count` items.
pub fn form_index(language: &str, count: i64) -> usize {
    let n = count.unsigned_abs();
    let (mod10, mod100) = (n % 10, n % 100);
    let few = (2..=4).contains(&mod10) && !(12..=14).contains(&mod100);
    match rule_for(language) {
        Rule::Single => 0,
        Rule::OneOther => usize::from(n != 1),
        Rule::ZeroOneOther => usize::from(n > 1),
        Rule::CzechSlovak => match n {
            1 => 0,
            2..=4 => 1,
            _ => 2,
        },
        Rule::Polish => {
            if n == 1 {
                0
            } else if few {
                1
            } else {
                2
            }
        }
        Rule::EastSlavic => {
            if mod10 == 1 && mod100 != 11 {
                0
            } else if few {
                1
            } else {
                2
            }
        }
    }
}
