use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Chapter keyword tables are keyed by ISO 639-1 codes; these helpers let
/// users configure either the 2-letter or the 3-letter form, or the
/// English language name.
/// Resolve a code or English name to an `isolang` language
fn resolve(code: &str) -> Option<Language> {
    let normalized = code.trim().to_lowercase();

    match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => Language::from_639_3(&normalized).or_else(|| match normalized.as_str() {
            // ISO 639-2/B codes that differ from 639-2/T
            "may" => Language::from_639_3("msa"),
            "ger" => Language::from_639_3("deu"),
            "fre" => Language::from_639_3("fra"),
            "dut" => Language::from_639_3("nld"),
            _ => None,
        }),
        0 => None,
        _ => Language::from_name(&capitalize(&normalized)),
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Normalize a language code to ISO 639-1 (2-letter) format
pub fn normalize_to_part1(code: &str) -> Result<String> {
    resolve(code)
        .and_then(|lang| lang.to_639_1())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}
