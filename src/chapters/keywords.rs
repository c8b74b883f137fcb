/*!
 * Language-specific cue tables for chapter detection.
 *
 * Each language has a keyword list grouped by narrative category and a
 * label table used for every chapter the synthesizer emits.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::language_utils;

/// Languages with keyword and label tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChapterLanguage {
    #[default]
    Indonesian,
    English,
}

impl ChapterLanguage {
    /// Resolve an ISO 639 code or language name; unknown languages fall back to Indonesian
    pub fn from_code(code: &str) -> Self {
        Self::try_from_code(code).unwrap_or_default()
    }

    /// Resolve an ISO 639 code or language name, `None` when there is no table for it
    pub fn try_from_code(code: &str) -> Option<Self> {
        match language_utils::normalize_to_part1(code).ok()?.as_str() {
            "id" => Some(Self::Indonesian),
            "en" => Some(Self::English),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Indonesian => "id",
            Self::English => "en",
        }
    }
}

/// Narrative category a cue word signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueCategory {
    Intro,
    Transition,
    Conflict,
    Climax,
    Resolution,
    Closing,
}

/// Structural role of a chapter, rendered through the language's label table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterLabel {
    Intro,
    ConflictStart,
    RisingAction,
    TurningPoint,
    Climax,
    Resolution,
    Ending,
}

impl From<CueCategory> for ChapterLabel {
    fn from(category: CueCategory) -> Self {
        match category {
            CueCategory::Intro => ChapterLabel::Intro,
            CueCategory::Transition => ChapterLabel::RisingAction,
            CueCategory::Conflict => ChapterLabel::ConflictStart,
            CueCategory::Climax => ChapterLabel::TurningPoint,
            CueCategory::Resolution => ChapterLabel::Resolution,
            CueCategory::Closing => ChapterLabel::Ending,
        }
    }
}

// Scan order matters: the first cue that matches a segment wins
const INDONESIAN_CUES: &[(CueCategory, &[&str])] = &[
    (CueCategory::Intro, &["selamat datang", "halo", "hai"]),
    (
        CueCategory::Transition,
        &[
            "perkenalkan", "sementara itu", "kemudian", "setelah itu", "beberapa", "tahun kemudian",
            "hari berikutnya", "esok hari", "malam itu", "pagi hari", "di sisi lain", "di tempat lain",
        ],
    ),
    (CueCategory::Conflict, &["tapi", "namun"]),
    (CueCategory::Transition, &["akan tetapi"]),
    (CueCategory::Conflict, &["sayangnya"]),
    (CueCategory::Climax, &["tiba-tiba", "ternyata"]),
    (CueCategory::Transition, &["rupanya"]),
    (CueCategory::Resolution, &["akhirnya", "pada akhirnya"]),
    (CueCategory::Transition, &["sekarang"]),
    (CueCategory::Closing, &["terima kasih", "subscribe"]),
    (CueCategory::Transition, &["jangan lupa"]),
    (CueCategory::Closing, &["sampai jumpa"]),
];

const ENGLISH_CUES: &[(CueCategory, &[&str])] = &[
    (CueCategory::Intro, &["welcome", "hello"]),
    (
        CueCategory::Transition,
        &["hi everyone", "meanwhile", "later", "after that", "years later", "next day"],
    ),
    (CueCategory::Conflict, &["however", "but"]),
    (CueCategory::Climax, &["suddenly"]),
    (CueCategory::Conflict, &["unfortunately"]),
    (CueCategory::Climax, &["it turns out"]),
    (CueCategory::Transition, &["the truth is"]),
    (CueCategory::Resolution, &["finally", "in the end"]),
    (CueCategory::Closing, &["thank you", "subscribe"]),
    (CueCategory::Transition, &["see you"]),
];

/// A compiled cue matcher: matches a keyword on word boundaries, case-insensitively
pub struct Cue {
    pub keyword: &'static str,
    pub category: CueCategory,
    pattern: Regex,
}

impl Cue {
    fn compile(keyword: &'static str, category: CueCategory) -> Self {
        let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(keyword))).unwrap();
        Self {
            keyword,
            category,
            pattern,
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

fn compile_table(table: &[(CueCategory, &'static [&'static str])]) -> Vec<Cue> {
    table
        .iter()
        .flat_map(|(category, words)| words.iter().map(move |word| Cue::compile(word, *category)))
        .collect()
}

static INDONESIAN_MATCHERS: Lazy<Vec<Cue>> = Lazy::new(|| compile_table(INDONESIAN_CUES));
static ENGLISH_MATCHERS: Lazy<Vec<Cue>> = Lazy::new(|| compile_table(ENGLISH_CUES));

/// Compiled cues for a language, in table order
pub fn cues(language: ChapterLanguage) -> &'static [Cue] {
    match language {
        ChapterLanguage::Indonesian => &INDONESIAN_MATCHERS,
        ChapterLanguage::English => &ENGLISH_MATCHERS,
    }
}

/// Display text for a chapter label
pub fn label_text(language: ChapterLanguage, label: ChapterLabel) -> &'static str {
    match language {
        ChapterLanguage::Indonesian => match label {
            ChapterLabel::Intro => "Pembuka",
            ChapterLabel::ConflictStart => "Konflik Dimulai",
            ChapterLabel::RisingAction => "Masalah Semakin Besar",
            ChapterLabel::TurningPoint => "Titik Balik",
            ChapterLabel::Climax => "Klimaks",
            ChapterLabel::Resolution => "Penyelesaian",
            ChapterLabel::Ending => "Ending",
        },
        ChapterLanguage::English => match label {
            ChapterLabel::Intro => "Introduction",
            ChapterLabel::ConflictStart => "Conflict Begins",
            ChapterLabel::RisingAction => "Rising Action",
            ChapterLabel::TurningPoint => "Turning Point",
            ChapterLabel::Climax => "Climax",
            ChapterLabel::Resolution => "Resolution",
            ChapterLabel::Ending => "Ending",
        },
    }
}
