//! Language detection and per-document pattern selection
//!
//! Language is decided once per document from a sample of early-page text.
//! Detection uses stopword frequencies matched with an Aho-Corasick
//! automaton; when the signal is too weak the adapter falls back to the
//! language-neutral default profile and reports a warning instead of failing.

use crate::config::LanguageConfig;
use crate::patterns::{PatternRegistry, PatternSet};
use aho_corasick::AhoCorasick;
use piiscrub_core::{Error, PipelineWarning, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Languages with stopword profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    De,
    Fr,
    Es,
    Nl,
    It,
    Pt,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Language::En,
        Language::De,
        Language::Fr,
        Language::Es,
        Language::Nl,
        Language::It,
        Language::Pt,
    ];

    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::De => "de",
            Self::Fr => "fr",
            Self::Es => "es",
            Self::Nl => "nl",
            Self::It => "it",
            Self::Pt => "pt",
        }
    }

    pub fn from_code(code: &str) -> Option<Language> {
        let code = code.trim().to_lowercase();
        Self::ALL.iter().copied().find(|l| l.code() == code)
    }

    fn stopwords(&self) -> &'static [&'static str] {
        match self {
            Self::En => &[
                "the", "and", "of", "to", "is", "that", "with", "for", "this", "are", "from",
                "your", "have", "please", "which", "will", "be", "not",
            ],
            Self::De => &[
                "der", "die", "und", "das", "ist", "nicht", "mit", "sich", "auf", "für", "ein",
                "eine", "dem", "den", "wir", "bitte", "ich", "sie",
            ],
            Self::Fr => &[
                "le", "la", "les", "et", "est", "une", "des", "pour", "dans", "avec", "vous",
                "nous", "sur", "pas", "du", "au", "que",
            ],
            Self::Es => &[
                "el", "los", "las", "y", "es", "una", "por", "con", "para", "que", "del", "se",
                "su", "al", "como", "usted",
            ],
            Self::Nl => &[
                "de", "het", "een", "en", "van", "is", "dat", "niet", "met", "voor", "op",
                "zijn", "wij", "ook", "te", "u",
            ],
            Self::It => &[
                "il", "di", "che", "è", "per", "una", "con", "non", "sono", "gli", "della",
                "anche", "questo", "alla",
            ],
            Self::Pt => &[
                "o", "os", "que", "não", "com", "uma", "para", "por", "do", "da", "em", "é",
                "são", "você", "também",
            ],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Preferred reading of ambiguous numeric dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    /// 05/15/1990
    MonthFirst,
    /// 15/05/1990
    DayFirst,
    /// Accept either reading
    Either,
}

/// Locale-specific formatting rules used by validators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageProfile {
    /// `None` for the language-neutral default profile
    pub language: Option<Language>,
    pub date_order: DateOrder,
    pub min_phone_digits: usize,
    pub max_phone_digits: usize,
}

impl LanguageProfile {
    /// Profile used when the language is unknown
    pub fn default_profile() -> Self {
        Self {
            language: None,
            date_order: DateOrder::Either,
            min_phone_digits: 10,
            max_phone_digits: 15,
        }
    }

    pub fn for_language(language: Language) -> Self {
        let (date_order, min_phone_digits, max_phone_digits) = match language {
            Language::En => (DateOrder::MonthFirst, 10, 15),
            Language::De => (DateOrder::DayFirst, 8, 15),
            Language::Fr => (DateOrder::DayFirst, 10, 13),
            Language::Es => (DateOrder::DayFirst, 9, 13),
            Language::Nl => (DateOrder::DayFirst, 10, 13),
            Language::It => (DateOrder::DayFirst, 9, 13),
            Language::Pt => (DateOrder::DayFirst, 9, 13),
        };
        Self {
            language: Some(language),
            date_order,
            min_phone_digits,
            max_phone_digits,
        }
    }

    /// Language code, or `"default"`
    pub fn code(&self) -> &'static str {
        self.language.map_or("default", |l| l.code())
    }
}

/// Why detection produced no language
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionFailure {
    TooFewWords { words: usize, required: usize },
    NoSignal,
    Ambiguous { best: Language, runner_up: Language, margin: f64 },
}

impl fmt::Display for DetectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewWords { words, required } => {
                write!(f, "sample has {} words, need {}", words, required)
            }
            Self::NoSignal => write!(f, "no stopwords recognised in sample"),
            Self::Ambiguous {
                best,
                runner_up,
                margin,
            } => write!(
                f,
                "ambiguous between {} and {} (margin {:.2})",
                best, runner_up, margin
            ),
        }
    }
}

/// Stopword-frequency language detector
pub struct LanguageDetector {
    automaton: AhoCorasick,
    owners: Vec<Vec<Language>>,
    min_words: usize,
    min_margin: f64,
}

impl LanguageDetector {
    pub fn new(min_words: usize, min_margin: f64) -> Result<Self> {
        let mut words: Vec<&'static str> = Vec::new();
        let mut owners: Vec<Vec<Language>> = Vec::new();
        let mut index: HashMap<&'static str, usize> = HashMap::new();

        for language in Language::ALL {
            for &word in language.stopwords() {
                let slot = *index.entry(word).or_insert_with(|| {
                    words.push(word);
                    owners.push(Vec::new());
                    words.len() - 1
                });
                owners[slot].push(language);
            }
        }

        let automaton = AhoCorasick::new(&words)
            .map_err(|e| Error::config(format!("Failed to build stopword matcher: {}", e)))?;

        Ok(Self {
            automaton,
            owners,
            min_words,
            min_margin,
        })
    }

    /// Detect the dominant language of a text sample
    pub fn detect(&self, sample: &str) -> std::result::Result<Language, DetectionFailure> {
        let lower = sample.to_lowercase();
        let words = lower
            .split(|c: char| !c.is_alphabetic())
            .filter(|w| !w.is_empty())
            .count();
        if words < self.min_words {
            return Err(DetectionFailure::TooFewWords {
                words,
                required: self.min_words,
            });
        }

        let mut scores: HashMap<Language, usize> = HashMap::new();
        for mat in self.automaton.find_overlapping_iter(&lower) {
            if !is_whole_word(&lower, mat.start(), mat.end()) {
                continue;
            }
            for &language in &self.owners[mat.pattern().as_usize()] {
                *scores.entry(language).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(Language, usize)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        debug!(?ranked, "Stopword scores");

        let (best, best_score) = match ranked.first() {
            Some(&(l, s)) if s > 0 => (l, s),
            _ => return Err(DetectionFailure::NoSignal),
        };
        if let Some(&(runner_up, second_score)) = ranked.get(1) {
            let margin = (best_score - second_score) as f64 / best_score as f64;
            if margin < self.min_margin {
                return Err(DetectionFailure::Ambiguous {
                    best,
                    runner_up,
                    margin,
                });
            }
        }
        Ok(best)
    }
}

fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.map_or(false, char::is_alphabetic) && !after.map_or(false, char::is_alphabetic)
}

/// Configuration selected for one document, shared read-only by all page workers
#[derive(Debug, Clone)]
pub struct ActiveProfile {
    pub profile: LanguageProfile,
    pub patterns: Arc<PatternSet>,
}

impl ActiveProfile {
    pub fn language(&self) -> Option<Language> {
        self.profile.language
    }
}

/// Selects the language profile and pattern subset for a document
pub struct LanguageAdapter {
    registry: Arc<PatternRegistry>,
    detector: LanguageDetector,
    config: LanguageConfig,
    forced: Option<Language>,
}

impl LanguageAdapter {
    pub fn new(registry: Arc<PatternRegistry>, config: LanguageConfig) -> Result<Self> {
        let forced = match config.forced.as_deref() {
            Some(code) => Some(Language::from_code(code).ok_or_else(|| {
                Error::config(format!("Unsupported forced language '{}'", code))
            })?),
            None => None,
        };
        let detector = LanguageDetector::new(config.min_words, config.min_margin)?;
        Ok(Self {
            registry,
            detector,
            config,
            forced,
        })
    }

    /// Build the detection sample from the first pages of a document
    pub fn sample<'a>(&self, pages: impl IntoIterator<Item = &'a str>) -> String {
        let mut sample = String::new();
        for text in pages.into_iter().take(self.config.sample_pages) {
            if !sample.is_empty() {
                sample.push(' ');
            }
            sample.push_str(text);
            if sample.chars().count() >= self.config.sample_chars {
                break;
            }
        }
        sample.chars().take(self.config.sample_chars).collect()
    }

    /// Choose the profile for a document.
    ///
    /// Never fails: weak or missing signal yields the default profile plus a warning.
    pub fn select(&self, sample: &str) -> (ActiveProfile, Option<PipelineWarning>) {
        if let Some(language) = self.forced {
            info!(language = %language, "Using configured language");
            return (self.profile_for(Some(language)), None);
        }

        match self.detector.detect(sample) {
            Ok(language) => {
                info!(language = %language, "Detected document language");
                (self.profile_for(Some(language)), None)
            }
            Err(failure) => {
                warn!(reason = %failure, "Language detection failed, using default pattern set");
                (
                    self.profile_for(None),
                    Some(PipelineWarning::LanguageDetectionFailure {
                        reason: failure.to_string(),
                    }),
                )
            }
        }
    }

    /// Profile and patterns for a known (or unknown) language
    pub fn profile_for(&self, language: Option<Language>) -> ActiveProfile {
        let profile = match language {
            Some(l) => LanguageProfile::for_language(l),
            None => LanguageProfile::default_profile(),
        };
        ActiveProfile {
            profile,
            patterns: self.registry.patterns_for(language),
        }
    }
}
