//! Pattern registry: per-language compiled structural patterns
//!
//! Every language set extends the language-neutral default set. The
//! registry is built once, wrapped in an `Arc` and never mutated afterwards.

use crate::config::CustomPatternSpec;
use crate::language::Language;
use crate::validators::Validator;
use piiscrub_core::{Error, PiiType, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Uncompiled pattern definition
#[derive(Debug, Clone)]
pub struct PatternSpec {
    pub id: String,
    pub pii_type: PiiType,
    pub regex: String,
    pub validator: Option<Validator>,
    pub confidence: f32,
}

impl PatternSpec {
    fn new(
        id: &str,
        pii_type: PiiType,
        regex: &str,
        validator: Option<Validator>,
        confidence: f32,
    ) -> Self {
        Self {
            id: id.to_string(),
            pii_type,
            regex: regex.to_string(),
            validator,
            confidence,
        }
    }

    fn compile(&self) -> Result<Pattern> {
        let regex = Regex::new(&self.regex).map_err(|e| {
            Error::pattern(format!("Failed to compile pattern '{}': {}", self.id, e))
        })?;
        Ok(Pattern {
            id: self.id.clone(),
            pii_type: self.pii_type,
            regex,
            validator: self.validator,
            confidence: self.confidence.clamp(0.0, 1.0),
        })
    }
}

/// A compiled pattern ready for matching
#[derive(Debug, Clone)]
pub struct Pattern {
    pub id: String,
    pub pii_type: PiiType,
    pub regex: Regex,
    pub validator: Option<Validator>,
    pub confidence: f32,
}

/// Ordered list of compiled patterns for one language
#[derive(Debug, Clone)]
pub struct PatternSet {
    language: Option<Language>,
    patterns: Vec<Pattern>,
}

impl PatternSet {
    fn compile(language: Option<Language>, specs: &[PatternSpec]) -> Result<Self> {
        let patterns = specs
            .iter()
            .map(PatternSpec::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { language, patterns })
    }

    pub fn language(&self) -> Option<Language> {
        self.language
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn types(&self) -> Vec<PiiType> {
        let mut types: Vec<PiiType> = self.patterns.iter().map(|p| p.pii_type).collect();
        types.sort();
        types.dedup();
        types
    }
}

/// Language-neutral patterns shared by every set.
///
/// Alternations list their longest forms first so that leftmost-first
/// matching picks the longest reading.
fn default_specs() -> Vec<PatternSpec> {
    vec![
        PatternSpec::new(
            "email",
            PiiType::Email,
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
            Some(Validator::Email),
            0.95,
        ),
        PatternSpec::new(
            "phone_international",
            PiiType::Phone,
            r"(?:\+|\b)\d[\d \-]{7,}\d\b",
            Some(Validator::PhoneDigits),
            0.7,
        ),
        PatternSpec::new(
            "credit_card",
            PiiType::CreditCard,
            r"\b(?:\d[ \-]?){12,18}\d\b",
            Some(Validator::Luhn),
            0.9,
        ),
        PatternSpec::new(
            "date_numeric",
            PiiType::DateOfBirth,
            r"\b(?:(?:19|20)\d{2}[/.\-]\d{1,2}[/.\-]\d{1,2}|\d{1,2}[/.\-]\d{1,2}[/.\-](?:19|20)\d{2})\b",
            Some(Validator::DateOfBirth),
            0.6,
        ),
        PatternSpec::new(
            "iban",
            PiiType::BankAccount,
            r"\b[A-Z]{2}\d{2}(?: ?[A-Z0-9]{4}){2,7}(?: ?[A-Z0-9]{1,3})?\b",
            Some(Validator::Iban),
            0.9,
        ),
        PatternSpec::new(
            "ipv6",
            PiiType::IpAddress,
            r"\b(?:[0-9A-Fa-f]{1,4}:){7}[0-9A-Fa-f]{1,4}\b",
            Some(Validator::IpAddress),
            0.85,
        ),
        PatternSpec::new(
            "ipv4",
            PiiType::IpAddress,
            r"\b(?:\d{1,3}\.){3}\d{1,3}\b",
            Some(Validator::IpAddress),
            0.8,
        ),
        PatternSpec::new(
            "mac_address",
            PiiType::DeviceId,
            r"\b[0-9A-Fa-f]{2}(?:[:\-][0-9A-Fa-f]{2}){5}\b",
            None,
            0.85,
        ),
        PatternSpec::new("imei", PiiType::DeviceId, r"\b\d{15}\b", Some(Validator::Imei), 0.6),
    ]
}

const EN_MONTHS: &str = "January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sept|Sep|Oct|Nov|Dec";

fn language_specs(language: Language) -> Vec<PatternSpec> {
    match language {
        Language::En => vec![
            PatternSpec::new(
                "us_ssn",
                PiiType::NationalId,
                r"\b\d{3}-\d{2}-\d{4}\b",
                Some(Validator::UsSsn),
                0.9,
            ),
            PatternSpec::new(
                "us_phone",
                PiiType::Phone,
                r"\(\d{3}\) ?\d{3}[\-.]\d{4}\b",
                Some(Validator::PhoneDigits),
                0.85,
            ),
            PatternSpec::new(
                "date_textual_day_first",
                PiiType::DateOfBirth,
                &format!(r"(?i)\b\d{{1,2}} (?:{})\.? (?:19|20)\d{{2}}\b", EN_MONTHS),
                Some(Validator::DateOfBirth),
                0.6,
            ),
            PatternSpec::new(
                "date_textual_month_first",
                PiiType::DateOfBirth,
                &format!(r"(?i)\b(?:{})\.? \d{{1,2}},? (?:19|20)\d{{2}}\b", EN_MONTHS),
                Some(Validator::DateOfBirth),
                0.6,
            ),
        ],
        Language::De => vec![
            PatternSpec::new(
                "de_tax_id",
                PiiType::TaxId,
                r"\b\d{2} ?\d{3} ?\d{3} ?\d{3}\b",
                Some(Validator::GermanTaxId),
                0.75,
            ),
            PatternSpec::new(
                "de_phone",
                PiiType::Phone,
                r"(?:\+49 ?|\b0)\d{2,4}[ /\-]?\d{3,8}(?:[ \-]?\d{1,5})?\b",
                Some(Validator::PhoneDigits),
                0.75,
            ),
            PatternSpec::new(
                "de_date_textual",
                PiiType::DateOfBirth,
                r"(?i)\b\d{1,2}\. ?(?:Januar|Februar|März|April|Mai|Juni|Juli|August|September|Oktober|November|Dezember) (?:19|20)\d{2}\b",
                Some(Validator::DateOfBirth),
                0.6,
            ),
        ],
        Language::Fr => vec![
            PatternSpec::new(
                "fr_nir",
                PiiType::NationalId,
                r"\b[1278] ?\d{2} ?\d{2} ?(?:\d{2}|2A|2B) ?\d{3} ?\d{3} ?\d{2}\b",
                Some(Validator::FrenchNir),
                0.85,
            ),
            PatternSpec::new(
                "fr_phone",
                PiiType::Phone,
                r"(?:\+33 ?|\b0)[1-9](?:[ .\-]?\d{2}){4}\b",
                Some(Validator::PhoneDigits),
                0.8,
            ),
            PatternSpec::new(
                "fr_date_textual",
                PiiType::DateOfBirth,
                r"(?i)\b\d{1,2} (?:janvier|février|mars|avril|mai|juin|juillet|août|septembre|octobre|novembre|décembre) (?:19|20)\d{2}\b",
                Some(Validator::DateOfBirth),
                0.6,
            ),
        ],
        Language::Es => vec![
            PatternSpec::new(
                "es_dni",
                PiiType::NationalId,
                r"\b[XYZ]?\d{7,8}[ \-]?[A-Z]\b",
                Some(Validator::SpanishDni),
                0.85,
            ),
            PatternSpec::new(
                "es_phone",
                PiiType::Phone,
                r"(?:\+34 ?)?\b[6789]\d{2} ?\d{3} ?\d{3}\b",
                Some(Validator::PhoneDigits),
                0.75,
            ),
        ],
        Language::Nl => vec![
            PatternSpec::new(
                "nl_bsn",
                PiiType::NationalId,
                r"\b\d{4}\.\d{2}\.\d{3}\b|\b\d{9}\b",
                Some(Validator::DutchBsn),
                0.7,
            ),
            PatternSpec::new(
                "nl_phone",
                PiiType::Phone,
                r"(?:\+31 ?|\b0)[1-9](?:[ \-]?\d){8}\b",
                Some(Validator::PhoneDigits),
                0.8,
            ),
        ],
        Language::It | Language::Pt => Vec::new(),
    }
}

/// Registry of compiled pattern sets, keyed by language
#[derive(Debug)]
pub struct PatternRegistry {
    default: Arc<PatternSet>,
    by_language: HashMap<Language, Arc<PatternSet>>,
}

impl PatternRegistry {
    /// Registry with the built-in patterns only
    pub fn builtin() -> Result<Self> {
        Self::with_custom(&[])
    }

    /// Registry with the built-in patterns extended by configured ones
    pub fn with_custom(custom: &[CustomPatternSpec]) -> Result<Self> {
        let mut default_extra = Vec::new();
        let mut language_extra: HashMap<Language, Vec<PatternSpec>> = HashMap::new();

        for (i, spec) in custom.iter().enumerate() {
            let pattern = PatternSpec {
                id: spec.id.clone().unwrap_or_else(|| format!("custom_{}", i)),
                pii_type: spec.pii_type,
                regex: spec.regex.clone(),
                validator: spec.validator,
                confidence: spec.confidence,
            };
            match spec.language.as_str() {
                "default" | "*" => default_extra.push(pattern),
                code => {
                    let language = Language::from_code(code).ok_or_else(|| {
                        Error::config(format!(
                            "Custom pattern '{}' names unsupported language '{}'",
                            pattern.id, code
                        ))
                    })?;
                    language_extra.entry(language).or_default().push(pattern);
                }
            }
        }

        let mut base = default_specs();
        base.extend(default_extra);
        let default = Arc::new(PatternSet::compile(None, &base)?);

        let mut by_language = HashMap::new();
        for language in Language::ALL {
            let mut specs = language_specs(language);
            if let Some(extra) = language_extra.remove(&language) {
                specs.extend(extra);
            }
            if specs.is_empty() {
                continue;
            }
            let mut combined = base.clone();
            combined.extend(specs);
            let set = PatternSet::compile(Some(language), &combined)?;
            debug!(language = %language, patterns = set.len(), "Compiled language pattern set");
            by_language.insert(language, Arc::new(set));
        }

        info!(
            default_patterns = default.len(),
            language_sets = by_language.len(),
            "Pattern registry initialized"
        );

        Ok(Self {
            default,
            by_language,
        })
    }

    /// Pattern set for a language; languages without a dedicated set share the default one
    pub fn patterns_for(&self, language: Option<Language>) -> Arc<PatternSet> {
        language
            .and_then(|l| self.by_language.get(&l))
            .map(Arc::clone)
            .unwrap_or_else(|| Arc::clone(&self.default))
    }

    pub fn default_set(&self) -> &Arc<PatternSet> {
        &self.default
    }

    /// Languages with a dedicated pattern set
    pub fn languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.by_language.keys().copied().collect();
        languages.sort();
        languages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_compiles() {
        let registry = PatternRegistry::builtin().unwrap();
        assert_eq!(
            registry.languages(),
            vec![Language::En, Language::De, Language::Fr, Language::Es, Language::Nl]
        );
        assert!(registry.default_set().types().contains(&PiiType::Email));
    }

    #[test]
    fn test_language_sets_extend_default() {
        let registry = PatternRegistry::builtin().unwrap();
        let default_len = registry.default_set().len();
        let en = registry.patterns_for(Some(Language::En));
        assert!(en.len() > default_len);
        assert!(en.patterns().iter().any(|p| p.id == "email"));
        assert!(en.patterns().iter().any(|p| p.id == "us_ssn"));
    }

    #[test]
    fn test_language_without_set_uses_default() {
        let registry = PatternRegistry::builtin().unwrap();
        let it = registry.patterns_for(Some(Language::It));
        assert!(Arc::ptr_eq(&it, registry.default_set()));
        assert!(registry.patterns_for(None).language().is_none());
    }

    #[test]
    fn test_custom_patterns() {
        let custom = vec![
            CustomPatternSpec {
                id: Some("order_ref".to_string()),
                language: "default".to_string(),
                pii_type: PiiType::OrderId,
                regex: r"\bORD-\d{6}\b".to_string(),
                validator: None,
                confidence: 0.8,
            },
            CustomPatternSpec {
                id: None,
                language: "it".to_string(),
                pii_type: PiiType::TaxId,
                regex: r"\b[A-Z]{6}\d{2}[A-Z]\d{2}[A-Z]\d{3}[A-Z]\b".to_string(),
                validator: None,
                confidence: 0.8,
            },
        ];
        let registry = PatternRegistry::with_custom(&custom).unwrap();
        assert!(registry.default_set().patterns().iter().any(|p| p.id == "order_ref"));
        let de = registry.patterns_for(Some(Language::De));
        assert!(de.patterns().iter().any(|p| p.id == "order_ref"));
        let it = registry.patterns_for(Some(Language::It));
        assert_eq!(it.language(), Some(Language::It));
        assert!(it.patterns().iter().any(|p| p.id == "custom_1"));
    }

    #[test]
    fn test_invalid_custom_regex_is_pattern_error() {
        let custom = vec![CustomPatternSpec {
            id: Some("broken".to_string()),
            language: "default".to_string(),
            pii_type: PiiType::OrderId,
            regex: r"(unclosed".to_string(),
            validator: None,
            confidence: 0.8,
        }];
        let err = PatternRegistry::with_custom(&custom).unwrap_err();
        assert!(matches!(err, Error::Pattern(_)));
    }

    #[test]
    fn test_unknown_custom_language() {
        let custom = vec![CustomPatternSpec {
            id: None,
            language: "tlh".to_string(),
            pii_type: PiiType::OrderId,
            regex: r"\d+".to_string(),
            validator: None,
            confidence: 0.5,
        }];
        assert!(matches!(
            PatternRegistry::with_custom(&custom),
            Err(Error::Config(_))
        ));
    }
}
