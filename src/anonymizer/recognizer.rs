// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Entity recognizers: compiled regex patterns and the model adapter

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::sync::Arc;

use super::config::{ContextConfig, EntityType, Locale, PatternRecognizerConfig, ValidatorKind};
use super::error::{AnonymizerError, Result};
use super::nlp::ModelRecognizer;
use super::span::Span;

/// Capture group that narrows a match to the redacted part
pub const PII_GROUP: &str = "pii";

static WORD_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+").expect("WORD_REGEX should compile - this is a bug"));

/// Compiled pattern with metadata
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub name: String,
    pub regex: Regex,
    pub score: f64,
    group: Option<usize>,
}

/// Regex-based recognizer for a single entity type
#[derive(Debug, Clone)]
pub struct PatternRecognizer {
    id: Arc<str>,
    entity_type: EntityType,
    patterns: Vec<CompiledPattern>,
    /// Context phrases, each split into lowercase words
    context: Vec<Vec<String>>,
    context_config: ContextConfig,
    locales: Vec<Locale>,
    validator: Option<ValidatorKind>,
}

impl PatternRecognizer {
    /// Compile a recognizer definition. Malformed regexes, empty pattern
    /// lists and scores outside `[0, 1]` are configuration errors.
    pub fn compile(
        config: &PatternRecognizerConfig,
        context_config: ContextConfig,
    ) -> Result<Self> {
        if config.patterns.is_empty() {
            return Err(AnonymizerError::config(format!(
                "recognizer '{}' has no patterns",
                config.name
            )));
        }
        if config.locales.is_empty() {
            return Err(AnonymizerError::config(format!(
                "recognizer '{}' has no locales",
                config.name
            )));
        }

        let mut patterns = Vec::with_capacity(config.patterns.len());
        for pattern in &config.patterns {
            if !(0.0..=1.0).contains(&pattern.score) {
                return Err(AnonymizerError::config(format!(
                    "pattern '{}' of recognizer '{}' has score {} outside [0, 1]",
                    pattern.name, config.name, pattern.score
                )));
            }
            let regex = RegexBuilder::new(&pattern.regex)
                .case_insensitive(config.case_insensitive)
                .build()
                .map_err(|e| {
                    AnonymizerError::config(format!(
                        "failed to compile pattern '{}' of recognizer '{}': {e}",
                        pattern.name, config.name
                    ))
                })?;
            let group = regex
                .capture_names()
                .position(|name| name == Some(PII_GROUP));
            patterns.push(CompiledPattern {
                name: pattern.name.clone(),
                regex,
                score: pattern.score,
                group,
            });
        }

        let context = config
            .context
            .iter()
            .map(|phrase| words(phrase).into_iter().map(|w| w.text).collect::<Vec<_>>())
            .filter(|phrase| !phrase.is_empty())
            .collect();

        Ok(Self {
            id: Arc::from(config.name.as_str()),
            entity_type: config.entity_type.clone(),
            patterns,
            context,
            context_config,
            locales: config.locales.clone(),
            validator: config.validator,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    pub fn supports_locale(&self, locale: &Locale) -> bool {
        self.locales.contains(locale)
    }

    /// Scan `text` with every pattern. Locale filtering is the caller's job.
    pub fn detect(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();

        for pattern in &self.patterns {
            let ranges: Vec<(usize, usize)> = match pattern.group {
                Some(group) => pattern
                    .regex
                    .captures_iter(text)
                    .filter_map(|caps| caps.get(group))
                    .map(|m| (m.start(), m.end()))
                    .collect(),
                None => pattern
                    .regex
                    .find_iter(text)
                    .map(|m| (m.start(), m.end()))
                    .collect(),
            };

            for (start, end) in ranges {
                let score = match self.validator {
                    Some(validator) if validator.validate(&text[start..end]) => 1.0,
                    Some(_) => {
                        tracing::trace!(recognizer = %self.id, start, end, "match failed checksum");
                        continue;
                    }
                    None => pattern.score,
                };

                match Span::try_new(
                    text,
                    start,
                    end,
                    self.entity_type.clone(),
                    score,
                    Arc::clone(&self.id),
                ) {
                    Ok(span) => spans.push(span),
                    Err(e) => {
                        tracing::debug!(
                            recognizer = %self.id,
                            pattern = %pattern.name,
                            error = %e,
                            "discarding match"
                        );
                    }
                }
            }
        }

        if !self.context.is_empty() && !spans.is_empty() {
            let tokens = words(text);
            for span in &mut spans {
                if span.score() < 1.0 && self.has_context(&tokens, span.start(), span.end()) {
                    *span = span.with_score(span.score() + self.context_config.boost);
                }
            }
        }

        spans
    }

    fn has_context(&self, tokens: &[Word], start: usize, end: usize) -> bool {
        let window = self.context_config.window;

        let before_end = tokens.partition_point(|w| w.end <= start);
        let before = &tokens[before_end.saturating_sub(window)..before_end];

        let after_start = tokens.partition_point(|w| w.start < end);
        let after = &tokens[after_start..after_start.saturating_add(window).min(tokens.len())];

        self.context
            .iter()
            .any(|phrase| contains_phrase(before, phrase) || contains_phrase(after, phrase))
    }
}

/// Lowercased word with its byte range
#[derive(Debug, Clone, PartialEq)]
struct Word {
    start: usize,
    end: usize,
    text: String,
}

fn words(text: &str) -> Vec<Word> {
    WORD_REGEX
        .find_iter(text)
        .map(|m| Word {
            start: m.start(),
            end: m.end(),
            text: m.as_str().to_lowercase(),
        })
        .collect()
}

fn contains_phrase(window: &[Word], phrase: &[String]) -> bool {
    phrase.len() <= window.len()
        && window
            .windows(phrase.len())
            .any(|ws| ws.iter().zip(phrase).all(|(word, expected)| word.text == *expected))
}

/// A registered recognizer
#[derive(Debug)]
pub enum Recognizer {
    Pattern(PatternRecognizer),
    Model(ModelRecognizer),
}

impl Recognizer {
    pub fn id(&self) -> &str {
        match self {
            Recognizer::Pattern(r) => r.id(),
            Recognizer::Model(r) => r.id(),
        }
    }

    pub fn supports_locale(&self, locale: &Locale) -> bool {
        match self {
            Recognizer::Pattern(r) => r.supports_locale(locale),
            Recognizer::Model(r) => r.supports_locale(locale),
        }
    }

    /// Entity types this recognizer can emit
    pub fn supported_entities(&self) -> Vec<EntityType> {
        match self {
            Recognizer::Pattern(r) => vec![r.entity_type().clone()],
            Recognizer::Model(r) => r.supported_entities(),
        }
    }

    pub fn detect(&self, text: &str, locale: &Locale) -> Result<Vec<Span>> {
        match self {
            Recognizer::Pattern(r) => Ok(r.detect(text)),
            Recognizer::Model(r) => r.detect(text, locale),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymizer::config::PatternConfig;

    fn config(regex: &str, context: &[&str]) -> PatternRecognizerConfig {
        PatternRecognizerConfig {
            name: "TestRecognizer".to_string(),
            entity_type: EntityType::new("TEST"),
            patterns: vec![PatternConfig {
                name: "test".to_string(),
                regex: regex.to_string(),
                score: 0.5,
            }],
            context: context.iter().map(|c| c.to_string()).collect(),
            locales: vec![Locale::IT],
            case_insensitive: false,
            validator: None,
        }
    }

    #[test]
    fn test_malformed_pattern_fails_compilation() {
        let err = PatternRecognizer::compile(&config(r"(unclosed", &[]), ContextConfig::default())
            .unwrap_err();
        assert!(matches!(err, AnonymizerError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("TestRecognizer"));
    }

    #[test]
    fn test_score_out_of_range_fails_compilation() {
        let mut bad = config(r"\d+", &[]);
        bad.patterns[0].score = 1.5;
        assert!(PatternRecognizer::compile(&bad, ContextConfig::default()).is_err());
    }

    #[test]
    fn test_empty_patterns_fail_compilation() {
        let mut bad = config(r"\d+", &[]);
        bad.patterns.clear();
        assert!(PatternRecognizer::compile(&bad, ContextConfig::default()).is_err());
    }

    #[test]
    fn test_detect_all_matches() {
        let recognizer =
            PatternRecognizer::compile(&config(r"\b\d{3}\b", &[]), ContextConfig::default())
                .unwrap();
        let spans = recognizer.detect("a 123 b 456");
        let ranges: Vec<_> = spans.iter().map(|s| (s.start(), s.end())).collect();
        assert_eq!(ranges, vec![(2, 5), (8, 11)]);
        assert!(spans.iter().all(|s| s.score() == 0.5));
        assert!(spans.iter().all(|s| s.recognizer_id() == "TestRecognizer"));
    }

    #[test]
    fn test_zero_length_matches_discarded() {
        let recognizer =
            PatternRecognizer::compile(&config(r"\d*", &[]), ContextConfig::default()).unwrap();
        let spans = recognizer.detect("ab 12");
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].start(), spans[0].end()), (3, 5));
    }

    #[test]
    fn test_context_boost_before_match() {
        let recognizer = PatternRecognizer::compile(
            &config(r"\b\d{5}\b", &["codice"]),
            ContextConfig::default(),
        )
        .unwrap();

        let boosted = recognizer.detect("il Codice è 12345");
        assert_eq!(boosted.len(), 1);
        assert!((boosted[0].score() - 0.85).abs() < 1e-9);

        let plain = recognizer.detect("il numero è 12345");
        assert_eq!(plain[0].score(), 0.5);
    }

    #[test]
    fn test_context_boost_after_match_and_window() {
        let context = ContextConfig {
            window: 2,
            boost: 0.35,
        };
        let recognizer =
            PatternRecognizer::compile(&config(r"\b\d{5}\b", &["codice"]), context).unwrap();

        assert!(recognizer.detect("12345 il codice")[0].score() > 0.5);
        // outside the two-word window
        assert_eq!(recognizer.detect("codice a b c 12345")[0].score(), 0.5);
    }

    #[test]
    fn test_unbounded_context_window() {
        let context = ContextConfig {
            window: usize::MAX,
            boost: 0.35,
        };
        let recognizer =
            PatternRecognizer::compile(&config(r"\b\d{5}\b", &["codice"]), context).unwrap();

        assert!(recognizer.detect("12345 a b c d e f codice")[0].score() > 0.5);
        assert!(recognizer.detect("codice a b c d e f 12345")[0].score() > 0.5);
        assert_eq!(recognizer.detect("12345")[0].score(), 0.5);
    }

    #[test]
    fn test_context_phrase_and_clamp() {
        let mut cfg = config(r"\b\d{5}\b", &["sede legale"]);
        cfg.patterns[0].score = 0.9;
        let recognizer = PatternRecognizer::compile(&cfg, ContextConfig::default()).unwrap();

        assert_eq!(recognizer.detect("sede legale 12345")[0].score(), 1.0);
        assert_eq!(recognizer.detect("legale sede 12345")[0].score(), 0.9);
    }

    #[test]
    fn test_named_group_narrows_span() {
        let recognizer = PatternRecognizer::compile(
            &config(r"prefix:(?P<pii>\w+)", &[]),
            ContextConfig::default(),
        )
        .unwrap();
        let spans = recognizer.detect("x prefix:secret y");
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].start(), spans[0].end()), (9, 15));
    }

    #[test]
    fn test_validator_promotes_or_drops() {
        let mut cfg = config(r"\b\d{16}\b", &[]);
        cfg.validator = Some(ValidatorKind::Luhn);
        let recognizer = PatternRecognizer::compile(&cfg, ContextConfig::default()).unwrap();

        let spans = recognizer.detect("4012888888881881 4012888888881882");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start(), 0);
        assert_eq!(spans[0].score(), 1.0);
    }

    #[test]
    fn test_locale_scoping() {
        let recognizer =
            PatternRecognizer::compile(&config(r"\d+", &[]), ContextConfig::default()).unwrap();
        assert!(recognizer.supports_locale(&Locale::IT));
        assert!(!recognizer.supports_locale(&Locale::new("en")));
    }

    #[test]
    fn test_words_tokenizer() {
        let tokens = words("Città di Roma, via_1!");
        let texts: Vec<_> = tokens.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["città", "di", "roma", "via_1"]);
        assert_eq!(tokens[0].start, 0);
        assert_eq!(tokens[0].end, "Città".len());
    }
}
