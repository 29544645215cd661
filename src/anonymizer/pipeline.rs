// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// End-to-end detection and redaction

use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use super::config::{AnonymizerConfig, EntityType, Locale};
use super::error::{AnonymizerError, Result};
use super::executor::{RedactedItem, RedactionExecutor};
use super::masking::OperatorRegistry;
use super::nlp::NlpEngine;
use super::registry::RecognizerRegistry;
use super::resolver::SpanResolver;
use super::span::Span;

/// Resolved annotations for one text
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Sorted by start, non-overlapping
    pub spans: Vec<Span>,
    /// Detection ran without the model recognizer
    pub degraded: bool,
}

/// Redacted text with a record of each replacement
#[derive(Debug, Clone, PartialEq)]
pub struct AnonymizedText {
    pub text: String,
    pub items: Vec<RedactedItem>,
    pub degraded: bool,
}

/// Detection-and-redaction engine.
///
/// Built once from an immutable configuration snapshot and shared
/// read-only across threads.
///
/// # Example
/// ```
/// use anonymizer_rust::anonymizer::{Anonymizer, AnonymizerConfig, Locale};
///
/// let config = AnonymizerConfig::default().pattern_only();
/// let anonymizer = Anonymizer::new(config, None).unwrap();
///
/// let text = anonymizer.detect_and_redact("Macchina HA011HA", &Locale::IT).unwrap();
/// assert_eq!(text, "Macchina HA0****");
/// ```
#[derive(Debug)]
pub struct Anonymizer {
    registry: RecognizerRegistry,
    resolver: SpanResolver,
    executor: RedactionExecutor,
    supported_locales: Vec<Locale>,
    entities: Option<HashSet<EntityType>>,
    allow_list: Vec<Regex>,
    score_threshold: f64,
}

impl Anonymizer {
    /// Compile the configuration. Every configuration problem surfaces here
    /// as `InvalidConfiguration`.
    pub fn new(config: AnonymizerConfig, nlp_engine: Option<Arc<dyn NlpEngine>>) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.score_threshold) {
            return Err(AnonymizerError::config(format!(
                "score_threshold {} outside [0, 1]",
                config.score_threshold
            )));
        }
        if !(0.0..=1.0).contains(&config.context.boost) {
            return Err(AnonymizerError::config(format!(
                "context boost {} outside [0, 1]",
                config.context.boost
            )));
        }
        if config.supported_locales.is_empty() {
            return Err(AnonymizerError::config("no supported locales"));
        }
        if config.nlp.max_workers == 0 {
            return Err(AnonymizerError::config("nlp max_workers must be at least 1"));
        }

        let registry = RecognizerRegistry::from_config(&config, nlp_engine)?;
        let producible = registry.supported_entities();
        let operators = OperatorRegistry::from_config(&config, &producible)?;
        let resolver = SpanResolver::new(registry.recognizer_order(), &config.entity_priority);

        let allow_list = config
            .allow_list
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    AnonymizerError::config(format!("invalid allow_list pattern: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let entities = config.entities.map(|entities| {
            for entity in entities.iter().filter(|e| !producible.contains(*e)) {
                tracing::warn!(
                    entity = %entity,
                    "entity type enabled but no recognizer produces it"
                );
            }
            entities.into_iter().collect::<HashSet<_>>()
        });

        let locales: Vec<&str> = config.supported_locales.iter().map(Locale::as_str).collect();
        tracing::info!(
            recognizers = registry.len(),
            locales = ?locales,
            "anonymizer initialized"
        );

        Ok(Self {
            registry,
            resolver,
            executor: RedactionExecutor::new(operators),
            supported_locales: config.supported_locales,
            entities,
            allow_list,
            score_threshold: config.score_threshold,
        })
    }

    pub fn supported_locales(&self) -> &[Locale] {
        &self.supported_locales
    }

    pub fn registry(&self) -> &RecognizerRegistry {
        &self.registry
    }

    fn check_locale(&self, locale: &Locale) -> Result<()> {
        if self.supported_locales.contains(locale) {
            Ok(())
        } else {
            Err(AnonymizerError::InvalidInput(format!(
                "unsupported locale '{locale}'"
            )))
        }
    }

    fn keep_candidate(&self, text: &str, span: &Span) -> bool {
        if span.score() < self.score_threshold {
            return false;
        }
        if let Some(entities) = &self.entities {
            if !entities.contains(span.entity_type()) {
                return false;
            }
        }
        let allowed = text
            .get(span.start()..span.end())
            .is_some_and(|value| self.allow_list.iter().any(|pattern| pattern.is_match(value)));
        !allowed
    }

    /// Detect and resolve PII spans without redacting
    pub fn analyze(&self, text: &str, locale: &Locale) -> Result<Analysis> {
        self.check_locale(locale)?;
        let started = Instant::now();

        let detection = self.registry.detect(text, locale)?;
        let candidates = detection.spans.len();

        let kept: Vec<Span> = detection
            .spans
            .into_iter()
            .filter(|span| self.keep_candidate(text, span))
            .collect();
        let spans = self.resolver.resolve(kept);

        tracing::debug!(
            locale = %locale,
            text_len = text.len(),
            candidates,
            entity_count = spans.len(),
            degraded = detection.degraded,
            duration_ms = started.elapsed().as_millis() as u64,
            "analysis complete"
        );

        Ok(Analysis {
            spans,
            degraded: detection.degraded,
        })
    }

    /// Detect, resolve and redact
    pub fn anonymize(&self, text: &str, locale: &Locale) -> Result<AnonymizedText> {
        let analysis = self.analyze(text, locale)?;

        let redaction = self
            .executor
            .apply(text, &analysis.spans, locale)
            .inspect_err(|e| tracing::error!(error = %e, kind = e.label(), "redaction failed"))?;

        Ok(AnonymizedText {
            text: redaction.text.into_owned(),
            items: redaction.items,
            degraded: analysis.degraded,
        })
    }

    /// Redacted copy of `text`
    pub fn detect_and_redact(&self, text: &str, locale: &Locale) -> Result<String> {
        self.anonymize(text, locale).map(|anonymized| anonymized.text)
    }
}
