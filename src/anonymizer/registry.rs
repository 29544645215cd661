// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Ordered, locale-scoped set of recognizers

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use super::config::{AnonymizerConfig, EntityType, Locale, NlpFailurePolicy};
use super::error::{AnonymizerError, Result};
use super::nlp::{ModelRecognizer, NlpEngine};
use super::patterns::compile_patterns;
use super::recognizer::Recognizer;
use super::span::Span;

/// Raw candidates from one detection pass
#[derive(Debug, Clone, Default)]
pub struct Detection {
    /// Unsorted and possibly overlapping
    pub spans: Vec<Span>,
    /// A model recognizer failed and was skipped
    pub degraded: bool,
}

/// Recognizers in registration order
#[derive(Debug)]
pub struct RecognizerRegistry {
    recognizers: Vec<Recognizer>,
    failure_policy: NlpFailurePolicy,
}

impl RecognizerRegistry {
    pub fn new(failure_policy: NlpFailurePolicy) -> Self {
        Self {
            recognizers: Vec::new(),
            failure_policy,
        }
    }

    /// Build from configuration: pattern recognizers in declaration order,
    /// then the model recognizer.
    pub fn from_config(
        config: &AnonymizerConfig,
        nlp_engine: Option<Arc<dyn NlpEngine>>,
    ) -> Result<Self> {
        let mut registry = Self::new(config.nlp.failure_policy);

        for recognizer in compile_patterns(&config.recognizers, config.context)? {
            registry.register(Recognizer::Pattern(recognizer))?;
        }

        match (&config.model, nlp_engine) {
            (Some(model), Some(engine)) => {
                let timeout = config.nlp.timeout_ms.map(Duration::from_millis);
                let recognizer = ModelRecognizer::new(model, engine, timeout)?
                    .with_max_workers(config.nlp.max_workers);
                registry.register(Recognizer::Model(recognizer))?;
            }
            (Some(model), None) => {
                return Err(AnonymizerError::config(format!(
                    "model recognizer '{}' is configured but no NLP engine was supplied",
                    model.name
                )));
            }
            (None, Some(_)) => {
                tracing::warn!("NLP engine supplied without a model recognizer; ignoring it");
            }
            (None, None) => {}
        }

        Ok(registry)
    }

    /// Append a recognizer. Ids must be unique.
    pub fn register(&mut self, recognizer: Recognizer) -> Result<()> {
        if self.recognizers.iter().any(|r| r.id() == recognizer.id()) {
            return Err(AnonymizerError::config(format!(
                "recognizer '{}' registered twice",
                recognizer.id()
            )));
        }
        self.recognizers.push(recognizer);
        Ok(())
    }

    pub fn recognizers(&self) -> &[Recognizer] {
        &self.recognizers
    }

    pub fn len(&self) -> usize {
        self.recognizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recognizers.is_empty()
    }

    /// Recognizer id → registration index
    pub fn recognizer_order(&self) -> HashMap<String, usize> {
        self.recognizers
            .iter()
            .enumerate()
            .map(|(index, r)| (r.id().to_string(), index))
            .collect()
    }

    /// Every entity type some recognizer can emit
    pub fn supported_entities(&self) -> BTreeSet<EntityType> {
        self.recognizers
            .iter()
            .flat_map(|r| r.supported_entities())
            .collect()
    }

    pub fn supports_locale(&self, locale: &Locale) -> bool {
        self.recognizers.iter().any(|r| r.supports_locale(locale))
    }

    /// Run every recognizer applicable to `locale` and concatenate their
    /// candidates.
    pub fn detect(&self, text: &str, locale: &Locale) -> Result<Detection> {
        let mut detection = Detection::default();

        for recognizer in self.recognizers.iter().filter(|r| r.supports_locale(locale)) {
            match recognizer.detect(text, locale) {
                Ok(spans) => detection.spans.extend(spans),
                Err(err @ AnonymizerError::DetectionUnavailable { .. }) => {
                    match self.failure_policy {
                        NlpFailurePolicy::Degrade => {
                            tracing::warn!(
                                recognizer = recognizer.id(),
                                error = %err,
                                "continuing with pattern recognizers only"
                            );
                            detection.degraded = true;
                        }
                        NlpFailurePolicy::Fail => return Err(err),
                    }
                }
                Err(err) => return Err(err),
            }
        }

        Ok(detection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymizer::nlp::{NlpEntity, NlpError};

    struct NameEngine;

    impl NlpEngine for NameEngine {
        fn analyze(
            &self,
            text: &str,
            _locale: &Locale,
        ) -> std::result::Result<Vec<NlpEntity>, NlpError> {
            Ok(text
                .match_indices("Luca Rossi")
                .map(|(start, name)| NlpEntity::new(start, start + name.len(), "PERSON", 0.85))
                .collect())
        }
    }

    struct DownEngine;

    impl NlpEngine for DownEngine {
        fn analyze(
            &self,
            _text: &str,
            _locale: &Locale,
        ) -> std::result::Result<Vec<NlpEntity>, NlpError> {
            Err(NlpError::Engine("connection refused".to_string()))
        }
    }

    struct CrashingEngine;

    impl NlpEngine for CrashingEngine {
        fn analyze(
            &self,
            _text: &str,
            _locale: &Locale,
        ) -> std::result::Result<Vec<NlpEntity>, NlpError> {
            panic!("engine crashed");
        }
    }

    fn config(policy: NlpFailurePolicy) -> AnonymizerConfig {
        let mut config = AnonymizerConfig::default();
        config.nlp.failure_policy = policy;
        config.nlp.timeout_ms = None;
        config
    }

    fn registry(policy: NlpFailurePolicy, engine: impl NlpEngine + 'static) -> RecognizerRegistry {
        RecognizerRegistry::from_config(&config(policy), Some(Arc::new(engine))).unwrap()
    }

    #[test]
    fn test_registration_order() {
        let registry = registry(NlpFailurePolicy::Fail, NameEngine);
        let order = registry.recognizer_order();

        assert_eq!(registry.len(), config(NlpFailurePolicy::Fail).recognizers.len() + 1);
        assert_eq!(order["EmailRecognizer"], 0);
        assert_eq!(order["SpacyRecognizer"], registry.len() - 1);
    }

    #[test]
    fn test_model_without_engine_is_config_error() {
        let err =
            RecognizerRegistry::from_config(&config(NlpFailurePolicy::Fail), None).unwrap_err();
        assert!(matches!(err, AnonymizerError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_duplicate_recognizer_rejected() {
        let mut cfg = config(NlpFailurePolicy::Fail).pattern_only();
        let first = cfg.recognizers[0].clone();
        cfg.recognizers.push(first);
        assert!(RecognizerRegistry::from_config(&cfg, None).is_err());
    }

    #[test]
    fn test_detect_concatenates_candidates() {
        let registry = registry(NlpFailurePolicy::Fail, NameEngine);
        let detection = registry
            .detect("Luca Rossi, targa HA011HA", &Locale::IT)
            .unwrap();

        assert!(!detection.degraded);
        let types: BTreeSet<_> = detection
            .spans
            .iter()
            .map(|s| s.entity_type().clone())
            .collect();
        assert!(types.contains(&EntityType::PERSON));
        assert!(types.contains(&EntityType::VEHICLE_PLATE));
    }

    #[test]
    fn test_other_locale_runs_nothing() {
        let registry = registry(NlpFailurePolicy::Fail, NameEngine);
        let detection = registry
            .detect("Luca Rossi, targa HA011HA", &Locale::new("en"))
            .unwrap();
        assert!(detection.spans.is_empty());
        assert!(!registry.supports_locale(&Locale::new("en")));
    }

    #[test]
    fn test_degrade_policy() {
        let registry = registry(NlpFailurePolicy::Degrade, DownEngine);
        let detection = registry.detect("targa HA011HA", &Locale::IT).unwrap();
        assert!(detection.degraded);
        assert_eq!(detection.spans.len(), 1);
    }

    #[test]
    fn test_inline_engine_panic_follows_policy() {
        let degrading = registry(NlpFailurePolicy::Degrade, CrashingEngine);
        let detection = degrading.detect("targa HA011HA", &Locale::IT).unwrap();
        assert!(detection.degraded);
        assert_eq!(detection.spans.len(), 1);

        let failing = registry(NlpFailurePolicy::Fail, CrashingEngine);
        let err = failing.detect("targa HA011HA", &Locale::IT).unwrap_err();
        assert!(matches!(err, AnonymizerError::DetectionUnavailable { .. }));
    }

    #[test]
    fn test_fail_policy() {
        let registry = registry(NlpFailurePolicy::Fail, DownEngine);
        let err = registry.detect("targa HA011HA", &Locale::IT).unwrap_err();
        assert!(matches!(err, AnonymizerError::DetectionUnavailable { .. }));
    }

    #[test]
    fn test_supported_entities() {
        let registry = registry(NlpFailurePolicy::Fail, NameEngine);
        let entities = registry.supported_entities();
        assert!(entities.contains(&EntityType::PERSON));
        assert!(entities.contains(&EntityType::IBAN_CODE));
        assert!(entities.contains(&EntityType::MEDICAL_REFERENCE));
    }
}
