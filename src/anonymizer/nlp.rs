// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Adapter over an external named-entity recognition engine

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use thiserror::Error;

use super::config::{EntityType, Locale, ModelRecognizerConfig};
use super::error::{AnonymizerError, Result};
use super::span::Span;

/// Entity reported by the engine. Offsets are UTF-8 byte offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct NlpEntity {
    pub start: usize,
    pub end: usize,
    pub category: String,
    pub score: f64,
}

impl NlpEntity {
    pub fn new(start: usize, end: usize, category: impl Into<String>, score: f64) -> Self {
        Self {
            start,
            end,
            category: category.into(),
            score,
        }
    }
}

#[derive(Debug, Error)]
pub enum NlpError {
    #[error("engine error: {0}")]
    Engine(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("engine worker stopped without a result")]
    WorkerLost,
    #[error("engine panicked")]
    Panicked,
    #[error("all {0} engine workers are busy")]
    Saturated(usize),
}

/// Statistical NER capability consumed by the model recognizer
pub trait NlpEngine: Send + Sync {
    fn analyze(&self, text: &str, locale: &Locale) -> std::result::Result<Vec<NlpEntity>, NlpError>;
}

/// Translates engine output into spans
pub struct ModelRecognizer {
    id: Arc<str>,
    engine: Arc<dyn NlpEngine>,
    categories: HashMap<String, EntityType>,
    locales: Vec<Locale>,
    timeout: Option<Duration>,
    max_workers: usize,
    workers: Arc<AtomicUsize>,
}

impl fmt::Debug for ModelRecognizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRecognizer")
            .field("id", &self.id)
            .field("categories", &self.categories)
            .field("locales", &self.locales)
            .field("timeout", &self.timeout)
            .field("max_workers", &self.max_workers)
            .finish_non_exhaustive()
    }
}

impl ModelRecognizer {
    pub fn new(
        config: &ModelRecognizerConfig,
        engine: Arc<dyn NlpEngine>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        if config.categories.is_empty() {
            return Err(AnonymizerError::config(format!(
                "model recognizer '{}' maps no categories",
                config.name
            )));
        }
        if config.locales.is_empty() {
            return Err(AnonymizerError::config(format!(
                "model recognizer '{}' has no locales",
                config.name
            )));
        }

        Ok(Self {
            id: Arc::from(config.name.as_str()),
            engine,
            categories: config
                .categories
                .iter()
                .map(|(category, entity)| (category.clone(), entity.clone()))
                .collect(),
            locales: config.locales.clone(),
            timeout,
            max_workers: usize::MAX,
            workers: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Bound the number of live engine workers
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn supports_locale(&self, locale: &Locale) -> bool {
        self.locales.contains(locale)
    }

    pub fn supported_entities(&self) -> Vec<EntityType> {
        let mut entities: Vec<EntityType> = self.categories.values().cloned().collect();
        entities.sort();
        entities.dedup();
        entities
    }

    /// Call the engine once and map its categories. Engine failures and
    /// timeouts become `DetectionUnavailable`.
    pub fn detect(&self, text: &str, locale: &Locale) -> Result<Vec<Span>> {
        let entities =
            self.call_engine(text, locale)
                .map_err(|e| AnonymizerError::DetectionUnavailable {
                    recognizer: self.id.to_string(),
                    reason: e.to_string(),
                })?;

        let mut spans = Vec::with_capacity(entities.len());
        for entity in entities {
            let Some(entity_type) = self.map_category(&entity.category) else {
                tracing::debug!(
                    recognizer = %self.id,
                    category = %entity.category,
                    "unmapped category"
                );
                continue;
            };
            match Span::try_new(
                text,
                entity.start,
                entity.end,
                entity_type.clone(),
                entity.score,
                Arc::clone(&self.id),
            ) {
                Ok(span) => spans.push(span),
                Err(e) => {
                    tracing::warn!(recognizer = %self.id, error = %e, "discarding engine entity");
                }
            }
        }

        Ok(spans)
    }

    fn map_category(&self, category: &str) -> Option<&EntityType> {
        self.categories
            .get(category)
            .or_else(|| self.categories.get(&category.to_uppercase()))
    }

    fn call_engine(
        &self,
        text: &str,
        locale: &Locale,
    ) -> std::result::Result<Vec<NlpEntity>, NlpError> {
        let Some(timeout) = self.timeout else {
            return analyze_guarded(self.engine.as_ref(), text, locale);
        };

        let slot = WorkerSlot::acquire(&self.workers, self.max_workers)
            .ok_or(NlpError::Saturated(self.max_workers))?;

        let (tx, rx) = mpsc::sync_channel(1);
        let engine = Arc::clone(&self.engine);
        let owned_text = text.to_owned();
        let owned_locale = locale.clone();

        thread::Builder::new()
            .name(format!("nlp-{}", self.id))
            .spawn(move || {
                let result = analyze_guarded(engine.as_ref(), &owned_text, &owned_locale);
                drop(slot);
                // the receiver is gone once the caller timed out
                let _ = tx.send(result);
            })
            .map_err(|e| NlpError::Engine(format!("failed to spawn engine worker: {e}")))?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(NlpError::Timeout(timeout)),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(NlpError::WorkerLost),
        }
    }
}

/// Run the engine, turning a panic into an error. The panic payload may
/// quote the input, so it is not kept.
fn analyze_guarded(
    engine: &dyn NlpEngine,
    text: &str,
    locale: &Locale,
) -> std::result::Result<Vec<NlpEntity>, NlpError> {
    catch_unwind(AssertUnwindSafe(|| engine.analyze(text, locale))).unwrap_or_else(|_| {
        tracing::error!("NLP engine panicked");
        Err(NlpError::Panicked)
    })
}

/// One live engine worker, released on drop
struct WorkerSlot(Arc<AtomicUsize>);

impl WorkerSlot {
    fn acquire(workers: &Arc<AtomicUsize>, max: usize) -> Option<Self> {
        workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .ok()
            .map(|_| Self(Arc::clone(workers)))
    }
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
