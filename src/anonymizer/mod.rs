// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// PII detection and redaction engine
//
// - Pattern recognizers compiled once at startup, plus an injected NER engine
// - Strict accept/discard overlap resolution with deterministic tie-break
// - Operators are data, applied in one forward pass over original offsets

pub mod config;
pub mod error;
pub mod executor;
pub mod masking;
pub mod nlp;
pub mod patterns;
pub mod pipeline;
#[cfg(feature = "python")]
pub mod python;
pub mod recognizer;
pub mod registry;
pub mod resolver;
pub mod span;
pub mod validation;

pub use config::{AnonymizerConfig, EntityType, Locale, NlpFailurePolicy, OperatorKind};
pub use error::{AnonymizerError, Result};
pub use executor::{RedactedItem, Redaction, RedactionExecutor};
pub use masking::OperatorRegistry;
pub use nlp::{NlpEngine, NlpEntity, NlpError};
pub use pipeline::{AnonymizedText, Analysis, Anonymizer};
pub use registry::RecognizerRegistry;
pub use resolver::SpanResolver;
pub use span::Span;
