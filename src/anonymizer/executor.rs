// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Applies operators to resolved spans against original offsets

use std::borrow::Cow;

use super::config::{EntityType, Locale};
use super::error::{AnonymizerError, Result};
use super::masking::OperatorRegistry;
use super::span::Span;

/// Record of one replaced span. Never holds the original value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactedItem {
    /// Byte offsets into the original text
    pub start: usize,
    pub end: usize,
    pub entity_type: EntityType,
    pub operator: &'static str,
    /// Byte length of the replacement
    pub replacement_len: usize,
}

/// Redacted text and what was replaced
#[derive(Debug, Clone, PartialEq)]
pub struct Redaction<'a> {
    pub text: Cow<'a, str>,
    pub items: Vec<RedactedItem>,
}

/// Rebuilds the text in one forward pass over sorted, disjoint spans
#[derive(Debug, Clone)]
pub struct RedactionExecutor {
    operators: OperatorRegistry,
}

impl RedactionExecutor {
    pub fn new(operators: OperatorRegistry) -> Self {
        Self { operators }
    }

    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    /// Apply the operator of every span. Spans must be sorted by start and
    /// must not overlap; anything else is an internal error and no text is
    /// returned.
    pub fn apply<'a>(
        &self,
        text: &'a str,
        spans: &[Span],
        locale: &Locale,
    ) -> Result<Redaction<'a>> {
        if spans.is_empty() {
            // Zero-copy when nothing to redact
            return Ok(Redaction {
                text: Cow::Borrowed(text),
                items: Vec::new(),
            });
        }

        let mask_char = self.operators.mask_char();
        let mut output = String::with_capacity(text.len());
        let mut items = Vec::with_capacity(spans.len());
        let mut cursor = 0;

        for span in spans {
            if span.start() < cursor {
                return Err(AnonymizerError::Internal(format!(
                    "span {}..{} starts before the previous span ends at {cursor}",
                    span.start(),
                    span.end()
                )));
            }
            let (Some(gap), Some(value)) = (
                text.get(cursor..span.start()),
                text.get(span.start()..span.end()),
            ) else {
                return Err(AnonymizerError::Internal(format!(
                    "span {}..{} does not fit a text of {} bytes",
                    span.start(),
                    span.end(),
                    text.len()
                )));
            };

            let operator = self.operators.resolve(span.entity_type(), locale);
            let replacement = operator.apply(value, mask_char);

            output.push_str(gap);
            output.push_str(&replacement);
            items.push(RedactedItem {
                start: span.start(),
                end: span.end(),
                entity_type: span.entity_type().clone(),
                operator: operator.name(),
                replacement_len: replacement.len(),
            });
            cursor = span.end();
        }

        output.push_str(&text[cursor..]);

        Ok(Redaction {
            text: Cow::Owned(output),
            items,
        })
    }
}
