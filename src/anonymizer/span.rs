// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Scored, typed annotation over the original input text

use std::sync::Arc;
use thiserror::Error;

use super::config::EntityType;

/// Reasons a candidate range is rejected at the recognizer boundary
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidSpan {
    #[error("empty or reversed range {start}..{end}")]
    Empty { start: usize, end: usize },
    #[error("range end {end} exceeds text length {len}")]
    OutOfBounds { end: usize, len: usize },
    #[error("range {start}..{end} splits a character")]
    NotCharBoundary { start: usize, end: usize },
    #[error("score {0} is not a finite number")]
    BadScore(f64),
}

/// Half-open byte range `[start, end)` of the original text, tagged with
/// an entity type and a confidence score.
///
/// Offsets always fall on `char` boundaries of the text the span was
/// created against.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    start: usize,
    end: usize,
    entity_type: EntityType,
    score: f64,
    recognizer_id: Arc<str>,
}

impl Span {
    /// Validate a candidate range against `text`. Finite scores are
    /// clamped into `[0, 1]`.
    pub fn try_new(
        text: &str,
        start: usize,
        end: usize,
        entity_type: EntityType,
        score: f64,
        recognizer_id: Arc<str>,
    ) -> Result<Self, InvalidSpan> {
        if start >= end {
            return Err(InvalidSpan::Empty { start, end });
        }
        if end > text.len() {
            return Err(InvalidSpan::OutOfBounds {
                end,
                len: text.len(),
            });
        }
        if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            return Err(InvalidSpan::NotCharBoundary { start, end });
        }
        if !score.is_finite() {
            return Err(InvalidSpan::BadScore(score));
        }

        Ok(Self {
            start,
            end,
            entity_type,
            score: score.clamp(0.0, 1.0),
            recognizer_id,
        })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Always false: empty spans cannot be constructed
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn recognizer_id(&self) -> &str {
        &self.recognizer_id
    }

    /// `[start, end)` ranges intersect
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Copy with a different score (used for context boosting)
    pub(crate) fn with_score(&self, score: f64) -> Self {
        Self {
            score: if score.is_finite() {
                score.clamp(0.0, 1.0)
            } else {
                self.score
            },
            ..self.clone()
        }
    }
}
