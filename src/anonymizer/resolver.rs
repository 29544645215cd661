// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Overlap resolution: strict accept/discard with deterministic tie-break

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use super::config::EntityType;
use super::span::Span;

/// Reduces overlapping candidates to a sorted, non-overlapping set
#[derive(Debug, Clone, Default)]
pub struct SpanResolver {
    recognizer_order: HashMap<String, usize>,
    entity_priority: HashMap<EntityType, usize>,
}

impl SpanResolver {
    /// `recognizer_order` maps recognizer ids to registration index.
    /// Unknown recognizers and entity types sort after known ones.
    pub fn new(recognizer_order: HashMap<String, usize>, entity_priority: &[EntityType]) -> Self {
        let mut priority = HashMap::with_capacity(entity_priority.len());
        for (index, entity) in entity_priority.iter().enumerate() {
            priority.entry(entity.clone()).or_insert(index);
        }

        Self {
            recognizer_order,
            entity_priority: priority,
        }
    }

    /// Highest score first, then leftmost, then longest, then earliest
    /// recognizer, then earliest entity priority.
    fn compare(&self, a: &Span, b: &Span) -> Ordering {
        b.score()
            .total_cmp(&a.score())
            .then_with(|| a.start().cmp(&b.start()))
            .then_with(|| b.len().cmp(&a.len()))
            .then_with(|| self.recognizer_rank(a).cmp(&self.recognizer_rank(b)))
            .then_with(|| self.entity_rank(a).cmp(&self.entity_rank(b)))
            .then_with(|| a.entity_type().cmp(b.entity_type()))
            .then_with(|| a.recognizer_id().cmp(b.recognizer_id()))
    }

    fn recognizer_rank(&self, span: &Span) -> usize {
        self.recognizer_order
            .get(span.recognizer_id())
            .copied()
            .unwrap_or(usize::MAX)
    }

    fn entity_rank(&self, span: &Span) -> usize {
        self.entity_priority
            .get(span.entity_type())
            .copied()
            .unwrap_or(usize::MAX)
    }

    /// Resolve candidates into spans sorted by start, none overlapping
    pub fn resolve(&self, mut candidates: Vec<Span>) -> Vec<Span> {
        candidates.sort_by(|a, b| self.compare(a, b));

        // start -> end of accepted spans
        let mut occupied: BTreeMap<usize, usize> = BTreeMap::new();
        let mut accepted: BTreeMap<usize, Span> = BTreeMap::new();

        for candidate in candidates {
            // Accepted spans are disjoint, so only the last one starting
            // before the candidate's end can reach into it.
            let blocked = occupied
                .range(..candidate.end())
                .next_back()
                .is_some_and(|(_, &end)| end > candidate.start());
            if blocked {
                continue;
            }
            occupied.insert(candidate.start(), candidate.end());
            accepted.insert(candidate.start(), candidate);
        }

        accepted.into_values().collect()
    }
}
