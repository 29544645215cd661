// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Masking operators and the entity-type → operator registry

use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use super::config::{AnonymizerConfig, EntityType, Locale, OperatorKind, OperatorTable};
use super::error::{AnonymizerError, Result};

impl OperatorKind {
    /// Stable operator name, as used in the configuration `type` tag
    pub fn name(&self) -> &'static str {
        match self {
            OperatorKind::Replace { .. } => "replace",
            OperatorKind::Initials { .. } => "initials",
            OperatorKind::Keep { .. } => "keep",
            OperatorKind::KeepGrouped { .. } => "keep_grouped",
            OperatorKind::AlphaOnly => "alpha_only",
            OperatorKind::Groups { .. } => "groups",
            OperatorKind::EmailLocal => "email_local",
            OperatorKind::Mask { .. } => "mask",
            OperatorKind::Hash => "hash",
            OperatorKind::Redact => "redact",
        }
    }

    /// Output has the same `char` count as any input
    pub fn preserves_length(&self) -> bool {
        matches!(
            self,
            OperatorKind::Keep { .. }
                | OperatorKind::KeepGrouped { .. }
                | OperatorKind::Groups { .. }
                | OperatorKind::EmailLocal
                | OperatorKind::Mask { .. }
        )
    }

    /// Transform a matched value. Total for every input string.
    pub fn apply(&self, value: &str, mask_char: char) -> String {
        match self {
            OperatorKind::Replace { new_value } => new_value.clone(),
            OperatorKind::Initials { keep } => initials(value, *keep, mask_char),
            OperatorKind::Keep { first, last } => keep_ends(value, *first, *last, mask_char),
            OperatorKind::KeepGrouped { first, last } => {
                keep_ends_grouped(value, *first, *last, mask_char)
            }
            OperatorKind::AlphaOnly => alpha_only(value),
            OperatorKind::Groups { keep_last } => groups(value, *keep_last, mask_char),
            OperatorKind::EmailLocal => email_local(value, mask_char),
            OperatorKind::Mask {
                chars_to_mask,
                from_end,
            } => mask_chars(value, *chars_to_mask, *from_end, mask_char),
            OperatorKind::Hash => hash(value),
            OperatorKind::Redact => String::new(),
        }
    }
}

fn full_mask(value: &str, mask_char: char) -> String {
    value.chars().map(|_| mask_char).collect()
}

/// First `keep` chars of every word, rest masked: "Luca Rossi" -> "L*** R****"
fn initials(value: &str, keep: usize, mask_char: char) -> String {
    let words: Vec<String> = value
        .split_whitespace()
        .map(|word| {
            let len = word.chars().count();
            if len <= keep {
                full_mask(word, mask_char)
            } else {
                word.chars()
                    .enumerate()
                    .map(|(i, c)| if i < keep { c } else { mask_char })
                    .collect()
            }
        })
        .collect();

    if words.is_empty() {
        return full_mask(value, mask_char);
    }
    words.join(" ")
}

/// Keep the first `first` and last `last` chars, mask the middle
fn keep_ends(value: &str, first: usize, last: usize, mask_char: char) -> String {
    let len = value.chars().count();
    if len <= first.saturating_add(last) {
        return full_mask(value, mask_char);
    }

    value
        .chars()
        .enumerate()
        .map(|(i, c)| {
            if i < first || i >= len - last {
                c
            } else {
                mask_char
            }
        })
        .collect()
}

/// `keep_ends` over the non-separator chars:
/// "IT47 J099 0650 0251" -> "IT47 J*** **** 0251"
fn keep_ends_grouped(value: &str, first: usize, last: usize, mask_char: char) -> String {
    let len = value.chars().filter(|c| !is_separator(*c)).count();
    let full = len <= first.saturating_add(last);

    let mut index = 0;
    value
        .chars()
        .map(|c| {
            if is_separator(c) {
                return c;
            }
            let i = index;
            index += 1;
            if !full && (i < first || i >= len - last) {
                c
            } else {
                mask_char
            }
        })
        .collect()
}

fn alpha_only(value: &str) -> String {
    let kept: String = value
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect();
    kept.trim().to_string()
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == '-'
}

/// Mask every separator-delimited group except the last
fn groups(value: &str, keep_last: usize, mask_char: char) -> String {
    let body = value.trim_end_matches(is_separator);
    let last_group = body
        .char_indices()
        .rev()
        .find(|(_, c)| is_separator(*c))
        .map(|(i, c)| i + c.len_utf8());

    let Some(last_group) = last_group else {
        let mut masked = keep_ends(body, 0, keep_last, mask_char);
        masked.push_str(&value[body.len()..]);
        return masked;
    };

    let mut masked = String::with_capacity(value.len());
    masked.extend(
        value[..last_group]
            .chars()
            .map(|c| if is_separator(c) { c } else { mask_char }),
    );
    masked.push_str(&value[last_group..]);
    masked
}

/// "lucarossi@pagopa.it" -> "l*******i@pagopa.it"
fn email_local(value: &str, mask_char: char) -> String {
    match value.split_once('@') {
        Some((local, domain)) => {
            format!("{}@{}", keep_ends(local, 1, 1, mask_char), domain)
        }
        None => full_mask(value, mask_char),
    }
}

fn mask_chars(value: &str, chars_to_mask: usize, from_end: bool, mask_char: char) -> String {
    let len = value.chars().count();
    let count = chars_to_mask.min(len);

    value
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let masked = if from_end { i >= len - count } else { i < count };
            if masked {
                mask_char
            } else {
                c
            }
        })
        .collect()
}

/// Lowercase hex SHA-256 digest
fn hash(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Maps entity types to operators, with per-locale overrides and a
/// mandatory default
#[derive(Debug, Clone)]
pub struct OperatorRegistry {
    table: OperatorTable,
    mask_char: char,
}

impl OperatorRegistry {
    pub fn new(table: OperatorTable, mask_char: char) -> Self {
        Self { table, mask_char }
    }

    /// Build from configuration. Every entity type named in the table must
    /// be one some recognizer can produce.
    pub fn from_config(
        config: &AnonymizerConfig,
        producible: &BTreeSet<EntityType>,
    ) -> Result<Self> {
        let named = config.operators.entities.keys().chain(
            config
                .operators
                .locale_overrides
                .values()
                .flat_map(|overrides| overrides.keys()),
        );
        for entity in named {
            if !producible.contains(entity) {
                return Err(AnonymizerError::config(format!(
                    "operator configured for entity type '{entity}' which no recognizer produces"
                )));
            }
        }

        Ok(Self::new(config.operators.clone(), config.mask_char))
    }

    /// Locale override, then the general entry, then the default
    pub fn resolve(&self, entity_type: &EntityType, locale: &Locale) -> &OperatorKind {
        self.table
            .locale_overrides
            .get(locale)
            .and_then(|overrides| overrides.get(entity_type))
            .or_else(|| self.table.entities.get(entity_type))
            .unwrap_or(&self.table.default)
    }

    pub fn mask_char(&self) -> char {
        self.mask_char
    }
}
