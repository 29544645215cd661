// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Configuration types for the anonymizer

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use super::error::{AnonymizerError, Result};
use super::patterns;

/// Environment variable naming a JSON configuration file
pub const CONFIG_PATH_ENV: &str = "ANONYMIZER_CONFIG_PATH";

/// PII category identifier. Open-ended: any string names a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(Cow<'static, str>);

impl EntityType {
    pub const PERSON: EntityType = EntityType::from_static("PERSON");
    pub const LOCATION: EntityType = EntityType::from_static("LOCATION");
    pub const EMAIL_ADDRESS: EntityType = EntityType::from_static("EMAIL_ADDRESS");
    pub const PHONE_NUMBER: EntityType = EntityType::from_static("PHONE_NUMBER");
    pub const CREDIT_CARD: EntityType = EntityType::from_static("CREDIT_CARD");
    pub const IBAN_CODE: EntityType = EntityType::from_static("IBAN_CODE");
    pub const CRYPTO: EntityType = EntityType::from_static("CRYPTO");
    pub const FISCAL_CODE: EntityType = EntityType::from_static("FISCAL_CODE");
    pub const VAT_CODE: EntityType = EntityType::from_static("VAT_CODE");
    pub const DRIVER_LICENSE: EntityType = EntityType::from_static("DRIVER_LICENSE");
    pub const PASSPORT: EntityType = EntityType::from_static("PASSPORT");
    pub const IDENTITY_CARD: EntityType = EntityType::from_static("IDENTITY_CARD");
    pub const ADDRESS: EntityType = EntityType::from_static("ADDRESS");
    pub const VEHICLE_PLATE: EntityType = EntityType::from_static("VEHICLE_PLATE");
    /// Numero Avviso (pagoPA payment notice number)
    pub const PAYMENT_NOTICE: EntityType = EntityType::from_static("PAYMENT_NOTICE");
    /// IUV (Identificativo Univoco di Versamento)
    pub const PAYMENT_ID: EntityType = EntityType::from_static("PAYMENT_ID");
    pub const MEDICAL_REFERENCE: EntityType = EntityType::from_static("MEDICAL_REFERENCE");

    pub const fn from_static(name: &'static str) -> Self {
        EntityType(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        EntityType(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Language tag selecting recognizers and operator overrides
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(Cow<'static, str>);

impl Locale {
    pub const IT: Locale = Locale(Cow::Borrowed("it"));

    pub fn new(tag: impl Into<String>) -> Self {
        Locale(Cow::Owned(tag.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::IT
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Checksum applied to pattern matches. Passing matches score 1.0,
/// failing matches are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    Luhn,
    Iban,
    ItalianVat,
}

/// Single regex with its base score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    pub name: String,
    pub regex: String,
    pub score: f64,
}

/// Declarative pattern recognizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecognizerConfig {
    pub name: String,
    pub entity_type: EntityType,
    pub patterns: Vec<PatternConfig>,
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default = "default_locales")]
    pub locales: Vec<Locale>,
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default)]
    pub validator: Option<ValidatorKind>,
}

/// Model recognizer: maps external NER categories to local entity types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecognizerConfig {
    pub name: String,
    #[serde(default = "default_locales")]
    pub locales: Vec<Locale>,
    pub categories: BTreeMap<String, EntityType>,
}

impl Default for ModelRecognizerConfig {
    fn default() -> Self {
        let categories = [
            ("PERSON", EntityType::PERSON),
            ("PER", EntityType::PERSON),
            ("LOCATION", EntityType::LOCATION),
            ("LOC", EntityType::LOCATION),
            ("GPE", EntityType::LOCATION),
        ]
        .into_iter()
        .map(|(category, entity)| (category.to_string(), entity))
        .collect();

        Self {
            name: "SpacyRecognizer".to_string(),
            locales: default_locales(),
            categories,
        }
    }
}

/// Masking transform applied to a resolved span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperatorKind {
    /// Fixed placeholder, e.g. `<PERSON>`
    Replace { new_value: String },
    /// Keep the first `keep` chars of every word
    Initials {
        #[serde(default = "default_initials_keep")]
        keep: usize,
    },
    /// Keep the first/last chars, mask the middle
    Keep {
        #[serde(default)]
        first: usize,
        #[serde(default)]
        last: usize,
    },
    /// Like `keep`, counting only non-separator chars; separators stay put
    KeepGrouped {
        #[serde(default)]
        first: usize,
        #[serde(default)]
        last: usize,
    },
    /// Letters and whitespace only
    AlphaOnly,
    /// Mask every separator-delimited group except the last
    Groups {
        #[serde(default = "default_group_keep_last")]
        keep_last: usize,
    },
    /// Mask the local part of an email address
    EmailLocal,
    /// Mask a fixed number of chars from one end
    Mask {
        chars_to_mask: usize,
        #[serde(default)]
        from_end: bool,
    },
    /// SHA-256 digest of the value
    Hash,
    /// Remove the value entirely
    Redact,
}

/// Operator table with mandatory default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorTable {
    pub default: OperatorKind,
    #[serde(default)]
    pub entities: BTreeMap<EntityType, OperatorKind>,
    #[serde(default)]
    pub locale_overrides: BTreeMap<Locale, BTreeMap<EntityType, OperatorKind>>,
}

impl Default for OperatorTable {
    fn default() -> Self {
        let keep = |first, last| OperatorKind::Keep { first, last };
        let entities = [
            (EntityType::PERSON, OperatorKind::Initials { keep: 1 }),
            (
                EntityType::LOCATION,
                OperatorKind::Replace {
                    new_value: "<LOCATION>".to_string(),
                },
            ),
            (EntityType::EMAIL_ADDRESS, OperatorKind::EmailLocal),
            (EntityType::PHONE_NUMBER, keep(0, 4)),
            (EntityType::CREDIT_CARD, OperatorKind::Groups { keep_last: 4 }),
            (
                EntityType::IBAN_CODE,
                OperatorKind::KeepGrouped { first: 5, last: 4 },
            ),
            (EntityType::CRYPTO, keep(0, 3)),
            (EntityType::FISCAL_CODE, keep(8, 0)),
            (EntityType::VAT_CODE, keep(0, 3)),
            (EntityType::DRIVER_LICENSE, keep(2, 2)),
            (EntityType::PASSPORT, keep(2, 2)),
            (EntityType::IDENTITY_CARD, keep(2, 2)),
            (EntityType::ADDRESS, OperatorKind::AlphaOnly),
            (EntityType::VEHICLE_PLATE, keep(3, 0)),
            (
                EntityType::MEDICAL_REFERENCE,
                OperatorKind::Replace {
                    new_value: "<MEDICAL_REFERENCE>".to_string(),
                },
            ),
        ]
        .into_iter()
        .collect();

        Self {
            default: OperatorKind::Replace {
                new_value: "<ANONYMIZED>".to_string(),
            },
            entities,
            locale_overrides: BTreeMap::new(),
        }
    }
}

/// Context-word boosting parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Words inspected on each side of a match
    pub window: usize,
    /// Score added when a context word is found
    pub boost: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            window: 5,
            boost: 0.35,
        }
    }
}

/// What to do when the NLP engine cannot answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NlpFailurePolicy {
    /// Continue with pattern recognizers only
    Degrade,
    /// Fail the whole request
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NlpConfig {
    /// Required: there is no implicit policy
    pub failure_policy: NlpFailurePolicy,
    /// Upper bound on one engine call. Each bounded call runs on its own
    /// worker thread; a worker that outlives its timeout keeps running
    /// detached until the engine returns. `None` calls the engine inline.
    #[serde(default = "default_nlp_timeout_ms")]
    pub timeout_ms: Option<u64>,
    /// Cap on engine workers alive at once, detached ones included. Calls
    /// beyond it fail fast instead of spawning more threads.
    #[serde(default = "default_nlp_max_workers")]
    pub max_workers: usize,
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self {
            failure_policy: NlpFailurePolicy::Fail,
            timeout_ms: default_nlp_timeout_ms(),
            max_workers: default_nlp_max_workers(),
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymizerConfig {
    #[serde(default = "default_locales")]
    pub supported_locales: Vec<Locale>,

    #[serde(default = "patterns::italian_recognizers")]
    pub recognizers: Vec<PatternRecognizerConfig>,

    #[serde(default = "default_model")]
    pub model: Option<ModelRecognizerConfig>,

    #[serde(default)]
    pub operators: OperatorTable,

    /// Tie-break order for entity types (earlier wins)
    #[serde(default = "default_entity_priority")]
    pub entity_priority: Vec<EntityType>,

    /// Entity types to redact; `None` keeps every detected type
    #[serde(default = "default_entities")]
    pub entities: Option<Vec<EntityType>>,

    /// Regexes for values that must never be redacted
    #[serde(default)]
    pub allow_list: Vec<String>,

    #[serde(default)]
    pub score_threshold: f64,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default = "default_mask_char")]
    pub mask_char: char,

    pub nlp: NlpConfig,
}

impl Default for AnonymizerConfig {
    fn default() -> Self {
        Self {
            supported_locales: default_locales(),
            recognizers: patterns::italian_recognizers(),
            model: default_model(),
            operators: OperatorTable::default(),
            entity_priority: default_entity_priority(),
            entities: default_entities(),
            allow_list: Vec::new(),
            score_threshold: 0.0,
            context: ContextConfig::default(),
            mask_char: default_mask_char(),
            nlp: NlpConfig::default(),
        }
    }
}

impl AnonymizerConfig {
    /// Parse a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| AnonymizerError::config(format!("failed to parse configuration: {e}")))
    }

    /// Read a JSON configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AnonymizerError::config(format!("failed to read '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Load from `ANONYMIZER_CONFIG_PATH`, or the built-in profile when unset
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => {
                tracing::info!(
                    path = %Path::new(&path).display(),
                    "loading anonymizer configuration"
                );
                Self::from_path(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Same configuration without the model recognizer or operators for
    /// types only the model produces.
    pub fn pattern_only(mut self) -> Self {
        if let Some(model) = self.model.take() {
            let pattern_types: Vec<&EntityType> =
                self.recognizers.iter().map(|r| &r.entity_type).collect();
            let model_only: Vec<EntityType> = model
                .categories
                .into_values()
                .filter(|entity| !pattern_types.contains(&entity))
                .collect();
            self.operators
                .entities
                .retain(|entity, _| !model_only.contains(entity));
            for overrides in self.operators.locale_overrides.values_mut() {
                overrides.retain(|entity, _| !model_only.contains(entity));
            }
        }
        self
    }
}

fn default_locales() -> Vec<Locale> {
    vec![Locale::IT]
}

fn default_model() -> Option<ModelRecognizerConfig> {
    Some(ModelRecognizerConfig::default())
}

fn default_initials_keep() -> usize {
    1
}

fn default_group_keep_last() -> usize {
    4
}

fn default_nlp_timeout_ms() -> Option<u64> {
    Some(5_000)
}

fn default_nlp_max_workers() -> usize {
    16
}

fn default_mask_char() -> char {
    '*'
}

fn default_entity_priority() -> Vec<EntityType> {
    vec![
        EntityType::FISCAL_CODE,
        EntityType::IBAN_CODE,
        EntityType::CREDIT_CARD,
        EntityType::EMAIL_ADDRESS,
        EntityType::PHONE_NUMBER,
        EntityType::VAT_CODE,
        EntityType::IDENTITY_CARD,
        EntityType::PASSPORT,
        EntityType::DRIVER_LICENSE,
        EntityType::VEHICLE_PLATE,
        EntityType::PAYMENT_NOTICE,
        EntityType::PAYMENT_ID,
        EntityType::CRYPTO,
        EntityType::ADDRESS,
        EntityType::MEDICAL_REFERENCE,
        EntityType::PERSON,
        EntityType::LOCATION,
    ]
}

// LOCATION is detected by the model but left in clear text.
fn default_entities() -> Option<Vec<EntityType>> {
    let mut entities = default_entity_priority();
    entities.retain(|entity| *entity != EntityType::LOCATION);
    Some(entities)
}
