// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Property tests for resolution, rewriting and masking invariants

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use anonymizer_rust::anonymizer::{
    Anonymizer, AnonymizerConfig, EntityType, Locale, OperatorKind, Span, SpanResolver,
};

const TEXT: &str = "multa a Luca Rossi targa HA011HA iban IT47J0990650025128761820997";

const ENTITIES: [EntityType; 3] = [
    EntityType::PERSON,
    EntityType::VEHICLE_PLATE,
    EntityType::IBAN_CODE,
];
const RECOGNIZERS: [&str; 3] = ["first", "second", "third"];

fn candidate() -> impl Strategy<Value = Span> {
    (0..TEXT.len() - 1, 1usize..20, 0u8..=10, 0..ENTITIES.len(), 0..RECOGNIZERS.len()).prop_map(
        |(start, len, score, entity, recognizer)| {
            Span::try_new(
                TEXT,
                start,
                (start + len).min(TEXT.len()),
                ENTITIES[entity].clone(),
                f64::from(score) / 10.0,
                Arc::from(RECOGNIZERS[recognizer]),
            )
            .unwrap()
        },
    )
}

fn resolver() -> SpanResolver {
    let order: HashMap<String, usize> = RECOGNIZERS
        .iter()
        .enumerate()
        .map(|(index, id)| (id.to_string(), index))
        .collect();
    SpanResolver::new(order, &ENTITIES)
}

fn anonymizer() -> &'static Anonymizer {
    static ANONYMIZER: OnceLock<Anonymizer> = OnceLock::new();
    ANONYMIZER.get_or_init(|| {
        Anonymizer::new(AnonymizerConfig::default().pattern_only(), None).unwrap()
    })
}

fn sentence() -> impl Strategy<Value = String> {
    let words = vec![
        "multa",
        "a",
        "Luca",
        "Rossi",
        "targa",
        "HA011HA",
        "IT47J0990650025128761820997",
        "lucarossi@pagopa.it",
        "4012 8888 8888 1881",
        "città",
        "è",
        "3485536559",
        "RSSLCU80A01F205I",
        "Via Roma 12",
        "visita medica",
        "ciao,",
    ];
    prop::collection::vec(prop::sample::select(words), 0..30).prop_map(|words| words.join(" "))
}

fn length_preserving_operator() -> impl Strategy<Value = OperatorKind> {
    prop_oneof![
        (0usize..6, 0usize..6).prop_map(|(first, last)| OperatorKind::Keep { first, last }),
        (0usize..6, 0usize..6)
            .prop_map(|(first, last)| OperatorKind::KeepGrouped { first, last }),
        (0usize..6).prop_map(|keep_last| OperatorKind::Groups { keep_last }),
        Just(OperatorKind::EmailLocal),
        (0usize..10, any::<bool>()).prop_map(|(chars_to_mask, from_end)| OperatorKind::Mask {
            chars_to_mask,
            from_end
        }),
    ]
}

proptest! {
    #[test]
    fn resolved_spans_never_overlap(candidates in prop::collection::vec(candidate(), 0..40)) {
        let resolved = resolver().resolve(candidates.clone());

        for pair in resolved.windows(2) {
            prop_assert!(pair[0].end() <= pair[1].start());
        }
        for span in &resolved {
            prop_assert!(candidates.contains(span));
        }
        if !candidates.is_empty() {
            prop_assert!(!resolved.is_empty());
        }
    }

    #[test]
    fn resolution_ignores_candidate_order(candidates in prop::collection::vec(candidate(), 0..40)) {
        let mut reversed = candidates.clone();
        reversed.reverse();
        prop_assert_eq!(resolver().resolve(candidates), resolver().resolve(reversed));
    }

    #[test]
    fn text_outside_spans_is_untouched(text in sentence()) {
        let result = anonymizer().anonymize(&text, &Locale::IT).unwrap();

        let mut cursor = 0;
        let mut out = 0;
        for item in &result.items {
            prop_assert!(item.start >= cursor);
            let gap = &text[cursor..item.start];
            prop_assert_eq!(&result.text[out..out + gap.len()], gap);
            out += gap.len() + item.replacement_len;
            cursor = item.end;
        }
        prop_assert_eq!(&result.text[out..], &text[cursor..]);
    }

    #[test]
    fn redaction_is_deterministic(text in sentence()) {
        let first = anonymizer().detect_and_redact(&text, &Locale::IT).unwrap();
        let second = anonymizer().detect_and_redact(&text, &Locale::IT).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn masks_preserve_char_length(value in "\\PC{0,40}", operator in length_preserving_operator()) {
        let masked = operator.apply(&value, '*');
        prop_assert!(operator.preserves_length());
        prop_assert_eq!(masked.chars().count(), value.chars().count());
    }

    #[test]
    fn placeholder_is_idempotent(value in "\\PC{0,40}") {
        let operator = OperatorKind::Replace { new_value: "<ANONYMIZED>".to_string() };
        let once = operator.apply(&value, '*');
        prop_assert_eq!(&once, "<ANONYMIZED>");
        prop_assert_eq!(operator.apply(&once, '*'), once);
    }

    #[test]
    fn hash_is_stable(value in "\\PC{0,40}") {
        prop_assert_eq!(
            OperatorKind::Hash.apply(&value, '*'),
            OperatorKind::Hash.apply(&value, '*')
        );
    }
}
