// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Built-in Italian recognizer table and pattern compilation

use once_cell::sync::Lazy;

use super::config::{
    ContextConfig, EntityType, Locale, PatternConfig, PatternRecognizerConfig, ValidatorKind,
};
use super::error::Result;
use super::recognizer::PatternRecognizer;

/// Pattern definitions (name, regex, base score)
type PatternDef = (&'static str, &'static str, f64);

static EMAIL_PATTERNS: &[PatternDef] = &[(
    "Email address",
    r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
    0.9,
)];

// Mobile and landline, optional +39 prefix
static PHONE_PATTERNS: &[PatternDef] = &[
    (
        "Italian mobile number",
        r"(?:\+39 ?|\b)3\d{2} ?\d{6,7}\b",
        0.7,
    ),
    (
        "Italian landline number",
        r"(?:\+39 ?|\b)0\d{1,3}[ -]?\d{5,8}\b",
        0.5,
    ),
];

static CREDIT_CARD_PATTERNS: &[PatternDef] = &[(
    "Credit card number",
    r"\b(?:\d{4}[ -]?){3}\d{4}\b",
    0.3,
)];

static IBAN_PATTERNS: &[PatternDef] = &[(
    "IBAN",
    r"\b[A-Z]{2}\d{2}(?: ?[A-Z0-9]{4}){2,7}(?: ?[A-Z0-9]{1,3})?\b",
    0.5,
)];

static CRYPTO_PATTERNS: &[PatternDef] = &[
    (
        "Bitcoin legacy address",
        r"\b[13][a-km-zA-HJ-NP-Z1-9]{25,34}\b",
        0.5,
    ),
    ("Bitcoin bech32 address", r"\bbc1[a-z0-9]{25,39}\b", 0.5),
];

// Omocodia digits are replaced by LMNPQRSTUV
static FISCAL_CODE_PATTERNS: &[PatternDef] = &[(
    "Codice fiscale",
    r"\b[A-Z]{6}[0-9LMNP-V]{2}[ABCDEHLMPRST][0-9LMNP-V]{2}[A-Z][0-9LMNP-V]{3}[A-Z]\b",
    0.8,
)];

static VAT_CODE_PATTERNS: &[PatternDef] = &[
    ("Partita IVA", r"\b\d{11}\b", 0.5),
    ("Partita IVA with country prefix", r"\bIT ?\d{11}\b", 0.6),
];

static DRIVER_LICENSE_PATTERNS: &[PatternDef] = &[
    ("Driver licence", r"\b[A-Z]{2}\d{7}[A-Z]\b", 0.5),
    ("Driver licence (U1 series)", r"\bU1[A-Z0-9]{7}[A-Z]\b", 0.5),
];

static PASSPORT_PATTERNS: &[PatternDef] = &[("Passport number", r"\b[A-Z]{2}\d{7}\b", 0.5)];

static IDENTITY_CARD_PATTERNS: &[PatternDef] = &[
    ("Paper identity card", r"\b[A-Z]{2}\d{7}\b", 0.5),
    ("Electronic identity card (CIE)", r"\b[A-Z]{2}\d{5}[A-Z]{2}\b", 0.6),
];

static ADDRESS_PATTERNS: &[PatternDef] = &[(
    "Address (type + name + number)",
    r"\b(?:Via|Viale|Piazza|Piazzale|Corso|Largo|Strada|Contrada|Borgo|Salita|Calata|Passeggiata|Vicolo) +[A-ZÀ-Üa-zà-ü0-9'’.\-\s]+?,?\s*\d+[A-Za-z]?",
    0.9,
)];

static VEHICLE_PLATE_PATTERNS: &[PatternDef] = &[(
    "Italian vehicle plate",
    r"\b(?:[A-Za-z]{2} ?\d{3} ?[A-Za-z]{2}|\d{2} ?[A-Za-z]{2} ?\d{2}|[A-Za-z]{2} ?\d{5}|\d{2} ?[A-Za-z]{3} ?\d{2})\b",
    0.8,
)];

static PAYMENT_NOTICE_PATTERNS: &[PatternDef] =
    &[("Numero avviso (NAV)", r"\b[0-3]\d{17}\b", 0.85)];

static PAYMENT_ID_PATTERNS: &[PatternDef] = &[("IUV", r"\b\d{17}\b", 0.8)];

// The `pii` group marks the redacted part: the keyword itself stays
static MEDICAL_PATTERNS: &[PatternDef] = &[(
    "Medical mention",
    r"(?m)\bvisita\s+(?P<pii>.+)$",
    0.7,
)];

fn recognizer(
    name: &str,
    entity_type: EntityType,
    patterns: &[PatternDef],
    context: &[&str],
) -> PatternRecognizerConfig {
    PatternRecognizerConfig {
        name: name.to_string(),
        entity_type,
        patterns: patterns
            .iter()
            .map(|(name, regex, score)| PatternConfig {
                name: name.to_string(),
                regex: regex.to_string(),
                score: *score,
            })
            .collect(),
        context: context.iter().map(|word| word.to_string()).collect(),
        locales: vec![Locale::IT],
        case_insensitive: false,
        validator: None,
    }
}

static ITALIAN_RECOGNIZERS: Lazy<Vec<PatternRecognizerConfig>> = Lazy::new(|| {
    vec![
        recognizer(
            "EmailRecognizer",
            EntityType::EMAIL_ADDRESS,
            EMAIL_PATTERNS,
            &["email", "e-mail", "posta", "pec"],
        ),
        recognizer(
            "ItalianPhoneRecognizer",
            EntityType::PHONE_NUMBER,
            PHONE_PATTERNS,
            &["telefono", "cellulare", "tel", "numero", "contatto", "chiamare"],
        ),
        PatternRecognizerConfig {
            validator: Some(ValidatorKind::Luhn),
            ..recognizer(
                "CreditCardRecognizer",
                EntityType::CREDIT_CARD,
                CREDIT_CARD_PATTERNS,
                &["carta", "credito", "debito", "visa", "mastercard", "pagamento"],
            )
        },
        PatternRecognizerConfig {
            validator: Some(ValidatorKind::Iban),
            ..recognizer(
                "IbanRecognizer",
                EntityType::IBAN_CODE,
                IBAN_PATTERNS,
                &["iban", "conto", "bonifico", "accredito"],
            )
        },
        recognizer(
            "CryptoRecognizer",
            EntityType::CRYPTO,
            CRYPTO_PATTERNS,
            &["wallet", "bitcoin", "btc", "crypto"],
        ),
        PatternRecognizerConfig {
            case_insensitive: true,
            ..recognizer(
                "ItalianFiscalCodeRecognizer",
                EntityType::FISCAL_CODE,
                FISCAL_CODE_PATTERNS,
                &["codice fiscale", "cf", "fiscale"],
            )
        },
        recognizer(
            "ItalianVatCodeRecognizer",
            EntityType::VAT_CODE,
            VAT_CODE_PATTERNS,
            &["partita iva", "p iva", "piva", "iva"],
        ),
        recognizer(
            "ItalianDriverLicenseRecognizer",
            EntityType::DRIVER_LICENSE,
            DRIVER_LICENSE_PATTERNS,
            &["patente", "guida"],
        ),
        recognizer(
            "ItalianPassportRecognizer",
            EntityType::PASSPORT,
            PASSPORT_PATTERNS,
            &["passaporto"],
        ),
        recognizer(
            "ItalianIdentityCardRecognizer",
            EntityType::IDENTITY_CARD,
            IDENTITY_CARD_PATTERNS,
            &["carta identita", "carta d identità", "documento", "cie"],
        ),
        recognizer(
            "ItalianAddressRecognizer",
            EntityType::ADDRESS,
            ADDRESS_PATTERNS,
            &[
                "indirizzo",
                "residenza",
                "residente",
                "domiciliato",
                "sede legale",
                "via",
                "piazza",
                "corso",
            ],
        ),
        recognizer(
            "ItalianVehiclePlateRecognizer",
            EntityType::VEHICLE_PLATE,
            VEHICLE_PLATE_PATTERNS,
            &["targa", "targata", "veicolo", "auto", "autovettura", "macchina"],
        ),
        recognizer(
            "NavRecognizer",
            EntityType::PAYMENT_NOTICE,
            PAYMENT_NOTICE_PATTERNS,
            &["avviso", "nav", "pagamento"],
        ),
        recognizer(
            "IuvRecognizer",
            EntityType::PAYMENT_ID,
            PAYMENT_ID_PATTERNS,
            &["iuv", "versamento", "pagamento"],
        ),
        PatternRecognizerConfig {
            case_insensitive: true,
            ..recognizer(
                "MedicalInfoRecognizer",
                EntityType::MEDICAL_REFERENCE,
                MEDICAL_PATTERNS,
                &[
                    "visita", "medica", "ospedale", "dottore", "cura", "terapia", "diagnosi",
                ],
            )
        },
    ]
});

/// Built-in recognizers for the `it` locale, in registration order
pub fn italian_recognizers() -> Vec<PatternRecognizerConfig> {
    ITALIAN_RECOGNIZERS.clone()
}

/// Compile recognizer definitions, failing on the first malformed one
pub fn compile_patterns(
    configs: &[PatternRecognizerConfig],
    context: ContextConfig,
) -> Result<Vec<PatternRecognizer>> {
    configs
        .iter()
        .map(|config| PatternRecognizer::compile(config, context))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled() -> Vec<PatternRecognizer> {
        compile_patterns(&italian_recognizers(), ContextConfig::default()).unwrap()
    }

    fn detect_types(text: &str) -> Vec<(EntityType, String)> {
        compiled()
            .iter()
            .flat_map(|recognizer| recognizer.detect(text))
            .map(|span| {
                (
                    span.entity_type().clone(),
                    text[span.start()..span.end()].to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn test_compile_patterns() {
        let recognizers = compiled();
        assert_eq!(recognizers.len(), italian_recognizers().len());
    }

    #[test]
    fn test_recognizer_names_unique() {
        let mut names: Vec<String> = italian_recognizers().into_iter().map(|r| r.name).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_vehicle_plate_pattern() {
        let found = detect_types("Macchina HA011HA");
        assert_eq!(
            found,
            vec![(EntityType::VEHICLE_PLATE, "HA011HA".to_string())]
        );
    }

    #[test]
    fn test_fiscal_code_pattern() {
        let found = detect_types("codice fiscale RSSLCU80A01F205I");
        assert!(found.contains(&(EntityType::FISCAL_CODE, "RSSLCU80A01F205I".to_string())));
        // case-insensitive
        let found = detect_types("cf rsslcu80a01f205i");
        assert!(found.contains(&(EntityType::FISCAL_CODE, "rsslcu80a01f205i".to_string())));
    }

    #[test]
    fn test_phone_patterns() {
        for number in ["3485536559", "348 5536559", "+393485536559", "+39 3485536559"] {
            let found = detect_types(number);
            assert_eq!(
                found,
                vec![(EntityType::PHONE_NUMBER, number.to_string())],
                "{number}"
            );
        }
    }

    #[test]
    fn test_iban_requires_checksum() {
        let found = detect_types("IT47J0990650025128761820997");
        assert_eq!(
            found,
            vec![(
                EntityType::IBAN_CODE,
                "IT47J0990650025128761820997".to_string()
            )]
        );
        let found = detect_types("IT48J0990650025128761820997");
        assert!(!found.iter().any(|(entity, _)| *entity == EntityType::IBAN_CODE));
    }

    #[test]
    fn test_address_pattern() {
        let found = detect_types("Indirizzo Via umberto I n.54");
        assert!(found.contains(&(EntityType::ADDRESS, "Via umberto I n.54".to_string())));
    }

    #[test]
    fn test_medical_mention_uses_group() {
        let found = detect_types("visita medica radiografia");
        assert_eq!(
            found,
            vec![(
                EntityType::MEDICAL_REFERENCE,
                "medica radiografia".to_string()
            )]
        );
    }

    #[test]
    fn test_payment_identifiers() {
        assert_eq!(
            detect_types("000000000000000000"),
            vec![(EntityType::PAYMENT_NOTICE, "000000000000000000".to_string())]
        );
        assert_eq!(
            detect_types("00000000000000000"),
            vec![(EntityType::PAYMENT_ID, "00000000000000000".to_string())]
        );
    }

    #[test]
    fn test_identity_documents() {
        let found = detect_types("CA12345AB");
        assert_eq!(
            found,
            vec![(EntityType::IDENTITY_CARD, "CA12345AB".to_string())]
        );

        let found = detect_types("AH9013703");
        assert!(found.contains(&(EntityType::PASSPORT, "AH9013703".to_string())));
        assert!(found.contains(&(EntityType::IDENTITY_CARD, "AH9013703".to_string())));

        let found = detect_types("RO5157033P");
        assert_eq!(
            found,
            vec![(EntityType::DRIVER_LICENSE, "RO5157033P".to_string())]
        );
    }

    #[test]
    fn test_no_pii() {
        assert!(detect_types("hello world").is_empty());
    }
}
