// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Checksum validators for pattern matches

use super::config::ValidatorKind;

impl ValidatorKind {
    /// Check a matched value. Separators (spaces, dashes) are ignored.
    pub fn validate(self, value: &str) -> bool {
        match self {
            ValidatorKind::Luhn => luhn(value),
            ValidatorKind::Iban => iban_mod97(value),
            ValidatorKind::ItalianVat => italian_vat(value),
        }
    }
}

fn digits(value: &str) -> Option<Vec<u32>> {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_digit(10))
        .collect()
}

fn luhn(value: &str) -> bool {
    let Some(digits) = digits(value) else {
        return false;
    };
    if digits.len() < 2 {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// ISO 13616: move the first four chars to the end, letters become
/// 10..=35, the resulting number mod 97 must be 1.
fn iban_mod97(value: &str) -> bool {
    let compact: Vec<char> = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if compact.len() < 15 || compact.len() > 34 {
        return false;
    }

    let mut remainder: u32 = 0;
    for c in compact[4..].iter().chain(&compact[..4]) {
        let Some(n) = c.to_digit(36) else {
            return false;
        };
        // letters expand to two digits
        remainder = if n >= 10 {
            (remainder * 100 + n) % 97
        } else {
            (remainder * 10 + n) % 97
        };
    }

    remainder == 1
}

/// Partita IVA: 11 digits, the last one is a Luhn-style check digit
/// over the first ten.
fn italian_vat(value: &str) -> bool {
    let Some(digits) = digits(value) else {
        return false;
    };
    if digits.len() != 11 {
        return false;
    }

    let sum: u32 = digits[..10]
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    (10 - sum % 10) % 10 == digits[10]
}
