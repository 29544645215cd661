// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Error types for the anonymizer

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, AnonymizerError>;

/// Errors surfaced by the detection-and-redaction engine.
///
/// None of the variants ever carry input text.
#[derive(Debug, Error)]
pub enum AnonymizerError {
    /// Configuration could not be compiled. Fatal at startup.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The external NLP engine failed or timed out for this request.
    #[error("detection unavailable from recognizer '{recognizer}': {reason}")]
    DetectionUnavailable { recognizer: String, reason: String },

    /// The caller supplied input the engine does not accept.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal invariant was violated while redacting.
    #[error("internal redaction failure: {0}")]
    Internal(String),
}

impl AnonymizerError {
    /// Stable label for logging
    pub fn label(&self) -> &'static str {
        match self {
            AnonymizerError::InvalidConfiguration(_) => "invalid_configuration",
            AnonymizerError::DetectionUnavailable { .. } => "detection_unavailable",
            AnonymizerError::InvalidInput(_) => "invalid_input",
            AnonymizerError::Internal(_) => "internal",
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        AnonymizerError::InvalidConfiguration(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_labels() {
        assert_eq!(
            AnonymizerError::config("bad").label(),
            "invalid_configuration"
        );
        assert_eq!(
            AnonymizerError::InvalidInput("x".into()).label(),
            "invalid_input"
        );
    }

    #[test]
    fn test_detection_unavailable_message() {
        let err = AnonymizerError::DetectionUnavailable {
            recognizer: "spacy".into(),
            reason: "timed out after 10ms".into(),
        };
        assert_eq!(
            err.to_string(),
            "detection unavailable from recognizer 'spacy': timed out after 10ms"
        );
    }
}
