// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Python bindings for the anonymizer

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use std::sync::Arc;

use super::config::{AnonymizerConfig, Locale};
use super::error::AnonymizerError;
use super::nlp::{NlpEngine, NlpEntity, NlpError};
use super::pipeline::Anonymizer;
use crate::telemetry::{self, LogFormat};

impl From<AnonymizerError> for PyErr {
    fn from(err: AnonymizerError) -> Self {
        match err {
            AnonymizerError::InvalidConfiguration(_) | AnonymizerError::InvalidInput(_) => {
                PyValueError::new_err(err.to_string())
            }
            AnonymizerError::DetectionUnavailable { .. } | AnonymizerError::Internal(_) => {
                PyRuntimeError::new_err(err.to_string())
            }
        }
    }
}

/// Byte offset of every char index of `text`, plus the end
fn byte_offsets(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect()
}

fn char_offset(text: &str, byte: usize) -> usize {
    text.char_indices().take_while(|(i, _)| *i < byte).count()
}

/// NER engine backed by a Python callable:
/// `callable(text, locale) -> list[tuple[int, int, str, float]]`
/// with Python (character) offsets.
struct PyNlpEngine {
    callable: Py<PyAny>,
}

impl NlpEngine for PyNlpEngine {
    fn analyze(&self, text: &str, locale: &Locale) -> Result<Vec<NlpEntity>, NlpError> {
        Python::attach(|py| {
            // The exception message may echo the input: only the type is kept
            let result = self
                .callable
                .bind(py)
                .call1((text, locale.as_str()))
                .map_err(|e| NlpError::Engine(format!("engine raised {}", e.get_type(py))))?;

            let raw: Vec<(usize, usize, String, f64)> = result
                .extract()
                .map_err(|_| NlpError::Engine("engine returned an unexpected shape".to_string()))?;

            let offsets = byte_offsets(text);
            Ok(raw
                .into_iter()
                .filter_map(|(start, end, category, score)| {
                    match (offsets.get(start), offsets.get(end)) {
                        (Some(&start), Some(&end)) => {
                            Some(NlpEntity::new(start, end, category, score))
                        }
                        _ => {
                            tracing::warn!(start, end, "engine entity outside the text");
                            None
                        }
                    }
                })
                .collect())
        })
    }
}

/// PII anonymizer exposed to Python
///
/// # Example (Python)
/// ```python
/// from anonymizer_rust import AnonymizerRust
///
/// def ner(text, locale):
///     return [(8, 18, "PER", 0.85)]
///
/// anonymizer = AnonymizerRust(nlp_engine=ner)
/// anonymizer.anonymize("multa a Luca Rossi")  # "multa a L*** R****"
/// ```
#[pyclass]
pub struct AnonymizerRust {
    inner: Arc<Anonymizer>,
}

#[pymethods]
impl AnonymizerRust {
    /// Create an anonymizer
    ///
    /// # Arguments
    /// * `config_json` - JSON configuration document; when omitted the file
    ///   named by `ANONYMIZER_CONFIG_PATH` or the built-in profile is used
    /// * `nlp_engine` - callable `(text, locale) -> [(start, end, category, score)]`
    #[new]
    #[pyo3(signature = (config_json=None, nlp_engine=None))]
    pub fn new(config_json: Option<&str>, nlp_engine: Option<Py<PyAny>>) -> PyResult<Self> {
        let config = match config_json {
            Some(json) => AnonymizerConfig::from_json_str(json)?,
            None => AnonymizerConfig::from_env()?,
        };
        let engine = nlp_engine
            .map(|callable| Arc::new(PyNlpEngine { callable }) as Arc<dyn NlpEngine>);

        Ok(Self {
            inner: Arc::new(Anonymizer::new(config, engine)?),
        })
    }

    /// Redacted copy of `text`
    #[pyo3(signature = (text, locale="it"))]
    pub fn anonymize(&self, py: Python<'_>, text: Option<&str>, locale: &str) -> PyResult<String> {
        let text = text.ok_or_else(|| AnonymizerError::InvalidInput("text is required".into()))?;
        let locale = Locale::new(locale);
        let inner = &self.inner;

        Ok(py.detach(|| inner.detect_and_redact(text, &locale))?)
    }

    /// Resolved entities as a list of dicts with character offsets:
    /// `[{"entity_type": "PERSON", "start": 8, "end": 18, "score": 0.85, "recognizer": "..."}]`
    #[pyo3(signature = (text, locale="it"))]
    pub fn analyze(&self, py: Python<'_>, text: Option<&str>, locale: &str) -> PyResult<Py<PyAny>> {
        let text = text.ok_or_else(|| AnonymizerError::InvalidInput("text is required".into()))?;
        let locale = Locale::new(locale);
        let inner = &self.inner;

        let analysis = py.detach(|| inner.analyze(text, &locale))?;

        let py_list = PyList::empty(py);
        for span in &analysis.spans {
            let item_dict = PyDict::new(py);
            item_dict.set_item("entity_type", span.entity_type().as_str())?;
            item_dict.set_item("start", char_offset(text, span.start()))?;
            item_dict.set_item("end", char_offset(text, span.end()))?;
            item_dict.set_item("score", span.score())?;
            item_dict.set_item("recognizer", span.recognizer_id())?;
            py_list.append(item_dict)?;
        }

        Ok(py_list.into_any().unbind())
    }

    /// Locales accepted by `anonymize` and `analyze`
    pub fn supported_locales(&self) -> Vec<String> {
        self.inner
            .supported_locales()
            .iter()
            .map(|locale| locale.as_str().to_string())
            .collect()
    }
}

/// Install the process-wide log subscriber. Returns False if one exists.
#[pyfunction]
#[pyo3(signature = (json=true))]
pub fn init_logging(json: bool) -> bool {
    telemetry::init(if json { LogFormat::Json } else { LogFormat::Text })
}
