// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// PII detection and format-preserving redaction for Italian text
// Optional PyO3 bindings for the Python service shell

pub mod anonymizer;
pub mod telemetry;

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module: anonymizer_rust
///
/// # Examples
///
/// ```python
/// from anonymizer_rust import AnonymizerRust, init_logging
///
/// init_logging(json=True)
///
/// def ner(text, locale):
///     # (start, end, category, score) with Python offsets
///     return [(8, 18, "PER", 0.85)] if "Luca Rossi" in text else []
///
/// anonymizer = AnonymizerRust(nlp_engine=ner)
///
/// print(anonymizer.anonymize("multa a Luca Rossi"))  # "multa a L*** R****"
/// print(anonymizer.analyze("Macchina HA011HA"))
/// # [{"entity_type": "VEHICLE_PLATE", "start": 9, "end": 16, ...}]
/// ```
#[cfg(feature = "python")]
#[pymodule]
fn anonymizer_rust(m: &Bound<'_, pyo3::types::PyModule>) -> PyResult<()> {
    m.add_class::<anonymizer::python::AnonymizerRust>()?;
    m.add_function(wrap_pyfunction!(anonymizer::python::init_logging, m)?)?;

    // Module metadata
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add(
        "__doc__",
        "PII detection and format-preserving redaction for Italian text",
    )?;

    Ok(())
}
