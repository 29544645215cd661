// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Structured logging setup for processes embedding the anonymizer

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log level / filter directive, e.g. `info` or `anonymizer_rust=debug`
pub const LOG_LEVEL_ENV: &str = "APP_LOGGING_LEVEL";
/// Deployment environment reported with the service metadata
pub const ENVIRONMENT_ENV: &str = "ENV";

const DEFAULT_LEVEL: &str = "info";

/// Output format of the log records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable lines
    Text,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "text" | "pretty" | "plain" => Some(LogFormat::Text),
            _ => None,
        }
    }
}

fn filter_from(directive: Option<&str>) -> EnvFilter {
    let directive = directive
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_LEVEL);
    EnvFilter::try_new(directive.to_ascii_lowercase())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}

/// Install the global subscriber. Returns `false` when one was already
/// installed, in which case nothing changes.
pub fn init(format: LogFormat) -> bool {
    let level = std::env::var(LOG_LEVEL_ENV).ok();
    let registry = tracing_subscriber::registry().with(filter_from(level.as_deref()));

    let installed = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
            .is_ok(),
        LogFormat::Text => registry.with(fmt::layer()).try_init().is_ok(),
    };

    if installed {
        let environment =
            std::env::var(ENVIRONMENT_ENV).unwrap_or_else(|_| "development".to_string());
        tracing::info!(
            service.name = env!("CARGO_PKG_NAME"),
            service.version = env!("CARGO_PKG_VERSION"),
            service.environment = %environment,
            "logging initialized"
        );
    }

    installed
}
