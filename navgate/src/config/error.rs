// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

/// Errors from loading and validating a navgate config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported contract version \"{0}\", expected \"v1\"")]
    UnsupportedVersion(String),

    #[error("{field} must be an absolute http(s) URL, got \"{value}\": {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("interception.bypass_schemes contains invalid scheme \"{0}\"")]
    InvalidScheme(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("undefined variable ${{{name}}} in config (not set in environment)")]
    UndefinedVariable { name: String },
}
