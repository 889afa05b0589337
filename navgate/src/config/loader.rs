// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use super::defaults::default_classifier_url;
use super::error::ConfigError;
use super::interpolation::resolve_variables;
use super::raw;
use super::source::ConfigSource;
use super::types::*;

/// Load and validate a navgate config from the given source.
///
/// Steps:
/// 1. Read raw YAML from the source
/// 2. Parse into raw deserialization types
/// 3. Validate the contract version
/// 4. Resolve `${VAR}` interpolation in URL fields
/// 5. Apply defaults and validate values
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    if raw.navgate != "v1" {
        return Err(ConfigError::UnsupportedVersion(raw.navgate));
    }

    Ok(Config {
        version: raw.navgate,
        classifier: build_classifier_config(raw.classifier)?,
        interception: build_interception_config(raw.interception)?,
        address_bar: build_address_bar_config(raw.address_bar)?,
        environment: raw.environment.unwrap_or_default(),
    })
}

fn build_classifier_config(
    raw: Option<raw::RawClassifierConfig>,
) -> Result<ClassifierConfig, ConfigError> {
    let raw = match raw {
        Some(r) => r,
        None => return Ok(ClassifierConfig::default()),
    };
    let defaults = ClassifierConfig::default();

    let base_url = match raw.base_url {
        Some(url) => resolve_variables(url.trim())?,
        None => default_classifier_url(),
    };
    validate_http_url("classifier.base_url", &base_url)?;

    let check_path = raw.check_path.unwrap_or(defaults.check_path);
    if !check_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "classifier.check_path must start with '/', got \"{check_path}\""
        )));
    }

    let timeout_ms = raw.timeout_ms.unwrap_or(defaults.timeout_ms);
    if timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "classifier.timeout_ms must be > 0".into(),
        ));
    }

    Ok(ClassifierConfig {
        base_url,
        check_path,
        timeout_ms,
    })
}

fn build_interception_config(
    raw: Option<raw::RawInterceptionConfig>,
) -> Result<InterceptionConfig, ConfigError> {
    let raw = match raw {
        Some(r) => r,
        None => return Ok(InterceptionConfig::default()),
    };
    let defaults = InterceptionConfig::default();

    let bypass_schemes = match raw.bypass_schemes {
        Some(schemes) => schemes
            .iter()
            .map(|s| normalize_scheme_entry(s))
            .collect::<Result<Vec<_>, _>>()?,
        None => defaults.bypass_schemes,
    };

    Ok(InterceptionConfig {
        bypass_schemes,
        require_protective_session: raw
            .require_protective_session
            .unwrap_or(defaults.require_protective_session),
    })
}

fn build_address_bar_config(
    raw: Option<raw::RawAddressBarConfig>,
) -> Result<AddressBarConfig, ConfigError> {
    let raw = match raw {
        Some(r) => r,
        None => return Ok(AddressBarConfig::default()),
    };
    let defaults = AddressBarConfig::default();

    let home_url = match raw.home_url {
        Some(url) => resolve_variables(url.trim())?,
        None => defaults.home_url,
    };
    validate_http_url("address_bar.home_url", &home_url)?;

    let search_url = match raw.search_url {
        Some(url) => resolve_variables(url.trim())?,
        None => defaults.search_url,
    };
    validate_http_url("address_bar.search_url", &search_url)?;

    Ok(AddressBarConfig {
        home_url,
        search_url,
    })
}

/// `"JavaScript:"` -> `"javascript"`. Rejects empty and non-scheme entries.
fn normalize_scheme_entry(entry: &str) -> Result<String, ConfigError> {
    let scheme = entry.trim().trim_end_matches(':').to_ascii_lowercase();
    let valid = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid {
        return Err(ConfigError::InvalidScheme(entry.to_string()));
    }
    Ok(scheme)
}

/// Absolute `http`/`https` URL with a non-empty host.
fn validate_http_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        reason,
    };
    let parsed = url::Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("scheme \"{}\" is not http(s)", parsed.scheme())));
    }
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(invalid("URL has no host".to_string())),
    }
}
