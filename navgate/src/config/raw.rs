// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Raw YAML deserialization types (internal).
// Kept apart from the typed config: interpolation, defaults and validation
// happen between the two.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub navgate: String,
    pub classifier: Option<RawClassifierConfig>,
    pub interception: Option<RawInterceptionConfig>,
    pub address_bar: Option<RawAddressBarConfig>,
    pub environment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawClassifierConfig {
    pub base_url: Option<String>,
    pub check_path: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawInterceptionConfig {
    pub bypass_schemes: Option<Vec<String>>,
    pub require_protective_session: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawAddressBarConfig {
    pub home_url: Option<String>,
    pub search_url: Option<String>,
}
