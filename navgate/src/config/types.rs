// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use super::defaults::{
    default_bypass_schemes, default_classifier_url, DEFAULT_CHECK_PATH, DEFAULT_HOME_URL,
    DEFAULT_SEARCH_URL, DEFAULT_TIMEOUT_MS,
};

/// Top-level parsed and validated navgate config.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Contract version. Always "v1".
    pub version: String,
    /// Remote URL classification service.
    pub classifier: ClassifierConfig,
    /// Which navigations are gated at all.
    pub interception: InterceptionConfig,
    /// Address-bar input handling.
    pub address_bar: AddressBarConfig,
    /// Environment label (e.g. "dev", "production").
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Scheme + host (+ optional port/prefix) of the classifier service.
    pub base_url: String,
    /// Path of the check endpoint, always starting with `/`.
    pub check_path: String,
    /// Per-request timeout in milliseconds. Never zero.
    pub timeout_ms: u64,
}

impl ClassifierConfig {
    /// Full URL of the check endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.check_path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterceptionConfig {
    /// Lower-case scheme names (no trailing `:`) allowed without classification.
    pub bypass_schemes: Vec<String>,
    /// When true, navigation is only gated while a protective session is active.
    pub require_protective_session: bool,
}

impl InterceptionConfig {
    pub fn bypasses(&self, scheme: &str) -> bool {
        self.bypass_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(scheme))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddressBarConfig {
    /// Page loaded when a browsing session starts.
    pub home_url: String,
    /// Prefix for search queries; the encoded query is appended.
    pub search_url: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: default_classifier_url(),
            check_path: DEFAULT_CHECK_PATH.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Default for InterceptionConfig {
    fn default() -> Self {
        Self {
            bypass_schemes: default_bypass_schemes(),
            require_protective_session: true,
        }
    }
}

impl Default for AddressBarConfig {
    fn default() -> Self {
        Self {
            home_url: DEFAULT_HOME_URL.to_string(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "v1".to_string(),
            classifier: ClassifierConfig::default(),
            interception: InterceptionConfig::default(),
            address_bar: AddressBarConfig::default(),
            environment: String::new(),
        }
    }
}
