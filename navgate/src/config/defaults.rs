// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

/// Environment variable consulted when `classifier.base_url` is not set.
pub const CLASSIFIER_URL_ENV: &str = "NAVGATE_CLASSIFIER_URL";

pub const DEFAULT_CLASSIFIER_URL: &str = "http://localhost:3000";
pub const DEFAULT_CHECK_PATH: &str = "/url/check";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Schemes that never reach the classifier: inline documents, blank pages,
/// script URLs and local files.
pub const DEFAULT_BYPASS_SCHEMES: &[&str] = &["data", "about", "javascript", "file"];

pub const DEFAULT_HOME_URL: &str = "https://www.google.com";
pub const DEFAULT_SEARCH_URL: &str = "https://www.google.com/search?q=";

pub fn default_bypass_schemes() -> Vec<String> {
    DEFAULT_BYPASS_SCHEMES.iter().map(|s| s.to_string()).collect()
}

/// Classifier base URL when the config leaves it unset.
pub fn default_classifier_url() -> String {
    std::env::var(CLASSIFIER_URL_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CLASSIFIER_URL.to_string())
}
