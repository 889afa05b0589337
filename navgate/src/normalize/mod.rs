// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Address-bar normalization and scheme classification
//
// Normalization only prefixes a protocol or builds a search URL. No other
// canonicalization happens: the normalized string is the exact key used for
// the verdict cache and the exact input sent to the classifier.

use crate::config::AddressBarConfig;

// ---------------------------------------------------------------------------
// Trait: AddressNormalizer
// ---------------------------------------------------------------------------

/// Turns what the user typed into a navigable URL.
pub trait AddressNormalizer: Send + Sync {
    fn normalize(&self, input: &str) -> String;
}

// ---------------------------------------------------------------------------
// Implementation: DefaultAddressNormalizer
// ---------------------------------------------------------------------------

/// Applies, in order:
///
/// 1. Whitespace removal (leading, trailing and embedded)
/// 2. `http://` / `https://` inputs are kept as-is
/// 3. Inputs containing a `.` get an `https://` prefix
/// 4. Anything else becomes a search query against `search_url`
pub struct DefaultAddressNormalizer {
    search_url: String,
}

impl DefaultAddressNormalizer {
    pub fn new(config: &AddressBarConfig) -> Self {
        Self {
            search_url: config.search_url.clone(),
        }
    }
}

impl Default for DefaultAddressNormalizer {
    fn default() -> Self {
        Self::new(&AddressBarConfig::default())
    }
}

impl AddressNormalizer for DefaultAddressNormalizer {
    fn normalize(&self, input: &str) -> String {
        let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return compact;
        }
        if has_http_prefix(&compact) {
            return compact;
        }
        if compact.contains('.') {
            return format!("https://{compact}");
        }
        let query: String = url::form_urlencoded::byte_serialize(compact.as_bytes()).collect();
        format!("{}{}", self.search_url, query)
    }
}

fn has_http_prefix(s: &str) -> bool {
    let head: String = s.chars().take(8).collect::<String>().to_ascii_lowercase();
    head.starts_with("http://") || head.starts_with("https://")
}

// ---------------------------------------------------------------------------
// Scheme helpers
// ---------------------------------------------------------------------------

/// Lower-cased scheme of `url`, or `None` if it has no syntactically valid
/// scheme. Input the URL parser rejects still gets its scheme read off the
/// front, so bypass rules apply to malformed URLs too.
pub fn scheme_of(url: &str) -> Option<String> {
    match url::Url::parse(url) {
        Ok(parsed) => Some(parsed.scheme().to_owned()),
        Err(_) => leading_scheme(url),
    }
}

fn leading_scheme(url: &str) -> Option<String> {
    let (scheme, _) = url.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    Some(scheme.to_ascii_lowercase())
}
