// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Verdict types and the per-session verdict cache.
//
// The cache is keyed by the exact URL string handed to the classifier. It
// doubles as security state: a user override lives on the entry for that one
// URL and never reverts for the lifetime of the cache.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::fmt;

// ---------------------------------------------------------------------------
// Verdict types
// ---------------------------------------------------------------------------

/// Coarse confidence bucket derived from the classifier's label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Unknown => "unknown",
        }
    }
}

/// Classifier-supplied confidence. The label is kept exactly as the service
/// sent it and is what users see; `level` is for logs and matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confidence {
    level: ConfidenceLevel,
    label: String,
}

impl Confidence {
    /// Wrap a classifier label. Unrecognized labels get `Unknown` as level.
    pub fn from_label(label: impl Into<String>) -> Self {
        let label = label.into();
        let level = match label.trim().to_ascii_lowercase().as_str() {
            "low" => ConfidenceLevel::Low,
            "medium" => ConfidenceLevel::Medium,
            "high" => ConfidenceLevel::High,
            _ => ConfidenceLevel::Unknown,
        };
        Self { level, label }
    }

    /// For responses that carry no label at all.
    pub fn unknown() -> Self {
        Self {
            level: ConfidenceLevel::Unknown,
            label: ConfidenceLevel::Unknown.as_str().to_string(),
        }
    }

    pub fn level(&self) -> ConfidenceLevel {
        self.level
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl Serialize for Confidence {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label)
    }
}

/// A definitive answer from the classifier service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifierVerdict {
    pub is_malicious: bool,
    pub confidence: Confidence,
    /// Probability of maliciousness in `[0, 1]`.
    pub probability: f64,
}

/// Cached classification for one URL.
#[derive(Debug, Clone, PartialEq)]
pub struct VerdictEntry {
    pub is_malicious: bool,
    /// Set only by an explicit "Continue Anyway"; never cleared.
    pub user_allowed: bool,
    pub confidence: Confidence,
    pub probability: f64,
    pub classified_at: DateTime<Utc>,
}

impl VerdictEntry {
    pub fn from_verdict(verdict: &ClassifierVerdict) -> Self {
        Self {
            is_malicious: verdict.is_malicious,
            user_allowed: false,
            confidence: verdict.confidence.clone(),
            probability: verdict.probability,
            classified_at: Utc::now(),
        }
    }

    /// Time since the classifier answered for this URL.
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.classified_at)
    }

    /// Safe, or malicious with a user override.
    pub fn is_navigable(&self) -> bool {
        !self.is_malicious || self.user_allowed
    }

    /// Malicious and the user has not overridden it.
    pub fn is_blocked(&self) -> bool {
        !self.is_navigable()
    }
}

// ---------------------------------------------------------------------------
// VerdictCache
// ---------------------------------------------------------------------------

/// Session-scoped verdict store. No eviction and no expiry.
#[derive(Debug, Default)]
pub struct VerdictCache {
    entries: DashMap<String, VerdictEntry>,
}

impl VerdictCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<VerdictEntry> {
        self.entries.get(url).map(|e| e.value().clone())
    }

    /// Store a verdict. An existing override on the same URL is kept.
    pub fn put(&self, url: impl Into<String>, mut entry: VerdictEntry) {
        match self.entries.entry(url.into()) {
            Entry::Occupied(mut occupied) => {
                entry.user_allowed |= occupied.get().user_allowed;
                occupied.insert(entry);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
            }
        }
    }

    /// Record the user's override. Returns false (and does nothing) when no
    /// entry exists for `url`.
    pub fn mark_user_allowed(&self, url: &str) -> bool {
        match self.entries.get_mut(url) {
            Some(mut entry) => {
                entry.user_allowed = true;
                true
            }
            None => false,
        }
    }

    /// Snapshot of all entries, sorted by URL.
    pub fn snapshot(&self) -> Vec<(String, VerdictEntry)> {
        let mut all: Vec<_> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
