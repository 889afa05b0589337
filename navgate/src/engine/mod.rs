// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Decision engine
//
// Per-URL state machine: Unchecked -> Checking -> {Safe, Blocked, Overridden}.
// - `decide` is synchronous: fast paths, cached verdicts, or a PendingCheck
//   that holds the URL's in-flight slot
// - `resolve` drives a PendingCheck to completion: classify, cache, and on a
//   malicious verdict run the notification + override dialog
// - `evaluate_submitted` is the address-bar path, where the user waits for
//   the full decision
//
// Ordering: a definitive verdict is written to the cache before the
// in-flight slot is released. Fail-open results are never cached.

use crate::classifier::{Classification, HttpUrlClassifier, UrlClassifier};
use crate::config::Config;
use crate::inflight::{InFlightGuard, InFlightRegistry};
use crate::normalize::scheme_of;
use crate::session::ProtectionState;
use crate::surface::{MaliciousWarning, Notifier, OverrideChoice, OverridePrompt};
use crate::verdict::{Confidence, VerdictCache, VerdictEntry};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Decision types
// ---------------------------------------------------------------------------

/// Synchronous answer for one navigation attempt.
#[derive(Debug)]
pub enum Decision {
    Allow(AllowReason),
    Deny(DenyReason),
    /// Denied for now; classification must run and the navigation be
    /// re-issued if it resolves to a permitting outcome.
    DenyPendingAsync(PendingCheck),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    BypassedScheme,
    SessionInactive,
    CachedSafe,
    UserOverride,
    FailOpenPass,
}

impl AllowReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllowReason::BypassedScheme => "bypassed_scheme",
            AllowReason::SessionInactive => "session_inactive",
            AllowReason::CachedSafe => "cached_safe",
            AllowReason::UserOverride => "user_override",
            AllowReason::FailOpenPass => "fail_open_pass",
        }
    }

    /// False for allows that skipped the gate entirely.
    pub fn is_gated(&self) -> bool {
        !matches!(
            self,
            AllowReason::BypassedScheme | AllowReason::SessionInactive
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Cached malicious verdict without a user override.
    Blocked,
    /// Classification for this URL is already outstanding.
    InFlight,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::Blocked => "blocked",
            DenyReason::InFlight => "in_flight",
        }
    }
}

/// Exclusive right to classify one URL. Dropping it releases the in-flight
/// slot.
#[derive(Debug)]
pub struct PendingCheck {
    guard: InFlightGuard,
    attempt_id: Uuid,
}

impl PendingCheck {
    pub fn url(&self) -> &str {
        self.guard.url()
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }
}

/// Final outcome of an asynchronous decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Classified safe (or never subject to classification).
    Safe,
    /// Classifier unavailable; allowed for this attempt, nothing cached.
    FailOpen,
    /// Malicious, but the user chose "Continue Anyway".
    Overridden,
    /// Malicious and the user cancelled.
    Blocked,
    /// Another task owns the decision for this URL.
    Pending,
}

impl Resolution {
    pub fn permits_navigation(&self) -> bool {
        matches!(
            self,
            Resolution::Safe | Resolution::FailOpen | Resolution::Overridden
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Safe => "safe",
            Resolution::FailOpen => "fail_open",
            Resolution::Overridden => "overridden",
            Resolution::Blocked => "blocked",
            Resolution::Pending => "pending",
        }
    }
}

// ---------------------------------------------------------------------------
// Engine dependencies
// ---------------------------------------------------------------------------

pub struct EngineDeps {
    pub config: Arc<Config>,
    pub cache: Arc<VerdictCache>,
    pub inflight: Arc<InFlightRegistry>,
    pub classifier: Arc<dyn UrlClassifier>,
    pub session: Arc<dyn ProtectionState>,
    pub notifier: Arc<dyn Notifier>,
    pub prompt: Arc<dyn OverridePrompt>,
}

// ---------------------------------------------------------------------------
// DecisionEngine
// ---------------------------------------------------------------------------

/// Owns the verdict cache and in-flight registry for one browsing session.
pub struct DecisionEngine {
    deps: EngineDeps,
    /// URLs whose override dialog is currently open.
    prompts: Arc<InFlightRegistry>,
    /// Single-use admissions for re-issued navigations after fail-open,
    /// with the time each was granted.
    fail_open_passes: DashMap<String, Instant>,
    fail_open_pass_ttl: Duration,
}

/// How long a fail-open pass waits for the re-issued navigation.
pub const FAIL_OPEN_PASS_TTL: Duration = Duration::from_secs(5);

impl DecisionEngine {
    pub fn new_with(deps: EngineDeps) -> Self {
        Self {
            deps,
            prompts: Arc::new(InFlightRegistry::new()),
            fail_open_passes: DashMap::new(),
            fail_open_pass_ttl: FAIL_OPEN_PASS_TTL,
        }
    }

    pub fn with_fail_open_pass_ttl(mut self, ttl: Duration) -> Self {
        self.fail_open_pass_ttl = ttl;
        self
    }

    pub fn config(&self) -> &Config {
        &self.deps.config
    }

    pub fn cache(&self) -> &VerdictCache {
        &self.deps.cache
    }

    pub fn inflight(&self) -> &InFlightRegistry {
        &self.deps.inflight
    }

    /// True when `url` is never classified (empty, or a bypass scheme).
    pub fn is_bypassed(&self, url: &str) -> bool {
        if url.trim().is_empty() {
            return true;
        }
        scheme_of(url).is_some_and(|s| self.deps.config.interception.bypasses(&s))
    }

    /// Whether the gate runs at all right now.
    pub fn gating_active(&self) -> bool {
        !self.deps.config.interception.require_protective_session || self.deps.session.is_active()
    }

    /// Synchronous decision for one navigation attempt.
    pub fn decide(&self, url: &str) -> Decision {
        if self.is_bypassed(url) {
            return Decision::Allow(AllowReason::BypassedScheme);
        }
        if !self.gating_active() {
            return Decision::Allow(AllowReason::SessionInactive);
        }
        if let Some((_, granted)) = self.fail_open_passes.remove(url) {
            if granted.elapsed() < self.fail_open_pass_ttl {
                return Decision::Allow(AllowReason::FailOpenPass);
            }
            tracing::debug!(url = %url, "fail-open pass expired");
        }
        if let Some(entry) = self.deps.cache.get(url) {
            return decision_from_entry(&entry);
        }

        let guard = match self.deps.inflight.acquire(url) {
            Some(guard) => guard,
            None => return Decision::Deny(DenyReason::InFlight),
        };
        // A verdict may have landed between the lookup and the acquire.
        if let Some(entry) = self.deps.cache.get(url) {
            drop(guard);
            return decision_from_entry(&entry);
        }

        Decision::DenyPendingAsync(PendingCheck {
            guard,
            attempt_id: Uuid::new_v4(),
        })
    }

    /// Classify the pending URL and settle its state.
    pub async fn resolve(&self, check: PendingCheck) -> Resolution {
        let url = check.url().to_string();
        let attempt_id = check.attempt_id();

        let start = Instant::now();
        let classification = self.deps.classifier.classify(&url).await;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        let in_flight_ms = self
            .deps
            .inflight
            .elapsed(&url)
            .map_or(latency_ms, |d| d.as_secs_f64() * 1000.0);

        let verdict = match classification {
            Classification::FailOpen => {
                drop(check);
                tracing::info!(
                    attempt_id = %attempt_id,
                    url = %url,
                    verdict = "fail_open",
                    latency_ms = latency_ms,
                    in_flight_ms = in_flight_ms,
                    "classifier unavailable, allowing without caching"
                );
                return Resolution::FailOpen;
            }
            Classification::Verdict(verdict) => verdict,
        };

        self.deps
            .cache
            .put(url.clone(), VerdictEntry::from_verdict(&verdict));
        drop(check);

        tracing::info!(
            attempt_id = %attempt_id,
            url = %url,
            verdict = if verdict.is_malicious { "malicious" } else { "safe" },
            confidence = %verdict.confidence,
            confidence_level = verdict.confidence.level().as_str(),
            probability = verdict.probability,
            latency_ms = latency_ms,
            in_flight_ms = in_flight_ms,
            "url classified"
        );

        if !verdict.is_malicious {
            return Resolution::Safe;
        }
        self.run_override(&url, attempt_id, verdict.confidence, verdict.probability)
            .await
    }

    /// Full decision for an address-bar submission. Unlike `decide`, a
    /// cached block re-opens the override dialog.
    pub async fn evaluate_submitted(&self, url: &str) -> Resolution {
        if self.is_bypassed(url) || !self.gating_active() {
            return Resolution::Safe;
        }

        if let Some(entry) = self.deps.cache.get(url) {
            if !entry.is_malicious {
                return Resolution::Safe;
            }
            if entry.user_allowed {
                return Resolution::Overridden;
            }
            return self
                .run_override(url, Uuid::new_v4(), entry.confidence, entry.probability)
                .await;
        }

        match self.deps.inflight.acquire(url) {
            Some(guard) => {
                let check = PendingCheck {
                    guard,
                    attempt_id: Uuid::new_v4(),
                };
                self.resolve(check).await
            }
            None => {
                tracing::debug!(url = %url, "submission joins in-flight classification");
                Resolution::Pending
            }
        }
    }

    /// Admit the next navigation attempt to `url` once, without a verdict,
    /// provided it arrives within the pass TTL. Used when re-issuing a
    /// navigation after fail-open.
    pub fn grant_fail_open_pass(&self, url: &str) {
        let now = Instant::now();
        let ttl = self.fail_open_pass_ttl;
        self.fail_open_passes
            .retain(|_, granted| now.duration_since(*granted) < ttl);
        self.fail_open_passes.insert(url.to_string(), now);
    }

    async fn run_override(
        &self,
        url: &str,
        attempt_id: Uuid,
        confidence: Confidence,
        probability: f64,
    ) -> Resolution {
        let _dialog = match self.prompts.acquire(url) {
            Some(guard) => guard,
            None => {
                tracing::debug!(
                    attempt_id = %attempt_id,
                    url = %url,
                    "override dialog already open"
                );
                return Resolution::Pending;
            }
        };

        let warning = MaliciousWarning {
            url: url.to_string(),
            confidence,
            probability,
        };
        if let Err(e) = self
            .deps
            .notifier
            .notify(MaliciousWarning::TITLE, &warning.notification_body())
        {
            tracing::warn!(attempt_id = %attempt_id, url = %url, error = %e, "failed to show notification");
        }

        let choice = self.deps.prompt.confirm(&warning).await;
        tracing::info!(
            attempt_id = %attempt_id,
            url = %url,
            choice = choice.label(),
            "override decision"
        );

        match choice {
            OverrideChoice::ContinueAnyway => {
                if !self.deps.cache.mark_user_allowed(url) {
                    tracing::warn!(url = %url, "override for url without cached verdict");
                }
                Resolution::Overridden
            }
            OverrideChoice::Cancel => Resolution::Blocked,
        }
    }
}

fn decision_from_entry(entry: &VerdictEntry) -> Decision {
    if entry.is_blocked() {
        Decision::Deny(DenyReason::Blocked)
    } else if entry.is_malicious {
        Decision::Allow(AllowReason::UserOverride)
    } else {
        Decision::Allow(AllowReason::CachedSafe)
    }
}

// ---------------------------------------------------------------------------
// Public factory for the default engine
// ---------------------------------------------------------------------------

/// Engine wired to the HTTP classifier described by `config`, with fresh
/// session-scoped stores.
pub fn build_engine(
    config: Arc<Config>,
    session: Arc<dyn ProtectionState>,
    notifier: Arc<dyn Notifier>,
    prompt: Arc<dyn OverridePrompt>,
) -> DecisionEngine {
    let classifier = HttpUrlClassifier::new(reqwest::Client::new(), &config.classifier);
    let deps = EngineDeps {
        config,
        cache: Arc::new(VerdictCache::new()),
        inflight: Arc::new(InFlightRegistry::new()),
        classifier: Arc::new(classifier),
        session,
        notifier,
        prompt,
    };
    DecisionEngine::new_with(deps)
}

#[cfg(test)]
mod tests;
