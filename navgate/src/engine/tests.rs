// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Engine tests

use super::*;
use crate::session::{VpnSession, VpnStatus};
use crate::surface::NotifyError;
use crate::verdict::ClassifierVerdict;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Returns scripted classifications in order, repeating the last one.
struct ScriptedClassifier {
    results: Mutex<VecDeque<Classification>>,
    calls: AtomicUsize,
    hold: Option<Arc<Notify>>,
}

impl ScriptedClassifier {
    fn new(results: Vec<Classification>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            calls: AtomicUsize::new(0),
            hold: None,
        }
    }

    fn held(results: Vec<Classification>, hold: Arc<Notify>) -> Self {
        Self {
            hold: Some(hold),
            ..Self::new(results)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UrlClassifier for ScriptedClassifier {
    async fn classify(&self, _url: &str) -> Classification {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        let mut results = self.results.lock().unwrap();
        if results.len() > 1 {
            results.pop_front().unwrap()
        } else {
            results.front().cloned().unwrap_or(Classification::FailOpen)
        }
    }
}

struct PanickingClassifier;

#[async_trait]
impl UrlClassifier for PanickingClassifier {
    async fn classify(&self, _url: &str) -> Classification {
        panic!("classifier exploded");
    }
}

struct ScriptedPrompt {
    choice: OverrideChoice,
    warnings: Mutex<Vec<MaliciousWarning>>,
    hold: Option<Arc<Notify>>,
}

impl ScriptedPrompt {
    fn answering(choice: OverrideChoice) -> Self {
        Self {
            choice,
            warnings: Mutex::new(Vec::new()),
            hold: None,
        }
    }

    fn shown(&self) -> Vec<MaliciousWarning> {
        self.warnings.lock().unwrap().clone()
    }
}

#[async_trait]
impl OverridePrompt for ScriptedPrompt {
    async fn confirm(&self, warning: &MaliciousWarning) -> OverrideChoice {
        self.warnings.lock().unwrap().push(warning.clone());
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        self.choice
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notes: Mutex<Vec<(String, String)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        self.notes
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _title: &str, _body: &str) -> Result<(), NotifyError> {
        Err(NotifyError("permission denied".to_string()))
    }
}

fn malicious(probability: f64) -> Classification {
    Classification::Verdict(ClassifierVerdict {
        is_malicious: true,
        confidence: Confidence::from_label("high"),
        probability,
    })
}

fn safe() -> Classification {
    Classification::Verdict(ClassifierVerdict {
        is_malicious: false,
        confidence: Confidence::from_label("high"),
        probability: 0.01,
    })
}

struct Harness {
    engine: Arc<DecisionEngine>,
    classifier: Arc<ScriptedClassifier>,
    prompt: Arc<ScriptedPrompt>,
    notifier: Arc<RecordingNotifier>,
    session: Arc<VpnSession>,
}

fn harness_with(
    config: Config,
    classifier: ScriptedClassifier,
    prompt: ScriptedPrompt,
) -> Harness {
    let classifier = Arc::new(classifier);
    let prompt = Arc::new(prompt);
    let notifier = Arc::new(RecordingNotifier::default());
    let session = Arc::new(VpnSession::with_status(VpnStatus::Connected));
    let deps = EngineDeps {
        config: Arc::new(config),
        cache: Arc::new(VerdictCache::new()),
        inflight: Arc::new(InFlightRegistry::new()),
        classifier: classifier.clone(),
        session: session.clone(),
        notifier: notifier.clone(),
        prompt: prompt.clone(),
    };
    Harness {
        engine: Arc::new(DecisionEngine::new_with(deps)),
        classifier,
        prompt,
        notifier,
        session,
    }
}

fn harness(results: Vec<Classification>, choice: OverrideChoice) -> Harness {
    harness_with(
        Config::default(),
        ScriptedClassifier::new(results),
        ScriptedPrompt::answering(choice),
    )
}

fn expect_pending(decision: Decision) -> PendingCheck {
    match decision {
        Decision::DenyPendingAsync(check) => check,
        other => panic!("expected DenyPendingAsync, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Fast paths
// ---------------------------------------------------------------------------

#[test]
fn bypass_schemes_allowed_without_classification() {
    let h = harness(vec![safe()], OverrideChoice::Cancel);
    for url in [
        "data:text/html,<b>hi</b>",
        "about:blank",
        "javascript:void(0)",
        "file:///etc/hosts",
        "JavaScript:alert(1)",
        "",
    ] {
        assert!(
            matches!(
                h.engine.decide(url),
                Decision::Allow(AllowReason::BypassedScheme)
            ),
            "{url}"
        );
    }
    assert_eq!(h.classifier.calls(), 0);
    assert!(h.engine.inflight().is_empty());
}

#[test]
fn inactive_session_allows_everything() {
    let h = harness(vec![malicious(0.9)], OverrideChoice::Cancel);
    h.session.disconnect_success();
    assert!(matches!(
        h.engine.decide("https://anything.test"),
        Decision::Allow(AllowReason::SessionInactive)
    ));
    assert!(h.engine.inflight().is_empty());
}

#[test]
fn gating_without_session_when_not_required() {
    let mut config = Config::default();
    config.interception.require_protective_session = false;
    let h = harness_with(
        config,
        ScriptedClassifier::new(vec![safe()]),
        ScriptedPrompt::answering(OverrideChoice::Cancel),
    );
    h.session.disconnect_success();
    assert!(matches!(
        h.engine.decide("https://a.test"),
        Decision::DenyPendingAsync(_)
    ));
}

#[test]
fn malformed_url_is_still_gated() {
    let h = harness(vec![safe()], OverrideChoice::Cancel);
    let check = expect_pending(h.engine.decide("ht!tp:/broken url"));
    assert_eq!(check.url(), "ht!tp:/broken url");
}

// ---------------------------------------------------------------------------
// In-flight collapsing
// ---------------------------------------------------------------------------

#[test]
fn duplicate_attempt_while_in_flight_is_denied() {
    let h = harness(vec![safe()], OverrideChoice::Cancel);
    let check = expect_pending(h.engine.decide("https://a.test"));
    assert!(matches!(
        h.engine.decide("https://a.test"),
        Decision::Deny(DenyReason::InFlight)
    ));
    assert!(h.engine.inflight().contains("https://a.test"));

    // A different URL is independent.
    let other = expect_pending(h.engine.decide("https://b.test"));
    assert_eq!(h.engine.inflight().len(), 2);

    drop(check);
    drop(other);
    assert!(h.engine.inflight().is_empty());
}

#[tokio::test]
async fn concurrent_attempts_issue_one_classifier_call() {
    let hold = Arc::new(Notify::new());
    let h = harness_with(
        Config::default(),
        ScriptedClassifier::held(vec![safe()], hold.clone()),
        ScriptedPrompt::answering(OverrideChoice::Cancel),
    );

    let check = expect_pending(h.engine.decide("https://a.test"));
    let engine = h.engine.clone();
    let task = tokio::spawn(async move { engine.resolve(check).await });
    tokio::task::yield_now().await;

    for _ in 0..5 {
        assert!(matches!(
            h.engine.decide("https://a.test"),
            Decision::Deny(DenyReason::InFlight)
        ));
    }

    hold.notify_one();
    assert_eq!(task.await.unwrap(), Resolution::Safe);
    assert_eq!(h.classifier.calls(), 1);
}

// ---------------------------------------------------------------------------
// Checking -> Safe
// ---------------------------------------------------------------------------

#[tokio::test]
async fn safe_verdict_cached_and_short_circuits() {
    let h = harness(vec![safe()], OverrideChoice::Cancel);
    let check = expect_pending(h.engine.decide("https://a.test"));

    assert_eq!(h.engine.resolve(check).await, Resolution::Safe);
    assert!(h.engine.inflight().is_empty());
    assert!(!h.engine.cache().get("https://a.test").unwrap().is_malicious);

    for _ in 0..3 {
        assert!(matches!(
            h.engine.decide("https://a.test"),
            Decision::Allow(AllowReason::CachedSafe)
        ));
    }
    assert_eq!(h.classifier.calls(), 1);
    assert!(h.notifier.notes.lock().unwrap().is_empty());
    assert!(h.prompt.shown().is_empty());
}

// ---------------------------------------------------------------------------
// Checking -> Blocked / Overridden
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malicious_then_cancel_stays_blocked() {
    let h = harness(vec![malicious(0.97)], OverrideChoice::Cancel);
    let check = expect_pending(h.engine.decide("http://bad.test/x"));

    assert_eq!(h.engine.resolve(check).await, Resolution::Blocked);

    let entry = h.engine.cache().get("http://bad.test/x").unwrap();
    assert!(entry.is_malicious);
    assert!(!entry.user_allowed);
    assert!(h.engine.inflight().is_empty());

    for _ in 0..3 {
        assert!(matches!(
            h.engine.decide("http://bad.test/x"),
            Decision::Deny(DenyReason::Blocked)
        ));
    }
    assert_eq!(h.classifier.calls(), 1);

    let shown = h.prompt.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].probability_percent(), "97.0%");

    let notes = h.notifier.notes.lock().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].0, MaliciousWarning::TITLE);
    assert!(notes[0].1.contains("97.0%"));
    assert!(notes[0].1.contains("Confidence: high"));
}

#[tokio::test]
async fn malicious_then_continue_is_overridden_for_that_url_only() {
    let h = harness(vec![malicious(0.97)], OverrideChoice::ContinueAnyway);
    let check = expect_pending(h.engine.decide("http://bad.test/x"));

    assert_eq!(h.engine.resolve(check).await, Resolution::Overridden);
    assert!(h.engine.cache().get("http://bad.test/x").unwrap().user_allowed);

    for _ in 0..3 {
        assert!(matches!(
            h.engine.decide("http://bad.test/x"),
            Decision::Allow(AllowReason::UserOverride)
        ));
    }
    assert_eq!(h.classifier.calls(), 1);

    // A sibling URL gets its own classification.
    assert!(matches!(
        h.engine.decide("http://bad.test/y"),
        Decision::DenyPendingAsync(_)
    ));
}

#[tokio::test]
async fn attempts_while_dialog_open_are_blocked() {
    let hold = Arc::new(Notify::new());
    let prompt = ScriptedPrompt {
        hold: Some(hold.clone()),
        ..ScriptedPrompt::answering(OverrideChoice::ContinueAnyway)
    };
    let h = harness_with(
        Config::default(),
        ScriptedClassifier::new(vec![malicious(0.8)]),
        prompt,
    );

    let check = expect_pending(h.engine.decide("http://bad.test/x"));
    let engine = h.engine.clone();
    let task = tokio::spawn(async move { engine.resolve(check).await });
    while h.prompt.shown().is_empty() {
        tokio::task::yield_now().await;
    }

    assert!(h.engine.inflight().is_empty());
    assert!(matches!(
        h.engine.decide("http://bad.test/x"),
        Decision::Deny(DenyReason::Blocked)
    ));

    hold.notify_one();
    assert_eq!(task.await.unwrap(), Resolution::Overridden);
    assert_eq!(h.prompt.shown().len(), 1);
}

#[tokio::test]
async fn notification_failure_does_not_skip_dialog() {
    let prompt = Arc::new(ScriptedPrompt::answering(OverrideChoice::ContinueAnyway));
    let deps = EngineDeps {
        config: Arc::new(Config::default()),
        cache: Arc::new(VerdictCache::new()),
        inflight: Arc::new(InFlightRegistry::new()),
        classifier: Arc::new(ScriptedClassifier::new(vec![malicious(0.6)])),
        session: Arc::new(VpnSession::with_status(VpnStatus::Connected)),
        notifier: Arc::new(FailingNotifier),
        prompt: prompt.clone(),
    };
    let engine = DecisionEngine::new_with(deps);

    let check = expect_pending(engine.decide("http://bad.test/x"));
    assert_eq!(engine.resolve(check).await, Resolution::Overridden);
    assert_eq!(prompt.shown().len(), 1);
}

// ---------------------------------------------------------------------------
// Fail-open
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fail_open_is_not_cached_and_retries() {
    let h = harness(vec![Classification::FailOpen, safe()], OverrideChoice::Cancel);

    let check = expect_pending(h.engine.decide("https://example.com"));
    assert_eq!(h.engine.resolve(check).await, Resolution::FailOpen);
    assert!(h.engine.cache().get("https://example.com").is_none());
    assert!(h.engine.inflight().is_empty());

    // Next attempt classifies again.
    let check = expect_pending(h.engine.decide("https://example.com"));
    assert_eq!(h.engine.resolve(check).await, Resolution::Safe);
    assert_eq!(h.classifier.calls(), 2);
}

#[test]
fn fail_open_pass_admits_exactly_once() {
    let h = harness(vec![Classification::FailOpen], OverrideChoice::Cancel);
    h.engine.grant_fail_open_pass("https://example.com");

    assert!(matches!(
        h.engine.decide("https://example.com"),
        Decision::Allow(AllowReason::FailOpenPass)
    ));
    assert!(matches!(
        h.engine.decide("https://example.com"),
        Decision::DenyPendingAsync(_)
    ));
    assert!(h.engine.cache().is_empty());
}

#[test]
fn expired_fail_open_pass_is_not_honoured() {
    let deps = EngineDeps {
        config: Arc::new(Config::default()),
        cache: Arc::new(VerdictCache::new()),
        inflight: Arc::new(InFlightRegistry::new()),
        classifier: Arc::new(ScriptedClassifier::new(vec![Classification::FailOpen])),
        session: Arc::new(VpnSession::with_status(VpnStatus::Connected)),
        notifier: Arc::new(RecordingNotifier::default()),
        prompt: Arc::new(ScriptedPrompt::answering(OverrideChoice::Cancel)),
    };
    let engine = DecisionEngine::new_with(deps).with_fail_open_pass_ttl(Duration::ZERO);

    // The re-issued navigation never arrived; a later visit must classify.
    engine.grant_fail_open_pass("https://example.com");
    assert!(matches!(
        engine.decide("https://example.com"),
        Decision::DenyPendingAsync(_)
    ));
}

#[tokio::test]
async fn panicking_classifier_releases_in_flight_slot() {
    let deps = EngineDeps {
        config: Arc::new(Config::default()),
        cache: Arc::new(VerdictCache::new()),
        inflight: Arc::new(InFlightRegistry::new()),
        classifier: Arc::new(PanickingClassifier),
        session: Arc::new(VpnSession::with_status(VpnStatus::Connected)),
        notifier: Arc::new(RecordingNotifier::default()),
        prompt: Arc::new(ScriptedPrompt::answering(OverrideChoice::Cancel)),
    };
    let engine = Arc::new(DecisionEngine::new_with(deps));

    let check = expect_pending(engine.decide("https://a.test"));
    assert!(engine.inflight().contains("https://a.test"));

    let task_engine = engine.clone();
    let err = tokio::spawn(async move { task_engine.resolve(check).await })
        .await
        .unwrap_err();
    assert!(err.is_panic());

    assert!(engine.inflight().is_empty());
    assert!(engine.cache().is_empty());
    assert!(matches!(
        engine.decide("https://a.test"),
        Decision::DenyPendingAsync(_)
    ));
}

// ---------------------------------------------------------------------------
// Address-bar submissions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submitted_unknown_url_resolves_fully() {
    let h = harness(vec![safe()], OverrideChoice::Cancel);
    assert_eq!(
        h.engine.evaluate_submitted("https://a.test").await,
        Resolution::Safe
    );
    assert!(h.engine.cache().get("https://a.test").is_some());
    assert!(h.engine.inflight().is_empty());
}

#[tokio::test]
async fn submitted_blocked_url_reprompts_without_reclassifying() {
    let h = harness(vec![malicious(0.97)], OverrideChoice::Cancel);
    assert_eq!(
        h.engine.evaluate_submitted("http://bad.test/x").await,
        Resolution::Blocked
    );
    assert_eq!(
        h.engine.evaluate_submitted("http://bad.test/x").await,
        Resolution::Blocked
    );
    assert_eq!(h.prompt.shown().len(), 2);
    assert_eq!(h.classifier.calls(), 1);
}

#[tokio::test]
async fn submitted_overridden_url_allowed() {
    let h = harness(vec![malicious(0.97)], OverrideChoice::ContinueAnyway);
    assert_eq!(
        h.engine.evaluate_submitted("http://bad.test/x").await,
        Resolution::Overridden
    );
    assert_eq!(
        h.engine.evaluate_submitted("http://bad.test/x").await,
        Resolution::Overridden
    );
    assert_eq!(h.prompt.shown().len(), 1);
}

#[tokio::test]
async fn submitted_while_in_flight_is_pending() {
    let h = harness(vec![safe()], OverrideChoice::Cancel);
    let _check = expect_pending(h.engine.decide("https://a.test"));
    assert_eq!(
        h.engine.evaluate_submitted("https://a.test").await,
        Resolution::Pending
    );
    assert_eq!(h.classifier.calls(), 0);
}

#[tokio::test]
async fn second_dialog_for_same_url_not_opened() {
    let hold = Arc::new(Notify::new());
    let prompt = ScriptedPrompt {
        hold: Some(hold.clone()),
        ..ScriptedPrompt::answering(OverrideChoice::Cancel)
    };
    let h = harness_with(
        Config::default(),
        ScriptedClassifier::new(vec![malicious(0.9)]),
        prompt,
    );

    let engine = h.engine.clone();
    let first = tokio::spawn(async move { engine.evaluate_submitted("http://bad.test/x").await });
    while h.prompt.shown().is_empty() {
        tokio::task::yield_now().await;
    }

    assert_eq!(
        h.engine.evaluate_submitted("http://bad.test/x").await,
        Resolution::Pending
    );

    hold.notify_one();
    assert_eq!(first.await.unwrap(), Resolution::Blocked);
    assert_eq!(h.prompt.shown().len(), 1);
}

#[tokio::test]
async fn submitted_bypass_or_inactive_is_safe() {
    let h = harness(vec![malicious(0.9)], OverrideChoice::Cancel);
    assert_eq!(
        h.engine.evaluate_submitted("about:blank").await,
        Resolution::Safe
    );
    h.session.disconnect_success();
    assert_eq!(
        h.engine.evaluate_submitted("https://a.test").await,
        Resolution::Safe
    );
    assert_eq!(h.classifier.calls(), 0);
}

#[test]
fn resolution_permits_navigation() {
    assert!(Resolution::Safe.permits_navigation());
    assert!(Resolution::FailOpen.permits_navigation());
    assert!(Resolution::Overridden.permits_navigation());
    assert!(!Resolution::Blocked.permits_navigation());
    assert!(!Resolution::Pending.permits_navigation());
}
