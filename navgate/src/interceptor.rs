// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Navigation interceptor
//
// The rendering surface asks `should_proceed` synchronously for every
// navigation. A URL that still needs a verdict is denied now; its
// classification runs as a spawned task and, if it resolves to a permitting
// outcome, the navigation is re-issued through the surface. The second
// attempt then short-circuits on the cached verdict.
//
// Re-issue (and cancel-revert) only happens while the classified URL is
// still the one the user is trying to reach.

use crate::engine::{Decision, DecisionEngine, Resolution};
use crate::normalize::AddressNormalizer;
use crate::surface::{NavigationRequest, RenderingSurface};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Result of intercepting one navigation attempt.
#[derive(Debug)]
pub enum Interception {
    Allow,
    Deny,
    /// Denied for now; the handle completes when the decision settles.
    Deferred(JoinHandle<Resolution>),
}

impl Interception {
    pub fn proceeds(&self) -> bool {
        matches!(self, Interception::Allow)
    }
}

/// What the user is currently trying to view.
#[derive(Debug, Default)]
struct NavigationIntent {
    /// Latest gated URL the user or page asked for.
    target: Option<String>,
    /// Latest gated URL that was allowed through.
    last_good: Option<String>,
}

#[derive(Clone)]
pub struct NavigationInterceptor {
    engine: Arc<DecisionEngine>,
    surface: Arc<dyn RenderingSurface>,
    normalizer: Arc<dyn AddressNormalizer>,
    intent: Arc<Mutex<NavigationIntent>>,
    runtime: Handle,
}

impl NavigationInterceptor {
    /// Must be called from within a tokio runtime; deferred decisions are
    /// spawned onto it.
    pub fn new(
        engine: Arc<DecisionEngine>,
        surface: Arc<dyn RenderingSurface>,
        normalizer: Arc<dyn AddressNormalizer>,
    ) -> Self {
        Self::with_runtime(engine, surface, normalizer, Handle::current())
    }

    pub fn with_runtime(
        engine: Arc<DecisionEngine>,
        surface: Arc<dyn RenderingSurface>,
        normalizer: Arc<dyn AddressNormalizer>,
        runtime: Handle,
    ) -> Self {
        Self {
            engine,
            surface,
            normalizer,
            intent: Arc::new(Mutex::new(NavigationIntent::default())),
            runtime,
        }
    }

    pub fn engine(&self) -> &Arc<DecisionEngine> {
        &self.engine
    }

    /// The synchronous hook handed to the rendering surface.
    pub fn should_proceed(&self, request: &NavigationRequest) -> bool {
        self.intercept(request).proceeds()
    }

    pub fn intercept(&self, request: &NavigationRequest) -> Interception {
        let url = request.url.as_str();
        match self.engine.decide(url) {
            Decision::Allow(reason) => {
                if reason.is_gated() {
                    self.with_intent(|intent| {
                        intent.target = Some(url.to_string());
                        intent.last_good = Some(url.to_string());
                    });
                }
                tracing::debug!(url = %url, reason = reason.as_str(), "navigation allowed");
                Interception::Allow
            }
            Decision::Deny(reason) => {
                self.set_target(url);
                tracing::debug!(url = %url, reason = reason.as_str(), "navigation denied");
                Interception::Deny
            }
            Decision::DenyPendingAsync(check) => {
                self.set_target(url);
                tracing::debug!(
                    attempt_id = %check.attempt_id(),
                    url = %url,
                    "navigation deferred pending classification"
                );
                let this = self.clone();
                let url = url.to_string();
                let handle = self.runtime.spawn(async move {
                    let resolution = this.engine.resolve(check).await;
                    this.follow_up(&url, resolution);
                    resolution
                });
                Interception::Deferred(handle)
            }
        }
    }

    /// Address-bar submission: normalize, decide (waiting on the classifier
    /// and dialog if needed), then navigate when permitted.
    pub async fn submit_address(&self, input: &str) -> (String, Resolution) {
        let url = self.normalizer.normalize(input);
        if url.is_empty() {
            return (url, Resolution::Pending);
        }
        self.set_target(&url);
        let resolution = self.engine.evaluate_submitted(&url).await;
        self.follow_up(&url, resolution);
        (url, resolution)
    }

    /// Load the configured home page through the gate.
    pub async fn open_home(&self) -> (String, Resolution) {
        let home = self.engine.config().address_bar.home_url.clone();
        self.submit_address(&home).await
    }

    fn follow_up(&self, url: &str, resolution: Resolution) {
        if resolution == Resolution::Pending {
            return;
        }
        if !self.is_target(url) {
            tracing::debug!(
                url = %url,
                resolution = resolution.as_str(),
                "user navigated elsewhere, not acting on resolution"
            );
            return;
        }

        if resolution.permits_navigation() {
            if resolution == Resolution::FailOpen {
                self.engine.grant_fail_open_pass(url);
            }
            tracing::info!(url = %url, resolution = resolution.as_str(), "re-issuing navigation");
            self.surface.navigate(url);
            return;
        }

        // Blocked: revert to the last page that was allowed.
        let last_good = self.with_intent(|intent| {
            intent.target = intent.last_good.clone();
            intent.last_good.clone()
        });
        let displaying_blocked = self.surface.current_url().as_deref() == Some(url);
        if displaying_blocked && self.surface.can_go_back() {
            self.surface.go_back();
        } else if let Some(last_good) = last_good {
            self.surface.show_address(&last_good);
        }
    }

    fn set_target(&self, url: &str) {
        self.with_intent(|intent| intent.target = Some(url.to_string()));
    }

    fn is_target(&self, url: &str) -> bool {
        self.with_intent(|intent| intent.target.as_deref() == Some(url))
    }

    fn with_intent<T>(&self, f: impl FnOnce(&mut NavigationIntent) -> T) -> T {
        let mut intent = self.intent.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut intent)
    }
}
