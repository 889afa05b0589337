// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Collaborator interfaces: the rendering surface, local notifications and
// the blocking override dialog. The gate calls these; hosts implement them.

use crate::verdict::Confidence;
use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Rendering surface
// ---------------------------------------------------------------------------

/// One navigation attempt reported by the rendering surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub url: String,
}

impl NavigationRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// The embedded browser view.
///
/// `navigate` must eventually produce a fresh navigation event for `url`
/// (and so a fresh `should_proceed` call); it must not call back into the
/// interceptor synchronously.
pub trait RenderingSurface: Send + Sync {
    /// Force-navigate to `url`.
    fn navigate(&self, url: &str);

    /// Step back one entry in history.
    fn go_back(&self);

    fn can_go_back(&self) -> bool;

    /// URL of the page currently displayed, if any.
    fn current_url(&self) -> Option<String>;

    /// Reset the displayed address text without navigating.
    fn show_address(&self, url: &str);
}

// ---------------------------------------------------------------------------
// Override dialog and notifications
// ---------------------------------------------------------------------------

/// The user's answer to the malicious-URL dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideChoice {
    Cancel,
    ContinueAnyway,
}

impl OverrideChoice {
    pub fn label(&self) -> &'static str {
        match self {
            OverrideChoice::Cancel => "Cancel",
            OverrideChoice::ContinueAnyway => "Continue Anyway",
        }
    }
}

/// What the user is told about a malicious verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct MaliciousWarning {
    pub url: String,
    pub confidence: Confidence,
    pub probability: f64,
}

impl MaliciousWarning {
    pub const TITLE: &'static str = "Malicious URL Warning";

    /// Ordered dialog actions.
    pub const ACTIONS: [OverrideChoice; 2] =
        [OverrideChoice::Cancel, OverrideChoice::ContinueAnyway];

    /// Probability as a percentage with one decimal place, e.g. `"97.0%"`.
    pub fn probability_percent(&self) -> String {
        format!("{:.1}%", self.probability * 100.0)
    }

    pub fn notification_body(&self) -> String {
        format!(
            "URL \"{}\" has been detected as malicious (Confidence: {}, Probability: {})",
            self.url,
            self.confidence,
            self.probability_percent()
        )
    }

    pub fn dialog_message(&self) -> String {
        format!(
            "This URL has been detected as malicious:\n\n{}\n\nConfidence: {}\nProbability: {}\n\nDo you want to continue accessing it?",
            self.url,
            self.confidence,
            self.probability_percent()
        )
    }
}

#[derive(Debug, thiserror::Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Local user-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// The blocking "Cancel" / "Continue Anyway" confirmation. Waits for the
/// user indefinitely.
#[async_trait]
pub trait OverridePrompt: Send + Sync {
    async fn confirm(&self, warning: &MaliciousWarning) -> OverrideChoice;
}

/// Notifier that emits notifications as structured log events.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        tracing::warn!(title = %title, body = %body, "user notification");
        Ok(())
    }
}
