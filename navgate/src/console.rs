// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Console rendering surface and override prompt
//
// Stand-ins for an embedded browser view, used by the `browse` command.
// Loads are queued as events so the driver loop can run them back through
// the interceptor, the way a real surface would call its navigation hook.

use crate::surface::{MaliciousWarning, OverrideChoice, OverridePrompt, RenderingSurface};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// A navigation the surface wants to start.
    Load(String),
    /// Step back one history entry.
    Back,
    /// Address bar text changed without a load.
    Address(String),
}

#[derive(Debug, Default)]
struct History {
    entries: Vec<String>,
}

/// History-keeping surface that reports navigations over a channel.
pub struct ConsoleSurface {
    events: mpsc::UnboundedSender<SurfaceEvent>,
    history: Mutex<History>,
}

impl ConsoleSurface {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SurfaceEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                events,
                history: Mutex::new(History::default()),
            },
            rx,
        )
    }

    /// Record a load that the interceptor allowed.
    pub fn commit(&self, url: &str) {
        let mut history = self.lock();
        if history.entries.last().map(String::as_str) != Some(url) {
            history.entries.push(url.to_string());
        }
    }

    /// Drop the current entry and return the one now displayed.
    pub fn step_back(&self) -> Option<String> {
        let mut history = self.lock();
        if history.entries.len() < 2 {
            return None;
        }
        history.entries.pop();
        history.entries.last().cloned()
    }

    fn send(&self, event: SurfaceEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("surface event dropped, driver loop has stopped");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RenderingSurface for ConsoleSurface {
    fn navigate(&self, url: &str) {
        self.send(SurfaceEvent::Load(url.to_string()));
    }

    fn go_back(&self) {
        self.send(SurfaceEvent::Back);
    }

    fn can_go_back(&self) -> bool {
        self.lock().entries.len() > 1
    }

    fn current_url(&self) -> Option<String> {
        self.lock().entries.last().cloned()
    }

    fn show_address(&self, url: &str) {
        self.send(SurfaceEvent::Address(url.to_string()));
    }
}

/// Parse an answer typed at the override dialog. Anything unrecognised
/// counts as Cancel.
pub fn parse_choice(input: &str) -> OverrideChoice {
    match input.trim().to_ascii_lowercase().as_str() {
        "c" | "continue" | "continue anyway" => OverrideChoice::ContinueAnyway,
        _ => OverrideChoice::Cancel,
    }
}

/// Override dialog answered from the console input stream.
#[derive(Default)]
pub struct ConsolePrompt {
    waiting: Mutex<VecDeque<oneshot::Sender<OverrideChoice>>>,
}

impl ConsolePrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while some dialog is waiting for an answer.
    pub fn has_pending(&self) -> bool {
        !self.lock().is_empty()
    }

    /// Answer the oldest open dialog. Returns false if none was open.
    pub fn answer(&self, choice: OverrideChoice) -> bool {
        while let Some(tx) = self.lock().pop_front() {
            if tx.send(choice).is_ok() {
                return true;
            }
        }
        false
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<oneshot::Sender<OverrideChoice>>> {
        self.waiting.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl OverridePrompt for ConsolePrompt {
    async fn confirm(&self, warning: &MaliciousWarning) -> OverrideChoice {
        let (tx, rx) = oneshot::channel();
        self.lock().push_back(tx);

        println!();
        println!("== {} ==", MaliciousWarning::TITLE);
        println!("{}", warning.dialog_message());
        let actions: Vec<String> = MaliciousWarning::ACTIONS
            .iter()
            .map(|a| format!("[{}]", a.label()))
            .collect();
        println!(
            "{}  (type \"c\" to continue, anything else cancels)",
            actions.join(" / ")
        );

        // A dropped sender means nobody can answer any more.
        rx.await.unwrap_or(OverrideChoice::Cancel)
    }
}
