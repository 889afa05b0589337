// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// In-flight registry
//
// Tracks URLs with an outstanding classifier request so concurrent
// navigations to the same unresolved URL collapse into one request.
// `acquire` hands out a guard whose Drop releases the entry on every exit
// path, including panics inside the classifier future.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct InFlightRegistry {
    /// URL -> when its classification started.
    urls: DashMap<String, Instant>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `url` in flight. Returns false if it already was.
    pub fn begin(&self, url: &str) -> bool {
        match self.urls.entry(url.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(Instant::now());
                true
            }
        }
    }

    /// Remove `url`. Idempotent.
    pub fn end(&self, url: &str) {
        self.urls.remove(url);
    }

    /// Guarded `begin`: `None` when `url` is already in flight.
    pub fn acquire(self: &Arc<Self>, url: &str) -> Option<InFlightGuard> {
        if !self.begin(url) {
            return None;
        }
        Some(InFlightGuard {
            registry: Arc::clone(self),
            url: url.to_string(),
        })
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains_key(url)
    }

    /// How long `url` has been in flight.
    pub fn elapsed(&self, url: &str) -> Option<Duration> {
        self.urls.get(url).map(|started| started.elapsed())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Holds one registry entry; dropping it ends the entry.
#[derive(Debug)]
pub struct InFlightGuard {
    registry: Arc<InFlightRegistry>,
    url: String,
}

impl InFlightGuard {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Release explicitly. Same as dropping.
    pub fn release(self) {}
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.end(&self.url);
    }
}
