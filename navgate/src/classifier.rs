// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Classifier client
//
// Calls the remote URL classification service (`POST {base}/url/check`).
// Every failure mode collapses into `Classification::FailOpen` at this
// boundary: the decision engine never sees an error, only a verdict or a
// fail-open marker it must not cache.

use crate::config::ClassifierConfig;
use crate::verdict::{ClassifierVerdict, Confidence};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Interface
// ---------------------------------------------------------------------------

/// Outcome of one classification attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// The service answered with a well-formed verdict.
    Verdict(ClassifierVerdict),
    /// The service could not be used; treat the URL as safe for this attempt only.
    FailOpen,
}

impl Classification {
    pub fn is_malicious(&self) -> bool {
        matches!(self, Classification::Verdict(v) if v.is_malicious)
    }
}

/// Classifies absolute URLs. Implementations must not return errors; they
/// log and degrade to `Classification::FailOpen` instead.
#[async_trait]
pub trait UrlClassifier: Send + Sync {
    async fn classify(&self, url: &str) -> Classification;
}

/// Why a classifier call produced no verdict.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Transport(String),

    #[error("classifier request timed out: {0}")]
    Timeout(String),

    #[error("classifier returned HTTP {0}")]
    Status(u16),

    #[error("malformed classifier response: {0}")]
    MalformedResponse(String),
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CheckRequest<'a> {
    url: &'a str,
}

/// Response body. The service also echoes `url`; it is not needed here.
#[derive(Debug, Deserialize)]
struct CheckResponse {
    is_malicious: bool,
    probability: f64,
    /// Optional on the wire; absent or null means unknown.
    #[serde(default)]
    confidence: Option<String>,
}

/// Validate a response body and turn it into a verdict.
fn parse_check_response(body: &[u8]) -> Result<ClassifierVerdict, ClassifierError> {
    let resp: CheckResponse = serde_json::from_slice(body)
        .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;

    if !resp.probability.is_finite() || !(0.0..=1.0).contains(&resp.probability) {
        return Err(ClassifierError::MalformedResponse(format!(
            "probability must be in [0, 1], got {}",
            resp.probability
        )));
    }

    Ok(ClassifierVerdict {
        is_malicious: resp.is_malicious,
        confidence: resp
            .confidence
            .map(Confidence::from_label)
            .unwrap_or_default(),
        probability: resp.probability,
    })
}

// ---------------------------------------------------------------------------
// HttpUrlClassifier
// ---------------------------------------------------------------------------

/// Classifier backed by the HTTP check endpoint.
pub struct HttpUrlClassifier {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpUrlClassifier {
    pub fn new(client: reqwest::Client, config: &ClassifierConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint(),
            timeout: config.timeout(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// One request to the check endpoint, with errors preserved.
    pub async fn check(&self, url: &str) -> Result<ClassifierVerdict, ClassifierError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&CheckRequest { url })
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClassifierError::Status(status.as_u16()));
        }

        let body = resp.bytes().await.map_err(map_reqwest_error)?;
        parse_check_response(&body)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ClassifierError {
    if e.is_timeout() {
        ClassifierError::Timeout(e.to_string())
    } else {
        ClassifierError::Transport(e.to_string())
    }
}

#[async_trait]
impl UrlClassifier for HttpUrlClassifier {
    async fn classify(&self, url: &str) -> Classification {
        let start = Instant::now();
        match self.check(url).await {
            Ok(verdict) => Classification::Verdict(verdict),
            Err(e) => {
                tracing::warn!(
                    url = %url,
                    endpoint = %self.endpoint,
                    error = %e,
                    latency_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "classifier unavailable, failing open"
                );
                Classification::FailOpen
            }
        }
    }
}
