//! Bounded, retry-free RPC to the classifier.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use dn_domain::{AttackKind, Classification, Error, Result};

use crate::features::FeatureVector;

/// Hard deadline for one classification call. No retries.
pub const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(3);

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Serialize)]
struct ClassifyRequest {
    features: [f64; 6],
}

#[derive(Deserialize)]
struct ClassifyResponse {
    attack_type: String,
    risk_score: f64,
    confidence: f64,
    #[serde(default)]
    anomaly: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// HTTP client for the classifier service.
///
/// Created once at startup and shared; the underlying `reqwest::Client`
/// maintains a connection pool and is safe to use concurrently.
#[derive(Debug, Clone)]
pub struct ClassifierClient {
    http: Client,
    base_url: String,
}

impl ClassifierClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, CLASSIFY_TIMEOUT)
    }

    /// Tests shorten the deadline; production uses [`CLASSIFY_TIMEOUT`].
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Classify a feature vector. Never fails: every error path logs and
    /// returns [`Classification::fallback`], so the caller only has to
    /// decide what a zero-risk result means.
    pub async fn classify(&self, features: &FeatureVector) -> Classification {
        match self.try_classify(features).await {
            Ok(classification) => classification,
            Err(e) => {
                tracing::warn!(error = %e, "classifier unavailable, using fallback");
                Classification::fallback()
            }
        }
    }

    async fn try_classify(&self, features: &FeatureVector) -> Result<Classification> {
        let req = ClassifyRequest {
            features: features.clamped().as_array(),
        };
        let url = format!("{}/predict", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&req)
            .send()
            .await
            .map_err(from_reqwest)?;

        if !resp.status().is_success() {
            return Err(Error::Http(format!(
                "classifier returned {}",
                resp.status()
            )));
        }

        let body = resp.text().await.map_err(from_reqwest)?;
        let wire: ClassifyResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Http(format!("malformed classifier response: {e}")))?;

        Ok(Classification {
            attack_type: AttackKind::parse(&wire.attack_type),
            risk_score: wire.risk_score.clamp(0.0, 10.0),
            confidence: wire.confidence.clamp(0.0, 1.0),
            anomaly: wire.anomaly,
        })
    }
}

/// Convert a `reqwest::Error` into a domain `Error`. Timeouts keep their
/// own variant so the fallback log line names the real cause.
fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
