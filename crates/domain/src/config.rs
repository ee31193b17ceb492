//! Environment-driven configuration.
//!
//! All settings come from the process environment (the backend is deployed
//! as a container with no config file). `Config::from_env` applies defaults;
//! `Config::validate` reports issues with severities so `main` can decide
//! whether to refuse startup.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Auth mode
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How request authentication behaves.
///
/// `Open` is a development convenience: every bearer verify resolves to a
/// fixed demo principal and node-credential checks are skipped. It never
/// changes the shape of persisted data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    Enforced,
    Open,
}

impl AuthMode {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "enforced" => Ok(Self::Enforced),
            "open" => Ok(Self::Open),
            other => Err(Error::Config(format!(
                "AUTH_MODE must be \"enforced\" or \"open\" (got \"{other}\")"
            ))),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Persistence target: `memory://` or `file://<dir>`.
    pub storage_uri: String,
    /// Base URL of the external classifier RPC.
    pub classifier_url: String,
    pub auth_mode: AuthMode,
    /// HS256 signing key for user bearer tokens.
    /// Required when `auth_mode` is `enforced`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_signing_key: Option<String>,
    /// Risk score at or above which an alert is materialised.
    pub alert_risk_threshold: f64,
    pub listen_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_uri: "memory://".into(),
            classifier_url: "http://127.0.0.1:8100".into(),
            auth_mode: AuthMode::Enforced,
            token_signing_key: None,
            alert_risk_threshold: DEFAULT_ALERT_RISK_THRESHOLD,
            listen_addr: "0.0.0.0:8080".into(),
        }
    }
}

/// Default Θ: risk ≥ 7 materialises an alert.
pub const DEFAULT_ALERT_RISK_THRESHOLD: f64 = 7.0;

impl Config {
    /// Build a config from the process environment, applying defaults.
    ///
    /// Fails only on values that cannot be parsed at all; everything else
    /// is deferred to [`Config::validate`].
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let alert_risk_threshold = match std::env::var("ALERT_RISK_THRESHOLD") {
            Ok(raw) => raw.trim().parse::<i64>().map(|v| v as f64).map_err(|_| {
                Error::Config(format!(
                    "ALERT_RISK_THRESHOLD must be an integer (got \"{raw}\")"
                ))
            })?,
            Err(_) => defaults.alert_risk_threshold,
        };

        let auth_mode = match std::env::var("AUTH_MODE") {
            Ok(raw) => AuthMode::parse(raw.trim())?,
            Err(_) => defaults.auth_mode,
        };

        Ok(Self {
            storage_uri: env_or("STORAGE_URI", &defaults.storage_uri),
            classifier_url: env_or("CLASSIFIER_URL", &defaults.classifier_url),
            auth_mode,
            token_signing_key: std::env::var("TOKEN_SIGNING_KEY")
                .ok()
                .filter(|v| !v.is_empty()),
            alert_risk_threshold,
            listen_addr: env_or("LISTEN_ADDR", &defaults.listen_addr),
        })
    }

    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.token_signing_key.is_none() && self.auth_mode == AuthMode::Enforced {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "TOKEN_SIGNING_KEY".into(),
                message: "required when AUTH_MODE=enforced".into(),
            });
        }

        if self.auth_mode == AuthMode::Open {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "AUTH_MODE".into(),
                message: "open mode resolves every request to the demo principal".into(),
            });
        }

        if !self.classifier_url.starts_with("http://")
            && !self.classifier_url.starts_with("https://")
        {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "CLASSIFIER_URL".into(),
                message: format!(
                    "must start with http:// or https:// (got \"{}\")",
                    self.classifier_url
                ),
            });
        }

        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "LISTEN_ADDR".into(),
                message: format!("not a valid socket address: \"{}\"", self.listen_addr),
            });
        }

        if !(0.0..=10.0).contains(&self.alert_risk_threshold) {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "ALERT_RISK_THRESHOLD".into(),
                message: format!(
                    "outside the classifier's risk range 0..10 ({})",
                    self.alert_risk_threshold
                ),
            });
        }

        issues
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation issues
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
