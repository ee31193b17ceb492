//! The classifier's fixed six-feature input vector.

use serde::Serialize;

/// Input features, in the exact order the classifier was trained on.
///
/// Out-of-range values are clamped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    /// Failed-login count, 0..=150.
    pub failed_logins: f64,
    /// Requests per minute, 0..=10_000.
    pub request_rate: f64,
    /// Commands executed, 0..=1_000.
    pub commands_count: f64,
    /// 0 or 1: payload carries SQL-injection sentinels.
    pub sql_payload: f64,
    /// 0 or 1: a honeytoken was accessed.
    pub honeytoken_access: f64,
    /// Session duration in seconds, 0..=86_400.
    pub session_time_secs: f64,
}

impl FeatureVector {
    /// Clamp every feature into its documented range.
    pub fn clamped(&self) -> Self {
        Self {
            failed_logins: self.failed_logins.clamp(0.0, 150.0),
            request_rate: self.request_rate.clamp(0.0, 10_000.0),
            commands_count: self.commands_count.clamp(0.0, 1_000.0),
            sql_payload: self.sql_payload.clamp(0.0, 1.0),
            honeytoken_access: self.honeytoken_access.clamp(0.0, 1.0),
            session_time_secs: self.session_time_secs.clamp(0.0, 86_400.0),
        }
    }

    /// The wire ordering: [failed_logins, request_rate, commands_count,
    /// sql_payload, honeytoken_access, session_time_secs].
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.failed_logins,
            self.request_rate,
            self.commands_count,
            self.sql_payload,
            self.honeytoken_access,
            self.session_time_secs,
        ]
    }
}
